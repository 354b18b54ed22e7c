//! Mi Plata Banking Service
//!
//! Owns the accounts, serializes access to each one and commits every
//! operation's movements to a ledger store, rolling back on failure.

pub mod config;
pub mod lock_manager;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod store;

pub use config::{BankConfig, LoggingConfig, ProductConfig};
pub use lock_manager::{AccountGuard, AccountHandle, LockManager};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use registry::{AccountRegistry, ClientSummary, ProductSet};
pub use service::{BankService, CashAdvanceReceipt, InstallmentReceipt};
pub use store::{InMemoryLedgerStore, LedgerStore, StoreError};
