//! Durable side of the ledger.
//!
//! The service mutates accounts in memory under their locks and then hands the
//! resulting `CommitBatch` to a `LedgerStore`. If the store refuses the batch
//! the service rolls the accounts back to their savepoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use miplata_common::AccountId;
use miplata_ledger::{CommitBatch, Movement};

/// Storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The batch conflicts with what is already stored.
    #[error("conflicting write for account {account_id}: {reason}")]
    Conflict { account_id: AccountId, reason: String },
}

/// Persists commit batches all-or-nothing.
pub trait LedgerStore: Send + Sync {
    /// Persist every update in `batch`, or none of them.
    fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError>;
}

/// Per-account record kept by the in-memory store.
#[derive(Debug, Clone, Default)]
struct StoredAccount {
    balance: Decimal,
    movements: Vec<Movement>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    accounts: RwLock<HashMap<AccountId, StoredAccount>>,
    batches_committed: AtomicUsize,
}

impl InMemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed balance of an account.
    pub fn balance(&self, account_id: AccountId) -> Option<Decimal> {
        self.accounts.read().get(&account_id).map(|a| a.balance)
    }

    /// Committed movements of an account.
    pub fn movements(&self, account_id: AccountId) -> Vec<Movement> {
        self.accounts
            .read()
            .get(&account_id)
            .map(|a| a.movements.clone())
            .unwrap_or_default()
    }

    /// Number of batches committed.
    pub fn batch_count(&self) -> usize {
        self.batches_committed.load(Ordering::Relaxed)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();

        // Check every update before touching anything.
        for update in &batch.updates {
            let stored_len = accounts
                .get(&update.account_id)
                .map(|a| a.movements.len())
                .unwrap_or(0);
            let stored_balance = accounts
                .get(&update.account_id)
                .map(|a| a.balance)
                .unwrap_or(Decimal::ZERO);

            if let Some(first) = update.movements.first() {
                if first.balance_before != stored_balance {
                    return Err(StoreError::Conflict {
                        account_id: update.account_id,
                        reason: format!(
                            "batch starts at {} after {stored_len} stored movements ending at {stored_balance}",
                            first.balance_before
                        ),
                    });
                }
            }
        }

        for update in &batch.updates {
            let stored = accounts.entry(update.account_id).or_default();
            stored.balance = update.balance;
            stored.movements.extend(update.movements.iter().cloned());
        }
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        drop(accounts);

        debug!(
            batch_id = %batch.id,
            operation = %batch.operation,
            movements = batch.movement_count(),
            "Batch committed"
        );
        Ok(())
    }
}
