//! Mi Plata Ledger
//!
//! Account products, their movement ledgers and the rules that change them.
//! Everything here is synchronous and works on accounts the caller already
//! holds exclusively; locking and persistence live in the banking crate.

pub mod account;
pub mod balance;
pub mod checking;
pub mod credit_card;
pub mod journal;
pub mod movement;
pub mod savings;
pub mod transfer;

pub use account::{Account, AccountCore, AccountOperations, Savepoint, VariantState};
pub use balance::{BalanceSummary, ProductDetails};
pub use checking::{CheckingAccount, OVERDRAFT_RATIO};
pub use credit_card::{
    installment_rate, CreditCardAccount, InstallmentQuote, HIGH_TIER_RATE, MAX_INSTALLMENTS,
    MID_TIER_RATE,
};
pub use journal::{AccountUpdate, CommitBatch};
pub use movement::{Movement, MovementKind, MovementLedger, ReconciliationError};
pub use savings::{InterestAccrual, SavingsAccount, SAVINGS_MONTHLY_RATE};
