//! Account definitions for the ledger.
//!
//! `Account` is a closed sum type over the three products. Each variant wraps
//! an `AccountCore` (identity, balance, movements) and implements
//! `AccountOperations` with its own rules.

use miplata_common::{AccountId, AccountKind, BankError, ClientId, Result, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceSummary;
use crate::checking::CheckingAccount;
use crate::credit_card::CreditCardAccount;
use crate::movement::{Movement, MovementKind, MovementLedger, ReconciliationError};
use crate::savings::SavingsAccount;
use crate::transfer;

/// State shared by every account kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCore {
    /// Unique account identifier.
    pub id: AccountId,
    /// Unique account number, e.g. `AH000001`.
    pub number: String,
    /// Owning client.
    pub client_id: ClientId,
    /// When the account was opened.
    pub created_at: Timestamp,
    balance: Decimal,
    ledger: MovementLedger,
}

impl AccountCore {
    /// Create an empty account core with a zero balance.
    pub fn new(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            number: number.into(),
            client_id,
            created_at,
            balance: Decimal::ZERO,
            ledger: MovementLedger::new(id),
        }
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Movement ledger.
    pub fn ledger(&self) -> &MovementLedger {
        &self.ledger
    }

    /// Set the balance and record the movement that explains it.
    pub(crate) fn apply(
        &mut self,
        kind: MovementKind,
        amount: Decimal,
        new_balance: Decimal,
        description: String,
        at: Timestamp,
    ) -> Decimal {
        let before = self.balance;
        self.balance = new_balance;
        self.ledger
            .record(kind, amount, description, before, new_balance, at);
        new_balance
    }

    fn restore(&mut self, balance: Decimal, ledger_len: usize) {
        self.balance = balance;
        self.ledger.discard_from(ledger_len);
    }
}

/// Variant-specific mutable state captured by a savepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantState {
    /// Savings accrual date.
    Savings { last_interest_accrual: Timestamp },
    /// Checking overdraft in use.
    Checking { overdraft_used: Decimal },
    /// Credit card line.
    CreditCard { credit_limit: Decimal },
}

/// Point an account can be rolled back to while its lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint {
    balance: Decimal,
    ledger_len: usize,
    state: VariantState,
}

impl Savepoint {
    /// Number of movements that existed when the savepoint was taken.
    pub fn ledger_len(&self) -> usize {
        self.ledger_len
    }

    /// Balance when the savepoint was taken.
    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

/// Capabilities shared by every account kind.
pub trait AccountOperations {
    /// Shared account state.
    fn core(&self) -> &AccountCore;

    /// Mutable shared account state.
    fn core_mut(&mut self) -> &mut AccountCore;

    /// Product kind.
    fn kind(&self) -> AccountKind;

    /// Credit `amount`. Returns the new balance.
    fn deposit(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal>;

    /// Debit `amount`. Returns the new balance.
    fn withdraw(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal>;

    /// Move `amount` to `target`: withdraw here, then deposit there.
    /// Returns this account's new balance.
    fn transfer(
        &mut self,
        target: &mut Account,
        amount: Decimal,
        description: &str,
        at: Timestamp,
    ) -> Result<Decimal>
    where
        Self: Sized,
    {
        transfer::withdraw_then_deposit(self, target, amount, description, at)
    }

    /// Snapshot of variant-specific state.
    fn variant_state(&self) -> VariantState;

    /// Restore variant-specific state from a snapshot of the same kind.
    fn restore_variant_state(&mut self, state: VariantState);

    /// Capture the current state.
    fn savepoint(&self) -> Savepoint {
        Savepoint {
            balance: self.core().balance(),
            ledger_len: self.core().ledger().len(),
            state: self.variant_state(),
        }
    }

    /// Undo everything done since `savepoint`, including uncommitted movements.
    fn rollback(&mut self, savepoint: Savepoint) {
        self.core_mut()
            .restore(savepoint.balance, savepoint.ledger_len);
        self.restore_variant_state(savepoint.state);
    }

    /// Movements recorded since `savepoint`.
    fn movements_since(&self, savepoint: &Savepoint) -> &[Movement] {
        self.core().ledger().since(savepoint.ledger_len)
    }
}

/// A customer account of one of the three products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    /// Savings account.
    Savings(SavingsAccount),
    /// Checking account.
    Checking(CheckingAccount),
    /// Credit card.
    CreditCard(CreditCardAccount),
}

impl Account {
    /// Open a savings account.
    pub fn savings(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        opened_at: Timestamp,
    ) -> Self {
        Account::Savings(SavingsAccount::new(id, number, client_id, opened_at))
    }

    /// Open a checking account.
    pub fn checking(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        opened_at: Timestamp,
    ) -> Self {
        Account::Checking(CheckingAccount::new(id, number, client_id, opened_at))
    }

    /// Open a credit card with the given limit.
    pub fn credit_card(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        credit_limit: Decimal,
        opened_at: Timestamp,
    ) -> Result<Self> {
        Ok(Account::CreditCard(CreditCardAccount::new(
            id,
            number,
            client_id,
            credit_limit,
            opened_at,
        )?))
    }

    /// Account identifier.
    pub fn id(&self) -> AccountId {
        self.core().id
    }

    /// Account number.
    pub fn number(&self) -> &str {
        &self.core().number
    }

    /// Owning client.
    pub fn client_id(&self) -> ClientId {
        self.core().client_id
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        self.core().balance()
    }

    /// All movements in chronological order.
    pub fn movements(&self) -> &[Movement] {
        self.core().ledger().entries()
    }

    /// Verify the movement ledger against the live balance.
    pub fn reconcile(&self) -> std::result::Result<(), ReconciliationError> {
        self.core().ledger().reconcile(self.balance())
    }

    /// Product-specific balance view.
    pub fn summary(&self) -> BalanceSummary {
        BalanceSummary::of(self)
    }

    /// Borrow as a credit card, if it is one.
    pub fn as_credit_card(&self) -> Option<&CreditCardAccount> {
        match self {
            Account::CreditCard(card) => Some(card),
            _ => None,
        }
    }

    /// Mutably borrow as a credit card, or fail with `AccountNotCreditCard`.
    pub fn credit_card_mut(&mut self) -> Result<&mut CreditCardAccount> {
        match self {
            Account::CreditCard(card) => Ok(card),
            other => Err(BankError::AccountNotCreditCard(other.id())),
        }
    }

    /// Borrow as a savings account, if it is one.
    pub fn as_savings(&self) -> Option<&SavingsAccount> {
        match self {
            Account::Savings(savings) => Some(savings),
            _ => None,
        }
    }

    /// Mutably borrow as a savings account, if it is one.
    pub fn as_savings_mut(&mut self) -> Option<&mut SavingsAccount> {
        match self {
            Account::Savings(savings) => Some(savings),
            _ => None,
        }
    }

    /// Borrow as a checking account, if it is one.
    pub fn as_checking(&self) -> Option<&CheckingAccount> {
        match self {
            Account::Checking(checking) => Some(checking),
            _ => None,
        }
    }
}

impl AccountOperations for Account {
    fn core(&self) -> &AccountCore {
        match self {
            Account::Savings(a) => a.core(),
            Account::Checking(a) => a.core(),
            Account::CreditCard(a) => a.core(),
        }
    }

    fn core_mut(&mut self) -> &mut AccountCore {
        match self {
            Account::Savings(a) => a.core_mut(),
            Account::Checking(a) => a.core_mut(),
            Account::CreditCard(a) => a.core_mut(),
        }
    }

    fn kind(&self) -> AccountKind {
        match self {
            Account::Savings(_) => AccountKind::Savings,
            Account::Checking(_) => AccountKind::Checking,
            Account::CreditCard(_) => AccountKind::CreditCard,
        }
    }

    fn deposit(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        match self {
            Account::Savings(a) => a.deposit(amount, description, at),
            Account::Checking(a) => a.deposit(amount, description, at),
            Account::CreditCard(a) => a.deposit(amount, description, at),
        }
    }

    fn withdraw(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        match self {
            Account::Savings(a) => a.withdraw(amount, description, at),
            Account::Checking(a) => a.withdraw(amount, description, at),
            Account::CreditCard(a) => a.withdraw(amount, description, at),
        }
    }

    fn transfer(
        &mut self,
        target: &mut Account,
        amount: Decimal,
        description: &str,
        at: Timestamp,
    ) -> Result<Decimal> {
        match self {
            Account::Savings(a) => a.transfer(target, amount, description, at),
            Account::Checking(a) => a.transfer(target, amount, description, at),
            Account::CreditCard(a) => a.transfer(target, amount, description, at),
        }
    }

    fn variant_state(&self) -> VariantState {
        match self {
            Account::Savings(a) => a.variant_state(),
            Account::Checking(a) => a.variant_state(),
            Account::CreditCard(a) => a.variant_state(),
        }
    }

    fn restore_variant_state(&mut self, state: VariantState) {
        match self {
            Account::Savings(a) => a.restore_variant_state(state),
            Account::Checking(a) => a.restore_variant_state(state),
            Account::CreditCard(a) => a.restore_variant_state(state),
        }
    }
}
