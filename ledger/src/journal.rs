//! Commit batches: the unit handed to durable storage.
//!
//! A batch holds, for every account an operation touched, the state after the
//! operation and the movements it produced. Storage must persist a batch
//! all-or-nothing.

use miplata_common::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{AccountOperations, Savepoint, VariantState};
use crate::movement::Movement;

/// Post-operation state of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// Account affected.
    pub account_id: AccountId,
    /// Account number.
    pub number: String,
    /// Balance after the operation.
    pub balance: Decimal,
    /// Variant state after the operation.
    pub state: VariantState,
    /// Movements produced by the operation, in order.
    pub movements: Vec<Movement>,
}

/// A set of account updates that must be committed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBatch {
    /// Batch ID.
    pub id: Uuid,
    /// Operation name, for logs.
    pub operation: String,
    /// Updates in the batch.
    pub updates: Vec<AccountUpdate>,
}

impl CommitBatch {
    /// Create an empty batch.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            operation: operation.into(),
            updates: Vec::new(),
        }
    }

    /// Add everything `account` did since `savepoint`.
    ///
    /// Accounts with no new movements are skipped.
    pub fn add<A: AccountOperations>(&mut self, account: &A, savepoint: &Savepoint) {
        let movements = account.movements_since(savepoint);
        if movements.is_empty() {
            return;
        }

        let core = account.core();
        self.updates.push(AccountUpdate {
            account_id: core.id,
            number: core.number.clone(),
            balance: core.balance(),
            state: account.variant_state(),
            movements: movements.to_vec(),
        });
    }

    /// Check if the batch has nothing to commit.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Get the number of movements across all updates.
    pub fn movement_count(&self) -> usize {
        self.updates.iter().map(|u| u.movements.len()).sum()
    }

    /// Iterate every movement in the batch.
    pub fn movements(&self) -> impl Iterator<Item = &Movement> {
        self.updates.iter().flat_map(|u| u.movements.iter())
    }

    /// Get total debits.
    pub fn total_debits(&self) -> Decimal {
        self.movements()
            .filter(|m| m.kind.is_debit())
            .map(|m| m.amount)
            .sum()
    }

    /// Get total credits.
    pub fn total_credits(&self) -> Decimal {
        self.movements()
            .filter(|m| m.kind.is_credit())
            .map(|m| m.amount)
            .sum()
    }
}
