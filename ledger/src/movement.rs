//! Movement types for the per-account ledger.

use miplata_common::{format_money, AccountId, MovementId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Money credited to a savings or checking account.
    Deposit,
    /// Money debited from a savings or checking account.
    Withdrawal,
    /// Savings interest credited at withdrawal time.
    Interest,
    /// Payment toward a credit card balance.
    Payment,
    /// Single-shot credit card purchase or cash advance.
    Purchase,
    /// Financed credit card purchase, recorded at its compounded total.
    InstallmentPurchase,
}

impl MovementKind {
    /// Check if this kind reduces the balance.
    pub fn is_debit(&self) -> bool {
        matches!(
            self,
            MovementKind::Withdrawal | MovementKind::Purchase | MovementKind::InstallmentPurchase
        )
    }

    /// Check if this kind increases (or never reduces) the balance.
    pub fn is_credit(&self) -> bool {
        !self.is_debit()
    }

    /// Statement label.
    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Deposit => "Deposit",
            MovementKind::Withdrawal => "Withdrawal",
            MovementKind::Interest => "Interest",
            MovementKind::Payment => "Payment",
            MovementKind::Purchase => "Purchase",
            MovementKind::InstallmentPurchase => "Installment purchase",
        }
    }
}

/// A single immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Unique movement ID.
    pub id: MovementId,
    /// Account affected.
    pub account_id: AccountId,
    /// Event type.
    pub kind: MovementKind,
    /// Positive magnitude of the event.
    pub amount: Decimal,
    /// Free-text description.
    pub description: String,
    /// Balance before this movement.
    pub balance_before: Decimal,
    /// Balance after this movement.
    pub balance_after: Decimal,
    /// When this movement was recorded.
    pub created_at: Timestamp,
}

impl Movement {
    /// Actual change applied to the balance.
    ///
    /// Differs from the signed amount when part of a checking deposit went to
    /// overdraft repayment or part of a withdrawal came from overdraft.
    pub fn balance_delta(&self) -> Decimal {
        self.balance_after - self.balance_before
    }

    /// Amount signed by kind: negative for debits, positive for credits.
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }

    /// One-line statement rendering.
    pub fn statement_line(&self) -> String {
        format!(
            "{} - {}: {} - {} - Balance: {}",
            self.created_at.format("%d/%m/%Y %H:%M"),
            self.kind.label(),
            format_money(self.amount),
            self.description,
            format_money(self.balance_after)
        )
    }
}

/// Ledger audit failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// An entry does not start where the previous one ended.
    #[error("movement {index} starts at {actual} but previous balance was {expected}")]
    BrokenChain {
        index: usize,
        expected: Decimal,
        actual: Decimal,
    },

    /// An entry moves the balance against its kind.
    #[error("movement {index} of kind {kind:?} changed the balance by {delta}")]
    DirectionMismatch {
        index: usize,
        kind: MovementKind,
        delta: Decimal,
    },

    /// An entry is owned by another account.
    #[error("movement {index} belongs to account {owner}")]
    ForeignMovement { index: usize, owner: AccountId },

    /// The chain does not end at the live balance.
    #[error("ledger ends at {ledger} but live balance is {live}")]
    BalanceMismatch { ledger: Decimal, live: Decimal },
}

/// Append-only sequence of movements for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLedger {
    account_id: AccountId,
    entries: Vec<Movement>,
}

impl MovementLedger {
    /// Create an empty ledger.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            entries: Vec::new(),
        }
    }

    /// Owning account.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// All entries in chronological order.
    pub fn entries(&self) -> &[Movement] {
        &self.entries
    }

    /// Entries recorded after the first `mark` entries.
    pub fn since(&self, mark: usize) -> &[Movement] {
        self.entries.get(mark..).unwrap_or(&[])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&Movement> {
        self.entries.last()
    }

    /// Append an entry.
    pub(crate) fn record(
        &mut self,
        kind: MovementKind,
        amount: Decimal,
        description: String,
        balance_before: Decimal,
        balance_after: Decimal,
        created_at: Timestamp,
    ) -> &Movement {
        self.entries.push(Movement {
            id: MovementId::new(),
            account_id: self.account_id,
            kind,
            amount,
            description,
            balance_before,
            balance_after,
            created_at,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Drop entries recorded after `mark` that were never committed.
    pub(crate) fn discard_from(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    /// Get total debits by kind.
    pub fn total_debits(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|m| m.kind.is_debit())
            .map(|m| m.amount)
            .sum()
    }

    /// Get total credits by kind.
    pub fn total_credits(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|m| m.kind.is_credit())
            .map(|m| m.amount)
            .sum()
    }

    /// Verify the ledger against the live balance.
    ///
    /// The chain must start at zero, each entry must begin where the previous
    /// ended, move in the direction of its kind, and the last entry must end
    /// at `live_balance`.
    pub fn reconcile(&self, live_balance: Decimal) -> Result<(), ReconciliationError> {
        let mut running = Decimal::ZERO;

        for (index, movement) in self.entries.iter().enumerate() {
            if movement.account_id != self.account_id {
                return Err(ReconciliationError::ForeignMovement {
                    index,
                    owner: movement.account_id,
                });
            }

            if movement.balance_before != running {
                return Err(ReconciliationError::BrokenChain {
                    index,
                    expected: running,
                    actual: movement.balance_before,
                });
            }

            let delta = movement.balance_delta();
            let wrong_direction = if movement.kind.is_debit() {
                delta > Decimal::ZERO
            } else {
                delta < Decimal::ZERO
            };
            if wrong_direction {
                return Err(ReconciliationError::DirectionMismatch {
                    index,
                    kind: movement.kind,
                    delta,
                });
            }

            running = movement.balance_after;
        }

        if running != live_balance {
            return Err(ReconciliationError::BalanceMismatch {
                ledger: running,
                live: live_balance,
            });
        }

        Ok(())
    }
}
