//! Balance views per product.

use miplata_common::{format_money, AccountId, AccountKind, Rate, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountOperations};

/// Product-specific figures shown alongside the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductDetails {
    /// Savings interest terms.
    Savings {
        monthly_rate: Rate,
        last_interest_accrual: Timestamp,
        projected_interest: Decimal,
    },
    /// Checking overdraft position.
    Checking {
        overdraft_used: Decimal,
        overdraft_ceiling: Decimal,
        overdraft_available: Decimal,
    },
    /// Credit card line.
    CreditCard {
        credit_limit: Decimal,
        available_credit: Decimal,
        debt: Decimal,
    },
}

/// Account balance at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Account identifier.
    pub account_id: AccountId,
    /// Account number.
    pub number: String,
    /// Product kind.
    pub kind: AccountKind,
    /// Current balance.
    pub balance: Decimal,
    /// What can be spent right now.
    pub available: Decimal,
    /// Product-specific figures.
    pub details: ProductDetails,
}

impl BalanceSummary {
    /// Snapshot an account.
    pub fn of(account: &Account) -> Self {
        let (available, details) = match account {
            Account::Savings(savings) => (
                savings.core().balance(),
                ProductDetails::Savings {
                    monthly_rate: savings.monthly_rate(),
                    last_interest_accrual: savings.last_interest_accrual(),
                    projected_interest: savings.projected_monthly_interest(),
                },
            ),
            Account::Checking(checking) => (
                checking.max_withdrawable().max(Decimal::ZERO),
                ProductDetails::Checking {
                    overdraft_used: checking.overdraft_used(),
                    overdraft_ceiling: checking.overdraft_ceiling(),
                    overdraft_available: checking.overdraft_available(),
                },
            ),
            Account::CreditCard(card) => (
                card.available_credit(),
                ProductDetails::CreditCard {
                    credit_limit: card.credit_limit(),
                    available_credit: card.available_credit(),
                    debt: card.debt(),
                },
            ),
        };

        Self {
            account_id: account.id(),
            number: account.number().to_string(),
            kind: account.kind(),
            balance: account.balance(),
            available,
            details,
        }
    }

    /// Human-readable one-liner.
    pub fn describe(&self) -> String {
        let head = format!(
            "{} {} - Balance: {}",
            self.kind,
            self.number,
            format_money(self.balance)
        );
        match &self.details {
            ProductDetails::Savings { monthly_rate, .. } => {
                format!("{head} - Interest: {monthly_rate} monthly")
            }
            ProductDetails::Checking {
                overdraft_used,
                overdraft_available,
                ..
            } => format!(
                "{head} - Overdraft used: {} - Overdraft available: {}",
                format_money(*overdraft_used),
                format_money(*overdraft_available)
            ),
            ProductDetails::CreditCard {
                credit_limit,
                available_credit,
                ..
            } => format!(
                "{head} - Limit: {} - Available: {}",
                format_money(*credit_limit),
                format_money(*available_credit)
            ),
        }
    }
}
