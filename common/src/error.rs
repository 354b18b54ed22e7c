//! Error types for Mi Plata operations.

use crate::{AccountId, AccountKind};
use thiserror::Error;

/// Main error type for account and ledger operations.
///
/// Every variant except `Internal` is a business-rule rejection and carries
/// enough context for the caller. `Internal` hides its detail from `Display`;
/// the detail is only meant for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    /// Amount is zero, negative or not expressible in cents.
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    /// Savings or checking account cannot cover the debit.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: String, available: String },

    /// Credit card line cannot cover the purchase.
    #[error("Insufficient credit: required {required}, available {available}")]
    InsufficientCredit { required: String, available: String },

    /// Account lookup failed (by id or by number).
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Source and destination resolve to the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(AccountId),

    /// Operation not offered by this kind of account.
    #[error("{operation} is not supported for {kind}")]
    UnsupportedOperation {
        operation: &'static str,
        kind: AccountKind,
    },

    /// Credit-card-only operation attempted on another account kind.
    #[error("Account {0} is not a credit card")]
    AccountNotCreditCard(AccountId),

    /// Storage or infrastructure failure.
    #[error("Internal error")]
    Internal(String),
}

impl BankError {
    /// Check if this error is a business-rule rejection.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, BankError::Internal(_))
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            BankError::InvalidAmount { .. } => "INVALID_AMOUNT",
            BankError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BankError::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            BankError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BankError::SameAccountTransfer(_) => "SAME_ACCOUNT_TRANSFER",
            BankError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            BankError::AccountNotCreditCard(_) => "ACCOUNT_NOT_CREDIT_CARD",
            BankError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Internal detail for logging, if any.
    pub fn internal_detail(&self) -> Option<&str> {
        match self {
            BankError::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Result type alias for Mi Plata operations.
pub type Result<T> = std::result::Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_hides_detail() {
        let err = BankError::Internal("connection refused to 10.0.0.4:5432".to_string());
        assert_eq!(err.to_string(), "Internal error");
        assert_eq!(err.internal_detail(), Some("connection refused to 10.0.0.4:5432"));
        assert!(!err.is_business_rule());
    }

    #[test]
    fn test_error_codes() {
        let err = BankError::UnsupportedOperation {
            operation: "transfer",
            kind: AccountKind::CreditCard,
        };
        assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");
        assert_eq!(err.to_string(), "transfer is not supported for Credit card");
        assert!(err.is_business_rule());

        let err = BankError::SameAccountTransfer(AccountId::new(4));
        assert_eq!(err.error_code(), "SAME_ACCOUNT_TRANSFER");
    }
}
