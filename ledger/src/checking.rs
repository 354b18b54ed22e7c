//! Checking account with a dynamic overdraft line.

use miplata_common::{
    credit_balance, ensure_valid_amount, floor_money, format_money, AccountId, AccountKind,
    BankError, ClientId, Result, Timestamp,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountCore, AccountOperations, VariantState};
use crate::movement::MovementKind;
use crate::transfer;

/// Share of the current balance that may be overdrawn (20%).
pub const OVERDRAFT_RATIO: Decimal = dec!(0.20);

/// A checking account.
///
/// The overdraft ceiling follows the *current* balance, so it shrinks to zero
/// as soon as an overdraft empties the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckingAccount {
    core: AccountCore,
    overdraft_used: Decimal,
}

impl CheckingAccount {
    /// Open a checking account with no overdraft in use.
    pub fn new(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            core: AccountCore::new(id, number, client_id, opened_at),
            overdraft_used: Decimal::ZERO,
        }
    }

    /// Overdraft currently owed.
    pub fn overdraft_used(&self) -> Decimal {
        self.overdraft_used
    }

    /// Maximum overdraft for the current balance, truncated to cents.
    pub fn overdraft_ceiling(&self) -> Decimal {
        floor_money(self.core.balance() * OVERDRAFT_RATIO)
    }

    /// Overdraft still available, never negative.
    pub fn overdraft_available(&self) -> Decimal {
        (self.overdraft_ceiling() - self.overdraft_used).max(Decimal::ZERO)
    }

    /// Largest amount a withdrawal may take right now.
    ///
    /// Saturates at `Decimal::MAX` for balances near the top of the range.
    pub fn max_withdrawable(&self) -> Decimal {
        self.core
            .balance()
            .saturating_add(self.overdraft_ceiling() - self.overdraft_used)
    }

    /// Check if any overdraft is owed.
    pub fn is_overdrawn(&self) -> bool {
        self.overdraft_used > Decimal::ZERO
    }

    fn ensure_withdrawable(&self, amount: Decimal) -> Result<()> {
        let limit = self.max_withdrawable();
        if amount > limit {
            return Err(BankError::InsufficientFunds {
                required: format_money(amount),
                available: format_money(limit.max(Decimal::ZERO)),
            });
        }
        Ok(())
    }
}

impl AccountOperations for CheckingAccount {
    fn core(&self) -> &AccountCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AccountCore {
        &mut self.core
    }

    fn kind(&self) -> AccountKind {
        AccountKind::Checking
    }

    fn deposit(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        let balance = self.core.balance();

        let (new_balance, description) = if !self.is_overdrawn() {
            (credit_balance(balance, amount)?, description.to_string())
        } else if amount >= self.overdraft_used {
            let excess = amount - self.overdraft_used;
            let new_balance = credit_balance(balance, excess)?;
            self.overdraft_used = Decimal::ZERO;
            (new_balance, format!("{description} (overdraft cleared)"))
        } else {
            self.overdraft_used -= amount;
            (
                balance,
                format!(
                    "{description} (overdraft repayment, {} still owed)",
                    format_money(self.overdraft_used)
                ),
            )
        };

        Ok(self
            .core
            .apply(MovementKind::Deposit, amount, new_balance, description, at))
    }

    fn withdraw(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        self.ensure_withdrawable(amount)?;

        let balance = self.core.balance();
        if amount <= balance {
            return Ok(self.core.apply(
                MovementKind::Withdrawal,
                amount,
                balance - amount,
                description.to_string(),
                at,
            ));
        }

        let from_overdraft = amount - balance;
        self.overdraft_used += from_overdraft;
        Ok(self.core.apply(
            MovementKind::Withdrawal,
            amount,
            Decimal::ZERO,
            format!(
                "{description} (overdraft used: {})",
                format_money(from_overdraft)
            ),
            at,
        ))
    }

    fn transfer(
        &mut self,
        target: &mut Account,
        amount: Decimal,
        description: &str,
        at: Timestamp,
    ) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        self.ensure_withdrawable(amount)?;
        transfer::withdraw_then_deposit(self, target, amount, description, at)
    }

    fn variant_state(&self) -> VariantState {
        VariantState::Checking {
            overdraft_used: self.overdraft_used,
        }
    }

    fn restore_variant_state(&mut self, state: VariantState) {
        if let VariantState::Checking { overdraft_used } = state {
            self.overdraft_used = overdraft_used;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap()
    }

    fn account() -> CheckingAccount {
        CheckingAccount::new(AccountId::new(2), "CC000002", ClientId::new(1), now())
    }

    #[test]
    fn test_empty_account_has_no_overdraft() {
        let mut account = account();
        assert_eq!(account.overdraft_ceiling(), Decimal::ZERO);

        let err = assert_err!(account.withdraw(dec!(100), "atm", now()));
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert!(account.core().ledger().is_empty());
    }

    #[test]
    fn test_overdraft_cycle() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(1000), "payroll", now()));
        assert_eq!(account.overdraft_ceiling(), dec!(200));

        let balance = assert_ok!(account.withdraw(dec!(1100), "rent", now()));
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(account.overdraft_used(), dec!(100));

        let balance = assert_ok!(account.deposit(dec!(50), "refund", now()));
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(account.overdraft_used(), dec!(50));

        let balance = assert_ok!(account.deposit(dec!(80), "refund", now()));
        assert_eq!(balance, dec!(30));
        assert_eq!(account.overdraft_used(), Decimal::ZERO);

        let kinds: Vec<_> = account.core().ledger().entries().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MovementKind::Deposit,
                MovementKind::Withdrawal,
                MovementKind::Deposit,
                MovementKind::Deposit,
            ]
        );
        let descriptions: Vec<_> = account
            .core()
            .ledger()
            .entries()
            .iter()
            .map(|m| m.description.clone())
            .collect();
        assert!(descriptions[1].contains("overdraft used: $100.00"));
        assert!(descriptions[2].contains("overdraft repayment"));
        assert!(descriptions[3].contains("overdraft cleared"));
        assert!(account.core().ledger().reconcile(dec!(30)).is_ok());
    }

    #[test]
    fn test_withdraw_up_to_ceiling() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(1000), "payroll", now()));

        let err = assert_err!(account.withdraw(dec!(1200.01), "too much", now()));
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");

        assert_ok!(account.withdraw(dec!(1200), "exact limit", now()));
        assert_eq!(account.overdraft_used(), dec!(200));
        assert_eq!(account.max_withdrawable(), dec!(-200));
        assert_eq!(account.overdraft_available(), Decimal::ZERO);
    }

    #[test]
    fn test_ceiling_shrinks_once_overdrawn() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(500), "payroll", now()));
        assert_ok!(account.withdraw(dec!(550), "bills", now()));

        // Balance is zero, so the ceiling is zero too.
        assert_eq!(account.overdraft_ceiling(), Decimal::ZERO);
        assert_err!(account.withdraw(dec!(0.01), "more", now()));
    }

    #[test]
    fn test_ceiling_truncates_to_cents() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(0.99), "coins", now()));
        assert_eq!(account.overdraft_ceiling(), dec!(0.19));
    }

    #[test]
    fn test_transfer_rechecks_limit() {
        let mut source = account();
        let mut target = Account::checking(AccountId::new(7), "CC000007", ClientId::new(2), now());
        assert_ok!(source.deposit(dec!(100), "seed", now()));

        let err = assert_err!(source.transfer(&mut target, dec!(121), "rent", now()));
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert_eq!(source.core().ledger().len(), 1);
        assert!(target.movements().is_empty());

        let balance = assert_ok!(source.transfer(&mut target, dec!(120), "rent", now()));
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(source.overdraft_used(), dec!(20));
        assert_eq!(target.balance(), dec!(120));
        assert_eq!(
            source.core().ledger().last().map(|m| m.description.as_str()),
            Some("outgoing: rent (overdraft used: $20.00)")
        );
    }

    #[test]
    fn test_withdraw_from_balance_near_decimal_max() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(70000000000000000000000000000), "windfall", now()));
        assert_eq!(account.max_withdrawable(), Decimal::MAX);

        let balance = assert_ok!(account.withdraw(dec!(1), "atm", now()));
        assert_eq!(balance, dec!(69999999999999999999999999999));
    }

    #[test]
    fn test_deposit_past_decimal_range_is_rejected() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(70000000000000000000000000000), "windfall", now()));
        let before = account.clone();

        let err = assert_err!(account.deposit(dec!(70000000000000000000000000000), "again", now()));
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
        assert_eq!(account, before);
    }

    #[test]
    fn test_overdraft_withdrawal_delta_differs_from_signed_amount() {
        let mut account = account();
        assert_ok!(account.deposit(dec!(1000), "payroll", now()));
        assert_ok!(account.withdraw(dec!(1100), "rent", now()));

        let withdrawal = account.core().ledger().last().cloned().unwrap();
        assert_eq!(withdrawal.signed_amount(), dec!(-1100));
        assert_eq!(withdrawal.balance_delta(), dec!(-1000));

        assert_ok!(account.deposit(dec!(40), "refund", now()));
        let repayment = account.core().ledger().last().cloned().unwrap();
        assert_eq!(repayment.signed_amount(), dec!(40));
        assert_eq!(repayment.balance_delta(), Decimal::ZERO);
    }
}
