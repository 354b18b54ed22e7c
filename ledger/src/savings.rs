//! Savings account: monthly compound interest applied at withdrawal time.

use miplata_common::{
    credit_balance, debit_balance, ensure_valid_amount, format_money, months_between, AccountId,
    AccountKind, BankError, ClientId, Rate, Result, Timestamp,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::{AccountCore, AccountOperations, VariantState};
use crate::movement::MovementKind;

/// Monthly interest paid on savings balances (1.5%).
pub const SAVINGS_MONTHLY_RATE: Rate = Rate::new(dec!(0.015));

/// Interest that would be credited if accrual ran now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccrual {
    /// Whole calendar months being paid.
    pub months: u32,
    /// Total interest over those months.
    pub interest: Decimal,
    /// Balance once the interest is credited.
    pub balance_after: Decimal,
}

/// A savings account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsAccount {
    core: AccountCore,
    last_interest_accrual: Timestamp,
}

impl SavingsAccount {
    /// Open a savings account; interest starts accruing from `opened_at`.
    pub fn new(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            core: AccountCore::new(id, number, client_id, opened_at),
            last_interest_accrual: opened_at,
        }
    }

    /// When interest was last computed.
    pub fn last_interest_accrual(&self) -> Timestamp {
        self.last_interest_accrual
    }

    /// Override the accrual date, e.g. when loading a stored account.
    pub fn with_last_interest_accrual(mut self, at: Timestamp) -> Self {
        self.last_interest_accrual = at;
        self
    }

    /// Monthly rate paid by this product.
    pub fn monthly_rate(&self) -> Rate {
        SAVINGS_MONTHLY_RATE
    }

    /// Interest one more month would pay on the current balance.
    pub fn projected_monthly_interest(&self) -> Decimal {
        SAVINGS_MONTHLY_RATE.interest_on(self.core.balance())
    }

    /// Interest owed at `at`, compounded month by month, without applying it.
    ///
    /// `None` when no full calendar month has passed or the balance is not
    /// positive; in that case the accrual date does not move either.
    pub fn preview_interest(&self, at: Timestamp) -> Result<Option<InterestAccrual>> {
        let months = months_between(self.last_interest_accrual, at);
        let Some(months) = u32::try_from(months).ok().filter(|m| *m > 0) else {
            return Ok(None);
        };

        let mut balance = self.core.balance();
        if balance <= Decimal::ZERO {
            return Ok(None);
        }

        let mut interest = Decimal::ZERO;
        for _ in 0..months {
            let monthly = SAVINGS_MONTHLY_RATE.interest_on(balance);
            balance = credit_balance(balance, monthly)?;
            interest += monthly;
        }

        Ok(Some(InterestAccrual {
            months,
            interest,
            balance_after: balance,
        }))
    }

    fn apply_accrual(&mut self, accrual: InterestAccrual, at: Timestamp) {
        if accrual.interest > Decimal::ZERO {
            debug!(
                account = %self.core.id,
                months = accrual.months,
                interest = %accrual.interest,
                "Crediting savings interest"
            );
            self.core.apply(
                MovementKind::Interest,
                accrual.interest,
                accrual.balance_after,
                format!(
                    "Interest at {} monthly for {} month(s)",
                    SAVINGS_MONTHLY_RATE, accrual.months
                ),
                at,
            );
        }
        self.last_interest_accrual = at;
    }
}

impl AccountOperations for SavingsAccount {
    fn core(&self) -> &AccountCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AccountCore {
        &mut self.core
    }

    fn kind(&self) -> AccountKind {
        AccountKind::Savings
    }

    fn deposit(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        let new_balance = credit_balance(self.core.balance(), amount)?;
        Ok(self.core.apply(
            MovementKind::Deposit,
            amount,
            new_balance,
            description.to_string(),
            at,
        ))
    }

    fn withdraw(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;

        // Accrual is decided first but only applied once the debit is known
        // to succeed.
        let accrual = self.preview_interest(at)?;
        let available = accrual
            .map(|a| a.balance_after)
            .unwrap_or_else(|| self.core.balance());

        if amount > available {
            return Err(BankError::InsufficientFunds {
                required: format_money(amount),
                available: format_money(available),
            });
        }

        if let Some(accrual) = accrual {
            self.apply_accrual(accrual, at);
        }

        let new_balance = debit_balance(self.core.balance(), amount)?;
        Ok(self.core.apply(
            MovementKind::Withdrawal,
            amount,
            new_balance,
            description.to_string(),
            at,
        ))
    }

    fn variant_state(&self) -> VariantState {
        VariantState::Savings {
            last_interest_accrual: self.last_interest_accrual,
        }
    }

    fn restore_variant_state(&mut self, state: VariantState) {
        if let VariantState::Savings {
            last_interest_accrual,
        } = state
        {
            self.last_interest_accrual = last_interest_accrual;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn funded_account(balance: Decimal, opened: Timestamp) -> SavingsAccount {
        let mut account = SavingsAccount::new(
            AccountId::new(1),
            "AH000001",
            ClientId::new(1),
            opened,
        );
        assert_ok!(account.deposit(balance, "opening deposit", opened));
        account
    }

    #[test]
    fn test_two_months_of_compound_interest_before_withdrawal() {
        let mut account = funded_account(dec!(1000000), at(2025, 1, 20));
        let now = at(2025, 3, 5);

        let balance = assert_ok!(account.withdraw(dec!(100), "atm", now));
        assert_eq!(balance, dec!(1030125));

        let movements = account.core().ledger().entries();
        assert_eq!(movements.len(), 3);

        let interest = &movements[1];
        assert_eq!(interest.kind, MovementKind::Interest);
        assert_eq!(interest.amount, dec!(30225));
        assert_eq!(interest.balance_before, dec!(1000000));
        assert_eq!(interest.balance_after, dec!(1030225));
        assert!(interest.description.contains("1.50%"));
        assert!(interest.description.contains("2 month"));

        let withdrawal = &movements[2];
        assert_eq!(withdrawal.kind, MovementKind::Withdrawal);
        assert_eq!(withdrawal.amount, dec!(100));
        assert_eq!(withdrawal.balance_after, dec!(1030125));

        assert_eq!(account.last_interest_accrual(), now);
    }

    #[test]
    fn test_same_month_withdrawal_accrues_nothing() {
        let mut account = funded_account(dec!(5000), at(2025, 4, 1));
        assert_ok!(account.withdraw(dec!(1000), "atm", at(2025, 4, 30)));

        assert_eq!(account.core().balance(), dec!(4000));
        assert_eq!(account.core().ledger().len(), 2);
        assert_eq!(account.last_interest_accrual(), at(2025, 4, 1));
    }

    #[test]
    fn test_calendar_month_boundary_counts_as_a_month() {
        let account = funded_account(dec!(1000), at(2025, 1, 31));
        let accrual = account.preview_interest(at(2025, 2, 1)).unwrap().unwrap();
        assert_eq!(accrual.months, 1);
        assert_eq!(accrual.interest, dec!(15));
    }

    #[test]
    fn test_insufficient_funds_discards_accrual() {
        let mut account = funded_account(dec!(1000), at(2025, 1, 1));
        let before = account.clone();

        // 1000 grows to 1015 after a month, still short of 2000.
        let err = assert_err!(account.withdraw(dec!(2000), "too much", at(2025, 2, 1)));
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert_eq!(account, before);
    }

    #[test]
    fn test_interest_can_cover_the_withdrawal() {
        let mut account = funded_account(dec!(1000), at(2025, 1, 1));
        assert_ok!(account.withdraw(dec!(1015), "all of it", at(2025, 2, 1)));
        assert_eq!(account.core().balance(), Decimal::ZERO);
    }

    #[test]
    fn test_empty_account_keeps_accrual_date() {
        let opened = at(2025, 1, 1);
        let mut account = SavingsAccount::new(AccountId::new(1), "AH000001", ClientId::new(1), opened);
        assert_eq!(account.preview_interest(at(2025, 6, 1)), Ok(None));

        assert_err!(account.withdraw(dec!(1), "nothing there", at(2025, 6, 1)));
        assert_eq!(account.last_interest_accrual(), opened);
    }

    #[test]
    fn test_projection_has_no_side_effect() {
        let account = funded_account(dec!(200000), at(2025, 1, 1));
        assert_eq!(account.projected_monthly_interest(), dec!(3000));
        assert_eq!(account.core().ledger().len(), 1);
    }

    #[test]
    fn test_deposit_is_unconditional_credit() {
        let mut account = funded_account(dec!(10), at(2025, 1, 1));
        let balance = assert_ok!(account.deposit(dec!(0.99), "coins", at(2030, 1, 1)));
        assert_eq!(balance, dec!(10.99));
        assert_eq!(account.last_interest_accrual(), at(2025, 1, 1));
    }

    #[test]
    fn test_seeded_accrual_date_drives_interest() {
        let opened = at(2024, 1, 1);
        let account = funded_account(dec!(1000), opened).with_last_interest_accrual(at(2025, 1, 1));
        assert_eq!(account.last_interest_accrual(), at(2025, 1, 1));

        let accrual = account.preview_interest(at(2025, 2, 1)).unwrap().unwrap();
        assert_eq!(accrual.months, 1);
        assert_eq!(accrual.balance_after, dec!(1015));
    }

    #[test]
    fn test_deposit_past_decimal_range_is_rejected() {
        let opened = at(2025, 1, 1);
        let mut account = funded_account(dec!(50000000000000000000000000000), opened);
        let before = account.clone();

        let err = assert_err!(account.deposit(dec!(50000000000000000000000000000), "again", opened));
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
        assert_eq!(account, before);
    }

    #[test]
    fn test_interest_past_decimal_range_is_rejected() {
        let opened = at(2025, 1, 1);
        let mut account = funded_account(dec!(79000000000000000000000000000), opened);
        let before = account.clone();

        let err = assert_err!(account.withdraw(dec!(1), "atm", at(2025, 2, 1)));
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
        assert_eq!(account, before);
    }
}
