//! Credit card account: a revolving line with installment financing.
//!
//! The balance is signed debt. Negative means the client owes money, zero or
//! positive means nothing is owed.

use miplata_common::{
    credit_balance, debit_balance, ensure_valid_amount, format_money, round_money, AccountId,
    AccountKind, BankError, ClientId, Rate, Result, Timestamp,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::account::{Account, AccountCore, AccountOperations, VariantState};
use crate::movement::MovementKind;
use crate::transfer;

/// Largest installment plan offered.
pub const MAX_INSTALLMENTS: u32 = 60;

/// Monthly rate for plans of 3 to 6 installments (1.9%).
pub const MID_TIER_RATE: Rate = Rate::new(dec!(0.019));

/// Monthly rate for plans of 7 or more installments (2.3%).
pub const HIGH_TIER_RATE: Rate = Rate::new(dec!(0.023));

/// Monthly rate applied to an installment plan of `installments` months.
pub fn installment_rate(installments: u32) -> Rate {
    match installments {
        0..=2 => Rate::ZERO,
        3..=6 => MID_TIER_RATE,
        _ => HIGH_TIER_RATE,
    }
}

/// Pricing of an installment purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentQuote {
    /// Amount financed.
    pub principal: Decimal,
    /// Number of monthly installments.
    pub installments: u32,
    /// Monthly rate from the tier table.
    pub rate: Rate,
    /// `principal * (1 + rate)^installments`, in cents.
    pub total: Decimal,
    /// `total / installments`, in cents.
    pub monthly_payment: Decimal,
}

impl InstallmentQuote {
    /// Price a plan.
    ///
    /// The compound factor is applied once to the whole principal; there is no
    /// per-period amortization schedule.
    pub fn price(principal: Decimal, installments: u32) -> Result<Self> {
        let principal = ensure_valid_amount(principal)?;
        if installments == 0 || installments > MAX_INSTALLMENTS {
            return Err(BankError::InvalidAmount {
                amount: installments.to_string(),
                reason: format!("installment count must be between 1 and {MAX_INSTALLMENTS}"),
            });
        }

        let rate = installment_rate(installments);
        let total = principal
            .checked_mul(rate.compound_factor(installments))
            .map(round_money)
            .ok_or_else(|| BankError::InvalidAmount {
                amount: principal.to_string(),
                reason: "financed total is out of range".to_string(),
            })?;
        let monthly_payment = round_money(total / Decimal::from(installments));

        Ok(Self {
            principal,
            installments,
            rate,
            total,
            monthly_payment,
        })
    }

    /// Financing cost on top of the principal.
    pub fn interest(&self) -> Decimal {
        self.total - self.principal
    }
}

/// A credit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardAccount {
    core: AccountCore,
    credit_limit: Decimal,
}

impl CreditCardAccount {
    /// Open a card with a positive credit limit and no debt.
    pub fn new(
        id: AccountId,
        number: impl Into<String>,
        client_id: ClientId,
        credit_limit: Decimal,
        opened_at: Timestamp,
    ) -> Result<Self> {
        let credit_limit = ensure_valid_amount(credit_limit)?;
        Ok(Self {
            core: AccountCore::new(id, number, client_id, opened_at),
            credit_limit,
        })
    }

    /// Credit limit.
    pub fn credit_limit(&self) -> Decimal {
        self.credit_limit
    }

    /// Headroom left on the line.
    ///
    /// Negative when installment financing pushed the debt past the limit.
    pub fn available_credit(&self) -> Decimal {
        let balance = self.core.balance();
        if balance < Decimal::ZERO {
            self.credit_limit - balance.abs()
        } else {
            self.credit_limit
        }
    }

    /// Amount owed.
    pub fn debt(&self) -> Decimal {
        if self.has_debt() {
            self.core.balance().abs()
        } else {
            Decimal::ZERO
        }
    }

    /// Check if anything is owed.
    pub fn has_debt(&self) -> bool {
        self.core.balance() < Decimal::ZERO
    }

    /// Price a plan for this card without touching it.
    pub fn quote_installments(&self, principal: Decimal, installments: u32) -> Result<InstallmentQuote> {
        InstallmentQuote::price(principal, installments)
    }

    fn ensure_credit(&self, amount: Decimal) -> Result<()> {
        let available = self.available_credit();
        if amount > available {
            return Err(BankError::InsufficientCredit {
                required: format_money(amount),
                available: format_money(available.max(Decimal::ZERO)),
            });
        }
        Ok(())
    }

    /// Finance a purchase over `installments` months.
    ///
    /// Credit is checked against the principal, while the full compounded
    /// total is debited immediately.
    pub fn purchase_installments(
        &mut self,
        principal: Decimal,
        installments: u32,
        description: &str,
        at: Timestamp,
    ) -> Result<InstallmentQuote> {
        let quote = InstallmentQuote::price(principal, installments)?;
        self.ensure_credit(quote.principal)?;

        let mut detail = format!(
            "{description} - {} installments - monthly payment: {}",
            quote.installments,
            format_money(quote.monthly_payment)
        );
        if !quote.rate.is_zero() {
            detail.push_str(&format!(" - interest: {} monthly", quote.rate));
        }

        let new_balance = debit_balance(self.core.balance(), quote.total)?;
        self.core.apply(
            MovementKind::InstallmentPurchase,
            quote.total,
            new_balance,
            detail,
            at,
        );

        if new_balance.abs() > self.credit_limit {
            warn!(
                account = %self.core.id,
                debt = %new_balance.abs(),
                credit_limit = %self.credit_limit,
                "Installment financing pushed debt past the credit limit"
            );
        }

        Ok(quote)
    }

    /// Take a cash advance on the card and deposit it into `target`.
    ///
    /// If the deposit is rejected the advance is rolled back, so either both
    /// legs happen or neither does. Returns the card's new balance.
    pub fn cash_advance(
        &mut self,
        target: &mut Account,
        amount: Decimal,
        description: &str,
        at: Timestamp,
    ) -> Result<Decimal> {
        transfer::compose(
            self,
            target,
            amount,
            &format!("cash advance: {description}"),
            description,
            at,
        )
    }
}

impl AccountOperations for CreditCardAccount {
    fn core(&self) -> &AccountCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AccountCore {
        &mut self.core
    }

    fn kind(&self) -> AccountKind {
        AccountKind::CreditCard
    }

    /// Payment toward the card balance.
    fn deposit(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        let new_balance = credit_balance(self.core.balance(), amount)?;
        Ok(self.core.apply(
            MovementKind::Payment,
            amount,
            new_balance,
            description.to_string(),
            at,
        ))
    }

    /// Single-shot purchase or cash advance.
    fn withdraw(&mut self, amount: Decimal, description: &str, at: Timestamp) -> Result<Decimal> {
        let amount = ensure_valid_amount(amount)?;
        self.ensure_credit(amount)?;
        let new_balance = debit_balance(self.core.balance(), amount)?;
        Ok(self.core.apply(
            MovementKind::Purchase,
            amount,
            new_balance,
            description.to_string(),
            at,
        ))
    }

    fn transfer(
        &mut self,
        _target: &mut Account,
        _amount: Decimal,
        _description: &str,
        _at: Timestamp,
    ) -> Result<Decimal> {
        Err(BankError::UnsupportedOperation {
            operation: "transfer",
            kind: AccountKind::CreditCard,
        })
    }

    fn variant_state(&self) -> VariantState {
        VariantState::CreditCard {
            credit_limit: self.credit_limit,
        }
    }

    fn restore_variant_state(&mut self, state: VariantState) {
        if let VariantState::CreditCard { credit_limit } = state {
            self.credit_limit = credit_limit;
        }
    }
}
