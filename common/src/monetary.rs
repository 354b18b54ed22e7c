//! Monetary helpers for Mi Plata.
//!
//! All amounts are `Decimal` values with two fractional digits. Rates are
//! kept at full precision and only results are rounded.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BankError, Result};

/// Fractional digits carried by every balance and amount.
pub const MONEY_SCALE: u32 = 2;

/// Round a computed amount to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate a computed amount to cents, toward zero.
pub fn floor_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

/// Validate a caller-supplied amount.
///
/// Rejects zero, negative values and values with more than two fractional
/// digits. Returns the amount rescaled to exactly two digits.
pub fn ensure_valid_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(BankError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount must be greater than zero".to_string(),
        });
    }

    if amount.normalize().scale() > MONEY_SCALE {
        return Err(BankError::InvalidAmount {
            amount: amount.to_string(),
            reason: format!("amount must have at most {MONEY_SCALE} decimal places"),
        });
    }

    let mut rescaled = amount;
    rescaled.rescale(MONEY_SCALE);
    Ok(rescaled)
}

/// `balance + amount`, or `InvalidAmount` when the result leaves the
/// representable range.
pub fn credit_balance(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .ok_or_else(|| out_of_range(amount))
}

/// `balance - amount`, or `InvalidAmount` when the result leaves the
/// representable range.
pub fn debit_balance(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_sub(amount)
        .ok_or_else(|| out_of_range(amount))
}

fn out_of_range(amount: Decimal) -> BankError {
    BankError::InvalidAmount {
        amount: amount.to_string(),
        reason: "resulting balance is out of range".to_string(),
    }
}

/// Format an amount as `$1,234,567.89`; negative values as `-$12.00`.
pub fn format_money(value: Decimal) -> String {
    let rounded = round_money(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let mut abs = rounded.abs();
    abs.rescale(MONEY_SCALE);
    let text = abs.to_string();
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{cents}")
}

/// A periodic interest rate expressed as a fraction (0.015 = 1.5%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rate(Decimal);

impl Rate {
    /// Zero rate.
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// Create a rate from its fractional value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Fractional value of the rate.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the rate is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Interest produced by this rate on `base` for one period, in cents.
    pub fn interest_on(&self, base: Decimal) -> Decimal {
        round_money(base * self.0)
    }

    /// `(1 + rate)^periods`, computed by repeated exact multiplication.
    pub fn compound_factor(&self, periods: u32) -> Decimal {
        let step = Decimal::ONE + self.0;
        (0..periods).fold(Decimal::ONE, |factor, _| factor * step)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut percent = (self.0 * dec!(100)).round_dp(2);
        percent.rescale(2);
        write!(f, "{percent}%")
    }
}
