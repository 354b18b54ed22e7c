//! Two-leg money movement between accounts already held by the caller.
//!
//! Both legs run against the in-memory accounts. If the credit leg fails the
//! debit leg is rolled back, so a failed transfer leaves no movement on either
//! side.

use miplata_common::{Result, Timestamp};
use rust_decimal::Decimal;
use tracing::warn;

use crate::account::{Account, AccountOperations};

/// Withdraw from `source` as `"outgoing: ..."` and deposit into `target` as
/// `"incoming: ..."`. Returns the source's new balance.
pub fn withdraw_then_deposit<A: AccountOperations>(
    source: &mut A,
    target: &mut Account,
    amount: Decimal,
    description: &str,
    at: Timestamp,
) -> Result<Decimal> {
    compose(
        source,
        target,
        amount,
        &format!("outgoing: {description}"),
        &format!("incoming: {description}"),
        at,
    )
}

/// Debit `source` with `debit_description`, then credit `target` with
/// `credit_description`.
pub(crate) fn compose<A: AccountOperations>(
    source: &mut A,
    target: &mut Account,
    amount: Decimal,
    debit_description: &str,
    credit_description: &str,
    at: Timestamp,
) -> Result<Decimal> {
    let savepoint = source.savepoint();
    let source_balance = source.withdraw(amount, debit_description, at)?;

    if let Err(e) = target.deposit(amount, credit_description, at) {
        warn!(
            source = %source.core().id,
            target = %target.id(),
            amount = %amount,
            error = %e,
            "Credit leg rejected, rolling back debit"
        );
        source.rollback(savepoint);
        return Err(e);
    }

    Ok(source_balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use miplata_common::{AccountId, ClientId};
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    use crate::movement::MovementKind;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 5, 2, 12, 0, 0).unwrap()
    }

    fn savings(id: u64, balance: Decimal) -> Account {
        let mut account = Account::savings(
            AccountId::new(id),
            format!("AH{id:06}"),
            ClientId::new(1),
            now(),
        );
        if balance > Decimal::ZERO {
            assert_ok!(account.deposit(balance, "seed", now()));
        }
        account
    }

    #[test]
    fn test_savings_to_checking() {
        let mut source = savings(1, dec!(1000));
        let mut target = Account::checking(AccountId::new(2), "CC000002", ClientId::new(1), now());

        let balance = assert_ok!(source.transfer(&mut target, dec!(400), "rent", now()));
        assert_eq!(balance, dec!(600));
        assert_eq!(target.balance(), dec!(400));

        let outgoing = source.movements().last().unwrap();
        assert_eq!(outgoing.kind, MovementKind::Withdrawal);
        assert_eq!(outgoing.description, "outgoing: rent");

        let incoming = target.movements().last().unwrap();
        assert_eq!(incoming.kind, MovementKind::Deposit);
        assert_eq!(incoming.description, "incoming: rent");
    }

    #[test]
    fn test_transfer_into_card_is_a_payment() {
        let mut source = savings(1, dec!(1000));
        let mut card = assert_ok!(Account::credit_card(
            AccountId::new(3),
            "TC000003",
            ClientId::new(1),
            dec!(5000),
            now(),
        ));
        assert_ok!(card.withdraw(dec!(300), "shoes", now()));

        assert_ok!(source.transfer(&mut card, dec!(300), "card bill", now()));
        assert_eq!(card.balance(), Decimal::ZERO);
        assert_eq!(
            card.movements().last().map(|m| m.kind),
            Some(MovementKind::Payment)
        );
    }

    #[test]
    fn test_failed_debit_leaves_both_sides_untouched() {
        let mut source = savings(1, dec!(100));
        let mut target = savings(2, Decimal::ZERO);
        let before = (source.clone(), target.clone());

        assert_err!(source.transfer(&mut target, dec!(100.01), "too much", now()));
        assert_eq!((source, target), before);
    }
}
