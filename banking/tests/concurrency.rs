//! Concurrent access tests for the banking service.
//!
//! These run many tasks against the same accounts and check that balances
//! never drift, limits are never exceeded and lock ordering never deadlocks.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use miplata_banking::{BankConfig, BankService};
use miplata_common::{BankError, ClientId};

fn service() -> Arc<BankService> {
    Arc::new(BankService::new(BankConfig::default()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_never_overdraw_savings() {
    let service = service();
    let set = service.open_product_set(ClientId::new(1)).unwrap();
    service.deposit(set.savings, dec!(1000), "seed").await.unwrap();

    let tasks = 50;
    let barrier = Arc::new(Barrier::new(tasks));
    let mut handles = Vec::with_capacity(tasks);
    for _ in 0..tasks {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.withdraw(set.savings, dec!(30), "atm").await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert_eq!(e.error_code(), "INSUFFICIENT_FUNDS"),
        }
    }

    // 1000 / 30 = 33 withdrawals fit, leaving 10.
    assert_eq!(succeeded, 33);
    let summary = service.balance(set.savings).await.unwrap();
    assert_eq!(summary.balance, dec!(10));
    service.reconcile(set.savings).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_card_purchases_respect_the_limit() {
    let service = service();
    let set = service.open_product_set(ClientId::new(1)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..40 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .purchase_installments(set.credit_card, dec!(100000), 1, "gadget")
                .await
        }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let card = service.registry().get(set.credit_card).await.unwrap();
    let card = card.as_credit_card().unwrap();
    assert_eq!(card.debt(), dec!(1000000));
    assert_eq!(card.available_credit(), Decimal::ZERO);
    service.reconcile(set.credit_card).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_direction_transfers_complete() {
    let service = service();
    let set = service.open_product_set(ClientId::new(1)).unwrap();
    service.deposit(set.savings, dec!(100000), "seed").await.unwrap();
    service.deposit(set.checking, dec!(100000), "seed").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..100 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.transfer(set.savings, "CC000002", dec!(10), "ping").await
            } else {
                service.transfer(set.checking, "AH000001", dec!(10), "pong").await
            }
        }));
    }

    let all = async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("transfers deadlocked");

    let savings = service.balance(set.savings).await.unwrap().balance;
    let checking = service.balance(set.checking).await.unwrap().balance;
    assert_eq!(savings + checking, dec!(200000));
    assert_eq!(savings, dec!(100000));
    service.reconcile(set.savings).await.unwrap();
    service.reconcile(set.checking).await.unwrap();

    let snapshot = service.metrics().snapshot();
    assert_eq!(snapshot.locks_active, 0);
    assert_eq!(snapshot.operations_active, 0);
}

#[tokio::test]
async fn transfer_to_unknown_account_changes_nothing() {
    let service = service();
    let set = service.open_product_set(ClientId::new(1)).unwrap();
    service.deposit(set.savings, dec!(500), "seed").await.unwrap();

    let err = service
        .transfer(set.savings, "CC999999", dec!(100), "lost")
        .await
        .unwrap_err();
    assert_eq!(err, BankError::AccountNotFound("CC999999".to_string()));

    assert_eq!(service.balance(set.savings).await.unwrap().balance, dec!(500));
    assert_eq!(service.statement(set.savings).await.unwrap().len(), 1);
}

#[tokio::test]
async fn client_summary_after_activity() {
    let service = service();
    let set = service.open_product_set(ClientId::new(3)).unwrap();
    service.deposit(set.savings, dec!(1000), "seed").await.unwrap();
    service.transfer(set.savings, "CC000002", dec!(400), "move").await.unwrap();
    service
        .purchase_installments(set.credit_card, dec!(300), 2, "shoes")
        .await
        .unwrap();

    let summary = service.client_summary(ClientId::new(3)).await.unwrap();
    assert_eq!(summary.account_count, 3);
    assert_eq!(summary.movement_count, 4);
    // 600 + 400 - 300
    assert_eq!(summary.total_balance, dec!(700));
}
