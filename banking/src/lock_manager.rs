//! Per-account exclusive locking.
//!
//! Every account lives behind its own `tokio::sync::Mutex`. Operations that
//! touch two accounts always lock the lower `AccountId` first, so two
//! opposite-direction transfers can never wait on each other.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use miplata_common::{AccountId, BankError, Result};
use miplata_ledger::Account;

use crate::metrics::SharedMetrics;

/// Shared, lockable account.
pub type AccountHandle = Arc<Mutex<Account>>;

/// Exclusive access to one account, released on drop.
#[derive(Debug)]
pub struct AccountGuard {
    id: AccountId,
    guard: OwnedMutexGuard<Account>,
    metrics: SharedMetrics,
}

impl AccountGuard {
    /// Locked account's id.
    pub fn id(&self) -> AccountId {
        self.id
    }
}

impl Deref for AccountGuard {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.guard
    }
}

impl DerefMut for AccountGuard {
    fn deref_mut(&mut self) -> &mut Account {
        &mut self.guard
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        self.metrics.lock_released();
        trace!(account = %self.id, "Account lock released");
    }
}

/// Hands out account locks in a deadlock-free order.
pub struct LockManager {
    metrics: SharedMetrics,
}

impl LockManager {
    /// Create a new lock manager.
    pub fn new(metrics: SharedMetrics) -> Self {
        Self { metrics }
    }

    /// Lock a single account.
    pub async fn lock(&self, id: AccountId, handle: AccountHandle) -> AccountGuard {
        let guard = handle.lock_owned().await;
        self.metrics.lock_acquired();
        trace!(account = %id, "Account lock acquired");
        AccountGuard {
            id,
            guard,
            metrics: self.metrics.clone(),
        }
    }

    /// Lock two distinct accounts in ascending id order.
    ///
    /// Guards are returned in argument order. Locking the same account twice
    /// would wait forever, so it is refused with `SameAccountTransfer`.
    pub async fn lock_pair(
        &self,
        first: (AccountId, AccountHandle),
        second: (AccountId, AccountHandle),
    ) -> Result<(AccountGuard, AccountGuard)> {
        let (first_id, first_handle) = first;
        let (second_id, second_handle) = second;

        if first_id == second_id {
            return Err(BankError::SameAccountTransfer(first_id));
        }

        if first_id < second_id {
            let a = self.lock(first_id, first_handle).await;
            let b = self.lock(second_id, second_handle).await;
            Ok((a, b))
        } else {
            let b = self.lock(second_id, second_handle).await;
            let a = self.lock(first_id, first_handle).await;
            Ok((a, b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use miplata_common::ClientId;
    use std::time::Duration;

    use crate::metrics::Metrics;

    fn handle(id: u64) -> (AccountId, AccountHandle) {
        let id = AccountId::new(id);
        let account = Account::savings(id, format!("AH{:06}", id.value()), ClientId::new(1), Utc::now());
        (id, Arc::new(Mutex::new(account)))
    }

    #[tokio::test]
    async fn test_guard_release_updates_metrics() {
        let metrics: SharedMetrics = Arc::new(Metrics::new());
        let manager = LockManager::new(metrics.clone());
        let (id, account) = handle(1);

        let guard = manager.lock(id, account.clone()).await;
        assert_eq!(guard.id(), id);
        assert_eq!(metrics.snapshot().locks_active, 1);
        assert!(account.try_lock().is_err());

        drop(guard);
        assert_eq!(metrics.snapshot().locks_active, 0);
        assert!(account.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_pair_keeps_argument_order() {
        let manager = LockManager::new(Arc::new(Metrics::new()));
        let (a, b) = manager.lock_pair(handle(9), handle(2)).await.unwrap();
        assert_eq!(a.id(), AccountId::new(9));
        assert_eq!(b.id(), AccountId::new(2));
    }

    #[tokio::test]
    async fn test_same_account_pair_is_refused() {
        let manager = LockManager::new(Arc::new(Metrics::new()));
        let (id, account) = handle(4);
        let err = manager
            .lock_pair((id, account.clone()), (id, account))
            .await
            .unwrap_err();
        assert_eq!(err, BankError::SameAccountTransfer(id));
    }

    #[tokio::test]
    async fn test_opposite_order_pairs_do_not_deadlock() {
        let manager = Arc::new(LockManager::new(Arc::new(Metrics::new())));
        let left = handle(1);
        let right = handle(2);

        let mut tasks = Vec::new();
        for i in 0..50 {
            let manager = manager.clone();
            let (l, r) = (left.clone(), right.clone());
            tasks.push(tokio::spawn(async move {
                let pair = if i % 2 == 0 {
                    manager.lock_pair(l, r).await
                } else {
                    manager.lock_pair(r, l).await
                };
                let _guards = pair.unwrap();
                tokio::task::yield_now().await;
            }));
        }

        let all = async {
            for task in tasks {
                task.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock ordering deadlocked");
    }
}
