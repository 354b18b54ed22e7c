//! Metrics collection for the banking service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Service metrics.
#[derive(Debug)]
pub struct Metrics {
    /// Total operations attempted.
    pub operations_total: AtomicU64,
    /// Operations that committed.
    pub operations_success: AtomicU64,
    /// Operations refused by a business rule.
    pub operations_rejected: AtomicU64,
    /// Operations that hit an internal failure.
    pub operations_failed: AtomicU64,
    /// Operations in progress.
    pub operations_active: AtomicU64,
    /// Savepoint rollbacks after a failed commit.
    pub rollbacks: AtomicU64,
    /// Movements committed to the store.
    pub movements_committed: AtomicU64,
    /// Total account locks acquired.
    pub locks_acquired: AtomicU64,
    /// Account locks currently held.
    pub locks_active: AtomicU64,
    /// Accounts opened.
    pub accounts_opened: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            operations_total: AtomicU64::new(0),
            operations_success: AtomicU64::new(0),
            operations_rejected: AtomicU64::new(0),
            operations_failed: AtomicU64::new(0),
            operations_active: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            movements_committed: AtomicU64::new(0),
            locks_acquired: AtomicU64::new(0),
            locks_active: AtomicU64::new(0),
            accounts_opened: AtomicU64::new(0),
        }
    }

    /// Increment operation started.
    pub fn operation_started(&self) {
        self.operations_total.fetch_add(1, Ordering::Relaxed);
        self.operations_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record operation success.
    pub fn operation_success(&self) {
        self.operations_success.fetch_add(1, Ordering::Relaxed);
        self.operations_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Add committed movements.
    pub fn movements_committed(&self, count: usize) {
        self.movements_committed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record operation rejection.
    pub fn operation_rejected(&self) {
        self.operations_rejected.fetch_add(1, Ordering::Relaxed);
        self.operations_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record operation failure.
    pub fn operation_failed(&self) {
        self.operations_failed.fetch_add(1, Ordering::Relaxed);
        self.operations_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a rollback.
    pub fn rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment lock acquired.
    pub fn lock_acquired(&self) {
        self.locks_acquired.fetch_add(1, Ordering::Relaxed);
        self.locks_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record lock released.
    pub fn lock_released(&self) {
        self.locks_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Increment accounts opened.
    pub fn account_opened(&self) {
        self.accounts_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations_total: self.operations_total.load(Ordering::Relaxed),
            operations_success: self.operations_success.load(Ordering::Relaxed),
            operations_rejected: self.operations_rejected.load(Ordering::Relaxed),
            operations_failed: self.operations_failed.load(Ordering::Relaxed),
            operations_active: self.operations_active.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            movements_committed: self.movements_committed.load(Ordering::Relaxed),
            locks_acquired: self.locks_acquired.load(Ordering::Relaxed),
            locks_active: self.locks_active.load(Ordering::Relaxed),
            accounts_opened: self.accounts_opened.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let series: [(&str, &str, &str, u64); 10] = [
            ("operations_total", "counter", "Total operations attempted", snapshot.operations_total),
            ("operations_success", "counter", "Operations committed", snapshot.operations_success),
            ("operations_rejected", "counter", "Operations refused by a business rule", snapshot.operations_rejected),
            ("operations_failed", "counter", "Operations that failed internally", snapshot.operations_failed),
            ("operations_active", "gauge", "Operations in progress", snapshot.operations_active),
            ("rollbacks", "counter", "Savepoint rollbacks", snapshot.rollbacks),
            ("movements_committed", "counter", "Movements committed to the store", snapshot.movements_committed),
            ("locks_acquired", "counter", "Account locks acquired", snapshot.locks_acquired),
            ("locks_active", "gauge", "Account locks currently held", snapshot.locks_active),
            ("accounts_opened", "counter", "Accounts opened", snapshot.accounts_opened),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP miplata_{name} {help}\n# TYPE miplata_{name} {kind}\nmiplata_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub operations_total: u64,
    pub operations_success: u64,
    pub operations_rejected: u64,
    pub operations_failed: u64,
    pub operations_active: u64,
    pub rollbacks: u64,
    pub movements_committed: u64,
    pub locks_acquired: u64,
    pub locks_active: u64,
    pub accounts_opened: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
