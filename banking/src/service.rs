//! Banking service: the public entry point for account operations.
//!
//! Every mutating operation follows the same path: resolve accounts, lock
//! them (ascending id order for pairs), take savepoints, run the account rule,
//! collect the new movements into a `CommitBatch` and hand it to the store.
//! If the store refuses the batch every touched account is rolled back and
//! the caller gets `BankError::Internal`.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use miplata_common::{
    AccountId, AccountKind, BankError, ClientId, Clock, Rate, Result, SystemClock, Timestamp,
};
use miplata_ledger::{
    Account, AccountOperations, BalanceSummary, CommitBatch, InstallmentQuote, Movement, Savepoint,
};

use crate::config::BankConfig;
use crate::lock_manager::{AccountGuard, LockManager};
use crate::metrics::{Metrics, SharedMetrics};
use crate::registry::{AccountRegistry, ClientSummary, ProductSet};
use crate::store::{InMemoryLedgerStore, LedgerStore};

/// Outcome of an installment purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallmentReceipt {
    pub account_id: AccountId,
    pub principal: Decimal,
    pub installments: u32,
    pub monthly_rate: Rate,
    pub total: Decimal,
    pub monthly_payment: Decimal,
    pub balance: Decimal,
    pub available_credit: Decimal,
}

/// Outcome of a cash advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashAdvanceReceipt {
    pub card_id: AccountId,
    pub destination_id: AccountId,
    pub amount: Decimal,
    pub card_balance: Decimal,
    pub available_credit: Decimal,
    pub destination_balance: Decimal,
}

/// The banking service.
pub struct BankService {
    config: BankConfig,
    registry: Arc<AccountRegistry>,
    locks: LockManager,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    metrics: SharedMetrics,
}

impl BankService {
    /// Create a service with the in-memory store and the system clock.
    pub fn new(config: BankConfig) -> Self {
        Self::with_parts(config, Arc::new(InMemoryLedgerStore::new()), Arc::new(SystemClock))
    }

    /// Create a service with an explicit store and clock.
    pub fn with_parts(
        config: BankConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics: SharedMetrics = Arc::new(Metrics::new());
        let registry = Arc::new(AccountRegistry::new(
            config.products.clone(),
            clock.clone(),
            metrics.clone(),
        ));

        Self {
            config,
            registry,
            locks: LockManager::new(metrics.clone()),
            store,
            clock,
            metrics,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    /// Account registry.
    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Service metrics.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Open savings, checking and credit card accounts for a client.
    #[instrument(skip(self))]
    pub fn open_product_set(&self, client_id: ClientId) -> Result<ProductSet> {
        self.registry.open_product_set(client_id)
    }

    /// Open a single account.
    #[instrument(skip(self))]
    pub fn open_account(&self, kind: AccountKind, client_id: ClientId) -> Result<AccountId> {
        self.registry.open_account(kind, client_id)
    }

    /// Credit an account. Returns the new balance.
    #[instrument(skip(self, description))]
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal> {
        self.track(self.run_single("deposit", account_id, |account, at| {
            account.deposit(amount, description, at)
        }))
        .await
    }

    /// Debit an account. Returns the new balance.
    #[instrument(skip(self, description))]
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal> {
        self.track(self.run_single("withdraw", account_id, |account, at| {
            account.withdraw(amount, description, at)
        }))
        .await
    }

    /// Move money from `source_id` to the account numbered
    /// `destination_number`. Returns the source's new balance.
    #[instrument(skip(self, description))]
    pub async fn transfer(
        &self,
        source_id: AccountId,
        destination_number: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal> {
        self.track(async {
            let (mut source, mut destination) =
                self.lock_pair(source_id, destination_number).await?;
            let savepoints = (source.savepoint(), destination.savepoint());
            let at = self.clock.now();

            let result = source.transfer(&mut *destination, amount, description, at);
            let balance = self.settle(
                "transfer",
                result,
                &mut [(&mut source, savepoints.0), (&mut destination, savepoints.1)],
            )?;

            info!(
                source = %source_id,
                destination = %destination.id(),
                amount = %amount,
                "Transfer completed"
            );
            Ok(balance)
        })
        .await
    }

    /// Finance a purchase on a credit card.
    #[instrument(skip(self, description))]
    pub async fn purchase_installments(
        &self,
        account_id: AccountId,
        principal: Decimal,
        installments: u32,
        description: &str,
    ) -> Result<InstallmentReceipt> {
        self.track(self.run_single("purchase_installments", account_id, |account, at| {
            let card = account.credit_card_mut()?;
            let quote = card.purchase_installments(principal, installments, description, at)?;
            Ok(InstallmentReceipt {
                account_id,
                principal: quote.principal,
                installments: quote.installments,
                monthly_rate: quote.rate,
                total: quote.total,
                monthly_payment: quote.monthly_payment,
                balance: card.core().balance(),
                available_credit: card.available_credit(),
            })
        }))
        .await
    }

    /// Take a cash advance on a card into the account numbered
    /// `destination_number`.
    #[instrument(skip(self, description))]
    pub async fn cash_advance(
        &self,
        card_id: AccountId,
        destination_number: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<CashAdvanceReceipt> {
        self.track(async {
            let (mut card_account, mut destination) =
                self.lock_pair(card_id, destination_number).await?;
            let savepoints = (card_account.savepoint(), destination.savepoint());
            let at = self.clock.now();

            let result = card_account.credit_card_mut().and_then(|card| {
                card.cash_advance(&mut *destination, amount, description, at)?;
                Ok(CashAdvanceReceipt {
                    card_id,
                    destination_id: destination.id(),
                    amount,
                    card_balance: card.core().balance(),
                    available_credit: card.available_credit(),
                    destination_balance: destination.balance(),
                })
            });

            self.settle(
                "cash_advance",
                result,
                &mut [
                    (&mut card_account, savepoints.0),
                    (&mut destination, savepoints.1),
                ],
            )
        })
        .await
    }

    /// Price an installment plan for a card without buying anything.
    #[instrument(skip(self))]
    pub async fn quote_installments(
        &self,
        account_id: AccountId,
        principal: Decimal,
        installments: u32,
    ) -> Result<InstallmentQuote> {
        let account = self.lock(account_id).await?;
        account
            .as_credit_card()
            .ok_or(BankError::AccountNotCreditCard(account_id))?
            .quote_installments(principal, installments)
    }

    /// Product-specific balance view.
    #[instrument(skip(self))]
    pub async fn balance(&self, account_id: AccountId) -> Result<BalanceSummary> {
        Ok(self.lock(account_id).await?.summary())
    }

    /// Movements of an account in chronological order.
    #[instrument(skip(self))]
    pub async fn statement(&self, account_id: AccountId) -> Result<Vec<Movement>> {
        Ok(self.lock(account_id).await?.movements().to_vec())
    }

    /// Aggregate view of a client's accounts.
    #[instrument(skip(self))]
    pub async fn client_summary(&self, client_id: ClientId) -> Result<ClientSummary> {
        self.registry.client_summary(client_id).await
    }

    /// Audit an account's ledger against its live balance.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, account_id: AccountId) -> Result<()> {
        let account = self.lock(account_id).await?;
        account.reconcile().map_err(|e| {
            error!(account = %account_id, error = %e, "Ledger does not reconcile");
            BankError::Internal(e.to_string())
        })
    }

    async fn lock(&self, account_id: AccountId) -> Result<AccountGuard> {
        let handle = self.registry.handle(account_id)?;
        Ok(self.locks.lock(account_id, handle).await)
    }

    /// Resolve both sides before locking anything, then lock them in order.
    async fn lock_pair(
        &self,
        source_id: AccountId,
        destination_number: &str,
    ) -> Result<(AccountGuard, AccountGuard)> {
        let source = self.registry.handle(source_id)?;
        let (destination_id, destination) = self.registry.resolve_number(destination_number)?;
        if source_id == destination_id {
            return Err(BankError::SameAccountTransfer(source_id));
        }
        self.locks
            .lock_pair((source_id, source), (destination_id, destination))
            .await
    }

    async fn run_single<T, F>(&self, operation: &'static str, account_id: AccountId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Account, Timestamp) -> Result<T>,
    {
        let mut account = self.lock(account_id).await?;
        let savepoint = account.savepoint();
        let at = self.clock.now();
        let result = f(&mut *account, at);
        self.settle(operation, result, &mut [(&mut account, savepoint)])
    }

    /// Commit what the touched accounts did, or undo it.
    fn settle<T>(
        &self,
        operation: &'static str,
        result: Result<T>,
        touched: &mut [(&mut AccountGuard, Savepoint)],
    ) -> Result<T> {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                for (account, savepoint) in touched.iter_mut() {
                    account.rollback(*savepoint);
                }
                return Err(e);
            }
        };

        let mut batch = CommitBatch::new(operation);
        for (account, savepoint) in touched.iter() {
            batch.add(&***account, savepoint);
        }
        if batch.is_empty() {
            return Ok(value);
        }
        let movements = batch.movement_count();

        if let Err(e) = self.store.commit(&batch) {
            error!(
                operation,
                batch_id = %batch.id,
                error = %e,
                "Commit failed, rolling back"
            );
            for (account, savepoint) in touched.iter_mut() {
                account.rollback(*savepoint);
            }
            self.metrics.rollback();
            return Err(BankError::Internal(e.to_string()));
        }

        debug!(operation, movements, "Operation committed");
        self.metrics.movements_committed(movements);
        Ok(value)
    }

    /// Count the operation and classify its outcome.
    async fn track<T>(&self, operation: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        self.metrics.operation_started();
        let result = operation.await;
        match &result {
            Ok(_) => self.metrics.operation_success(),
            Err(e) if e.is_business_rule() => {
                debug!(code = e.error_code(), error = %e, "Operation rejected");
                self.metrics.operation_rejected();
            }
            Err(e) => {
                warn!(code = e.error_code(), "Operation failed");
                self.metrics.operation_failed();
            }
        }
        result
    }
}
