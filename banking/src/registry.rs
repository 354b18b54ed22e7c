//! Account registry: ownership of every account and the lookup indices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use miplata_common::{AccountId, AccountKind, BankError, ClientId, Clock, Result};
use miplata_ledger::{Account, BalanceSummary};

use crate::config::ProductConfig;
use crate::lock_manager::AccountHandle;
use crate::metrics::SharedMetrics;

/// The three accounts every new client receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductSet {
    pub savings: AccountId,
    pub checking: AccountId,
    pub credit_card: AccountId,
}

/// Aggregate view of a client's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client_id: ClientId,
    pub account_count: usize,
    pub total_balance: Decimal,
    pub movement_count: usize,
    pub accounts: Vec<BalanceSummary>,
}

/// Owns every account.
///
/// Ids and numbers come from one shared sequence, so `AH000001`,
/// `CC000002` and `TC000003` belong to ids 1, 2 and 3.
pub struct AccountRegistry {
    accounts: DashMap<AccountId, AccountHandle>,
    by_number: DashMap<String, AccountId>,
    by_client: DashMap<ClientId, Vec<AccountId>>,
    next_sequence: AtomicU64,
    products: ProductConfig,
    clock: Arc<dyn Clock>,
    metrics: SharedMetrics,
}

impl AccountRegistry {
    /// Create an empty registry.
    pub fn new(products: ProductConfig, clock: Arc<dyn Clock>, metrics: SharedMetrics) -> Self {
        Self {
            accounts: DashMap::new(),
            by_number: DashMap::new(),
            by_client: DashMap::new(),
            next_sequence: AtomicU64::new(products.first_account_sequence),
            products,
            clock,
            metrics,
        }
    }

    /// Open one account of `kind`. Credit cards get the configured default
    /// limit.
    pub fn open_account(&self, kind: AccountKind, client_id: ClientId) -> Result<AccountId> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let id = AccountId::new(sequence);
        let number = kind.account_number(sequence);
        let opened_at = self.clock.now();

        let account = match kind {
            AccountKind::Savings => Account::savings(id, number.clone(), client_id, opened_at),
            AccountKind::Checking => Account::checking(id, number.clone(), client_id, opened_at),
            AccountKind::CreditCard => Account::credit_card(
                id,
                number.clone(),
                client_id,
                self.products.default_credit_limit,
                opened_at,
            )?,
        };

        self.accounts.insert(id, Arc::new(Mutex::new(account)));
        self.by_number.insert(number.clone(), id);
        self.by_client.entry(client_id).or_default().push(id);
        self.metrics.account_opened();

        info!(
            account_id = %id,
            number = %number,
            client_id = %client_id,
            kind = ?kind,
            "Account opened"
        );

        Ok(id)
    }

    /// Open savings, checking and credit card accounts for a new client.
    pub fn open_product_set(&self, client_id: ClientId) -> Result<ProductSet> {
        Ok(ProductSet {
            savings: self.open_account(AccountKind::Savings, client_id)?,
            checking: self.open_account(AccountKind::Checking, client_id)?,
            credit_card: self.open_account(AccountKind::CreditCard, client_id)?,
        })
    }

    /// Lockable handle for an account id.
    pub fn handle(&self, id: AccountId) -> Result<AccountHandle> {
        self.accounts
            .get(&id)
            .map(|h| h.value().clone())
            .ok_or_else(|| BankError::AccountNotFound(id.to_string()))
    }

    /// Resolve an account number to its id and handle.
    pub fn resolve_number(&self, number: &str) -> Result<(AccountId, AccountHandle)> {
        let id = self
            .by_number
            .get(number.trim())
            .map(|id| *id.value())
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))?;
        Ok((id, self.handle(id)?))
    }

    /// Snapshot of an account by id.
    pub async fn get(&self, id: AccountId) -> Result<Account> {
        let handle = self.handle(id)?;
        let account = handle.lock().await;
        Ok(account.clone())
    }

    /// Snapshot of an account by number.
    pub async fn find_by_number(&self, number: &str) -> Result<Account> {
        let (_, handle) = self.resolve_number(number)?;
        let account = handle.lock().await;
        Ok(account.clone())
    }

    /// Accounts whose number contains `fragment`, ignoring case, ordered by id.
    pub async fn search(&self, fragment: &str) -> Vec<Account> {
        let needle = fragment.trim().to_uppercase();
        let mut ids: Vec<AccountId> = self
            .by_number
            .iter()
            .filter(|entry| entry.key().to_uppercase().contains(&needle))
            .map(|entry| *entry.value())
            .collect();
        ids.sort();

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(account) = self.get(id).await {
                found.push(account);
            }
        }
        found
    }

    /// Ids of a client's accounts in opening order.
    pub fn client_accounts(&self, client_id: ClientId) -> Vec<AccountId> {
        self.by_client
            .get(&client_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Summarize a client's accounts.
    pub async fn client_summary(&self, client_id: ClientId) -> Result<ClientSummary> {
        let ids = self.client_accounts(client_id);

        let mut accounts = Vec::with_capacity(ids.len());
        let mut total_balance = Decimal::ZERO;
        let mut movement_count = 0;
        for id in ids {
            let account = self.get(id).await?;
            total_balance = total_balance
                .checked_add(account.balance())
                .ok_or_else(|| {
                    BankError::Internal(format!("balance total for client {client_id} is out of range"))
                })?;
            movement_count += account.movements().len();
            accounts.push(account.summary());
        }

        Ok(ClientSummary {
            client_id,
            account_count: accounts.len(),
            total_balance,
            movement_count,
            accounts,
        })
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if no account has been opened.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
