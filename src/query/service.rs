//! Account queries
//!
//! Read-only access to balances, history and account listings.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, DomainError, MONEY_SCALE};
use crate::error::AppResult;
use crate::store::{Directory, LedgerStore};

use super::views::{AccountView, BalanceView, TransactionView};

/// Read side of the ledger
pub struct AccountQuery {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn Directory>,
}

impl AccountQuery {
    pub fn new(store: Arc<dyn LedgerStore>, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    /// Current balance by account number
    pub async fn balance(&self, number: &AccountNumber) -> AppResult<BalanceView> {
        let account = self.load(number).await?;
        Ok(BalanceView::from(&account))
    }

    /// Ledger entries of one account, most recent first
    pub async fn history(&self, number: &AccountNumber) -> AppResult<Vec<TransactionView>> {
        let account = self.load(number).await?;
        let records = self.store.list_transactions(account.id()).await?;
        Ok(records.iter().map(TransactionView::from).collect())
    }

    /// Every account, oldest first
    pub async fn list_accounts(&self) -> AppResult<Vec<AccountView>> {
        let accounts = self.store.list_accounts().await?;
        self.to_views(&accounts).await
    }

    /// Accounts owned by one user, oldest first
    pub async fn accounts_for_user(&self, user_id: Uuid) -> AppResult<Vec<AccountView>> {
        let accounts = self.store.list_accounts_by_owner(user_id).await?;
        self.to_views(&accounts).await
    }

    /// Render one account with its bank resolved
    pub async fn account_view(&self, account: &Account) -> AppResult<AccountView> {
        let bank_name = match account.bank_id() {
            Some(bank_id) => self.directory.find_bank(bank_id).await?.map(|bank| bank.name),
            None => None,
        };
        Ok(AccountView::new(account, bank_name))
    }

    /// Ledger entries of every account, most recent first
    pub async fn all_transactions(&self) -> AppResult<Vec<TransactionView>> {
        let records = self.store.list_all_transactions().await?;
        Ok(records.iter().map(TransactionView::from).collect())
    }

    /// Sum of balances over active accounts
    pub async fn total_active_balance(&self) -> AppResult<Decimal> {
        let mut total = self.store.sum_active_balances().await?;
        total.rescale(MONEY_SCALE);
        Ok(total)
    }

    async fn load(&self, number: &AccountNumber) -> AppResult<Account> {
        self.store
            .get_account(number)
            .await?
            .ok_or_else(|| DomainError::account_not_found(number).into())
    }

    /// Resolve each distinct bank once per listing
    async fn to_views(&self, accounts: &[Account]) -> AppResult<Vec<AccountView>> {
        let mut bank_names: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(accounts.len());

        for account in accounts {
            let bank_name = match account.bank_id() {
                Some(bank_id) => match bank_names.get(&bank_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.directory.find_bank(bank_id).await?.map(|bank| bank.name);
                        bank_names.insert(bank_id, name.clone());
                        name
                    }
                },
                None => None,
            };
            views.push(AccountView::new(account, bank_name));
        }

        Ok(views)
    }
}
