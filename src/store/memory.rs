use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, TransactionRecord};

use super::{check_version, BankRef, Directory, LedgerStore, StoreError, UserRef};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    numbers: HashMap<AccountNumber, Uuid>,
    /// Append order doubles as commit order
    transactions: Vec<TransactionRecord>,
    users: HashMap<Uuid, UserRef>,
    banks: HashMap<Uuid, BankRef>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev and the load-test binary. Each trait method runs as
/// one critical section under the state lock, which makes the combined
/// account + record write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user the ledger can resolve
    pub fn insert_user(&self, user_id: Uuid, display_name: impl Into<String>) -> Result<UserRef, StoreError> {
        let user = UserRef {
            id: user_id,
            display_name: display_name.into(),
        };
        self.write()?.users.insert(user_id, user.clone());
        Ok(user)
    }

    /// Register a bank the ledger can resolve
    pub fn insert_bank(&self, bank_id: Uuid, name: impl Into<String>) -> Result<BankRef, StoreError> {
        let bank = BankRef {
            id: bank_id,
            name: name.into(),
        };
        self.write()?.banks.insert(bank_id, bank.clone());
        Ok(bank)
    }

    /// Drop a bank, leaving any account references dangling
    pub fn remove_bank(&self, bank_id: Uuid) -> Result<(), StoreError> {
        self.write()?.banks.remove(&bank_id);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl State {
    fn stored_version(&self, account: &Account) -> Result<i64, StoreError> {
        self.accounts
            .get(&account.id())
            .map(Account::version)
            .ok_or(StoreError::AccountNotFound(account.id()))
    }

    /// Most recent first; equal timestamps fall back to commit order.
    fn newest_first<'a>(
        records: impl DoubleEndedIterator<Item = &'a TransactionRecord>,
    ) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = records.rev().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let state = self.read()?;
        Ok(state
            .numbers
            .get(number)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.read()?.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        Ok(accounts)
    }

    async fn list_accounts_by_owner(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .read()?
            .accounts
            .values()
            .filter(|account| account.user_id() == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        Ok(accounts)
    }

    async fn exists_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        Ok(self.read()?.numbers.contains_key(number))
    }

    async fn insert_account_with_transaction(
        &self,
        account: &Account,
        opening: Option<&TransactionRecord>,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;

        if state.numbers.contains_key(account.number()) {
            return Err(StoreError::DuplicateAccountNumber(account.number().to_string()));
        }
        if state.accounts.contains_key(&account.id()) {
            return Err(StoreError::Corrupted(format!(
                "account id {} already exists",
                account.id()
            )));
        }

        state.numbers.insert(account.number().clone(), account.id());
        state.accounts.insert(account.id(), account.clone());
        if let Some(record) = opening {
            state.transactions.push(record.clone());
        }
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored_version = state.stored_version(account)?;
        check_version(account, stored_version)?;

        state.accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn save_account_and_append_transaction(
        &self,
        account: &Account,
        record: &TransactionRecord,
    ) -> Result<TransactionRecord, StoreError> {
        let mut state = self.write()?;
        let stored_version = state.stored_version(account)?;
        check_version(account, stored_version)?;

        state.accounts.insert(account.id(), account.clone());
        state.transactions.push(record.clone());
        Ok(record.clone())
    }

    async fn list_transactions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.read()?;
        Ok(State::newest_first(
            state
                .transactions
                .iter()
                .filter(|record| record.account_id == account_id),
        ))
    }

    async fn list_all_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.read()?;
        Ok(State::newest_first(state.transactions.iter()))
    }

    async fn sum_active_balances(&self) -> Result<Decimal, StoreError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .filter(|account| account.is_active())
            .map(|account| account.balance().value())
            .sum())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, StoreError> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn find_bank(&self, bank_id: Uuid) -> Result<Option<BankRef>, StoreError> {
        Ok(self.read()?.banks.get(&bank_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountKind, Profile};
    use rust_decimal_macros::dec;

    fn account(index: u64) -> Account {
        Account::open(
            AccountNumber::from_index(index).unwrap(),
            Uuid::new_v4(),
            None,
            Profile::new("Test"),
            AccountKind::Savings,
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryStore::new();
        let account = account(1);
        store.insert_account(&account).await.unwrap();

        let by_number = store.get_account(account.number()).await.unwrap().unwrap();
        let by_id = store.get_account_by_id(account.id()).await.unwrap().unwrap();
        assert_eq!(by_number, account);
        assert_eq!(by_id, account);
        assert!(store.exists_account_number(account.number()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let store = MemoryStore::new();
        store.insert_account(&account(5)).await.unwrap();

        let result = store.insert_account(&account(5)).await;
        assert!(matches!(result, Err(StoreError::DuplicateAccountNumber(n)) if n == "0000000005"));
    }

    #[tokio::test]
    async fn test_insert_with_opening_record() {
        let store = MemoryStore::new();
        let (funded, record) = account(3).deposit(dec!(500), None, None).unwrap();

        store
            .insert_account_with_transaction(&funded, Some(&record))
            .await
            .unwrap();

        let stored = store.get_account(funded.number()).await.unwrap().unwrap();
        assert_eq!(stored.balance().value(), dec!(500.00));
        assert_eq!(store.list_transactions(funded.id()).await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_duplicate_number_writes_no_opening_record() {
        let store = MemoryStore::new();
        store.insert_account(&account(5)).await.unwrap();

        let (funded, record) = account(5).deposit(dec!(20), None, None).unwrap();
        let result = store
            .insert_account_with_transaction(&funded, Some(&record))
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateAccountNumber(_))));
        assert!(store.get_account_by_id(funded.id()).await.unwrap().is_none());
        assert!(store.list_all_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_version_rejected_atomically() {
        let store = MemoryStore::new();
        let opened = account(9);
        store.insert_account(&opened).await.unwrap();

        let (first, first_record) = opened.deposit(dec!(10), None, None).unwrap();
        let (stale, stale_record) = opened.deposit(dec!(20), None, None).unwrap();

        store
            .save_account_and_append_transaction(&first, &first_record)
            .await
            .unwrap();
        let result = store
            .save_account_and_append_transaction(&stale, &stale_record)
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { expected: 1, actual: 2, .. })
        ));
        // neither half of the stale write landed
        let stored = store.get_account_by_id(opened.id()).await.unwrap().unwrap();
        assert_eq!(stored.balance().value(), dec!(10.00));
        assert_eq!(store.list_transactions(opened.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let store = MemoryStore::new();
        let mut current = account(3);
        store.insert_account(&current).await.unwrap();

        for amount in [dec!(1), dec!(2), dec!(3)] {
            let (next, record) = current.deposit(amount, None, None).unwrap();
            store
                .save_account_and_append_transaction(&next, &record)
                .await
                .unwrap();
            current = next;
        }

        let history = store.list_transactions(current.id()).await.unwrap();
        let amounts: Vec<_> = history.iter().map(|r| r.amount.value()).collect();
        assert_eq!(amounts, vec![dec!(3.00), dec!(2.00), dec!(1.00)]);
    }

    #[tokio::test]
    async fn test_directory_lookups() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let bank_id = Uuid::new_v4();
        store.insert_user(user_id, "Grace").unwrap();
        store.insert_bank(bank_id, "First Savings").unwrap();

        assert_eq!(store.find_user(user_id).await.unwrap().unwrap().display_name, "Grace");
        assert_eq!(store.find_bank(bank_id).await.unwrap().unwrap().name, "First Savings");
        assert!(store.find_user(Uuid::new_v4()).await.unwrap().is_none());

        store.remove_bank(bank_id).unwrap();
        assert!(store.find_bank(bank_id).await.unwrap().is_none());
    }
}
