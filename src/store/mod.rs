//! Ledger store boundary
//!
//! Persistence abstraction for accounts and their transaction records, plus
//! the identity lookups (users, banks) the ledger consults but does not own.
//!
//! ## Versioning
//!
//! Every mutated [`Account`] carries `version = loaded.version + 1`. A store
//! commits a mutation only if the stored version still equals
//! `account.version() - 1`; otherwise it returns
//! [`StoreError::ConcurrencyConflict`] and writes nothing. This is what
//! serializes concurrent read-modify-write cycles on the same account.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, TransactionRecord};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgLedgerStore;

/// Persistence contract consumed by the ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError>;

    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn list_accounts_by_owner(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError>;

    async fn exists_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError>;

    /// Insert a freshly opened account together with its opening record, if
    /// any, as one atomic unit.
    ///
    /// Fails with `DuplicateAccountNumber` if the number is already taken;
    /// neither the account nor the record is written in that case.
    async fn insert_account_with_transaction(
        &self,
        account: &Account,
        opening: Option<&TransactionRecord>,
    ) -> Result<(), StoreError>;

    /// Insert a freshly opened, unfunded account
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.insert_account_with_transaction(account, None).await
    }

    /// Persist a non-balance mutation (profile, PIN, active flag), version-checked.
    async fn update_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Persist the updated account and append its transaction record as one
    /// atomic unit, version-checked. Both become visible together or not at all.
    async fn save_account_and_append_transaction(
        &self,
        account: &Account,
        record: &TransactionRecord,
    ) -> Result<TransactionRecord, StoreError>;

    /// Records of one account, most recent first
    async fn list_transactions(&self, account_id: Uuid)
        -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records of every account, most recent first
    async fn list_all_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Sum of balances over active accounts only
    async fn sum_active_balances(&self) -> Result<Decimal, StoreError>;
}

/// Owner of an account, resolved by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub display_name: String,
}

/// Bank an account may be affiliated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRef {
    pub id: Uuid,
    pub name: String,
}

/// Identity lookups for the weak references held by accounts
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, StoreError>;

    async fn find_bank(&self, bank_id: Uuid) -> Result<Option<BankRef>, StoreError>;
}

/// Compare a loaded version against the one a mutation was computed from
pub(crate) fn check_version(account: &Account, stored_version: i64) -> Result<(), StoreError> {
    let expected = account.version() - 1;
    if stored_version == expected {
        Ok(())
    } else {
        Err(StoreError::ConcurrencyConflict {
            account_id: account.id(),
            expected,
            actual: stored_version,
        })
    }
}
