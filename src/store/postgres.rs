//! PostgreSQL-backed ledger store.
//!
//! ## Error Mapping
//!
//! | Condition | SQLSTATE | StoreError |
//! |-----------|----------|------------|
//! | unique violation on `accounts.account_number` | `23505` | `DuplicateAccountNumber` |
//! | stored version differs from the expected one | n/a | `ConcurrencyConflict` |
//! | row fails domain validation on load | n/a | `Corrupted` |
//! | anything else | any | `Database` |
//!
//! ## Concurrency
//!
//! Every mutation runs in one transaction that takes a `FOR UPDATE` lock on
//! the account row, compares versions, and only then writes. Concurrent
//! writers on the same account are therefore serialized across service
//! instances, and a writer holding a stale version is rejected. Opening an
//! account inserts the row and its opening record in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Account, AccountNumber, Amount, Balance, Profile, TransactionKind, TransactionRecord,
};

use super::{check_version, BankRef, Directory, LedgerStore, StoreError, UserRef};

const ACCOUNT_COLUMNS: &str = r#"
    id, account_number, user_id, bank_id, name, address, phone_number,
    balance, pin_hash, account_type, is_active, version, created_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    t.id, t.account_id, a.account_number, t.transaction_type, t.amount,
    t.balance_after, t.description, t.performed_by, t.created_at
"#;

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    account_number: String,
    user_id: Uuid,
    bank_id: Option<Uuid>,
    name: String,
    address: Option<String>,
    phone_number: Option<String>,
    balance: Decimal,
    pin_hash: Option<String>,
    account_type: String,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let corrupted = |what: String| StoreError::Corrupted(format!("account {}: {what}", row.id));

        Ok(Account {
            id: row.id,
            number: row
                .account_number
                .parse::<AccountNumber>()
                .map_err(|e| corrupted(e.to_string()))?,
            user_id: row.user_id,
            bank_id: row.bank_id,
            profile: Profile {
                name: row.name.clone(),
                address: row.address.clone(),
                phone_number: row.phone_number.clone(),
            },
            balance: Balance::new(row.balance).map_err(|e| corrupted(e.to_string()))?,
            pin_hash: row.pin_hash.clone(),
            kind: row.account_type.parse().map_err(corrupted)?,
            is_active: row.is_active,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    account_number: String,
    transaction_type: String,
    amount: Decimal,
    balance_after: Decimal,
    description: Option<String>,
    performed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let corrupted =
            |what: String| StoreError::Corrupted(format!("transaction {}: {what}", row.id));

        Ok(TransactionRecord {
            id: row.id,
            account_id: row.account_id,
            account_number: row
                .account_number
                .parse::<AccountNumber>()
                .map_err(|e| corrupted(e.to_string()))?,
            kind: row
                .transaction_type
                .parse::<TransactionKind>()
                .map_err(corrupted)?,
            amount: Amount::new(row.amount).map_err(|e| corrupted(e.to_string()))?,
            balance_after: Balance::new(row.balance_after)
                .map_err(|e| corrupted(e.to_string()))?,
            description: row.description.clone(),
            performed_by: row.performed_by,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn into_accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>, StoreError> {
    rows.into_iter().map(Account::try_from).collect()
}

fn into_records(rows: Vec<TransactionRow>) -> Result<Vec<TransactionRecord>, StoreError> {
    rows.into_iter().map(TransactionRecord::try_from).collect()
}

/// Ledger store for PostgreSQL
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the account row and check that the caller computed from its current version
    async fn lock_and_check(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<(), StoreError> {
        let stored_version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(account.id())
                .fetch_optional(&mut **tx)
                .await?;

        let stored_version = stored_version.ok_or(StoreError::AccountNotFound(account.id()))?;
        check_version(account, stored_version)
    }

    async fn write_account(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<(), StoreError> {
        let profile = account.profile();
        sqlx::query(
            r#"
            UPDATE accounts
            SET name = $2, address = $3, phone_number = $4, balance = $5,
                pin_hash = $6, is_active = $7, version = $8
            WHERE id = $1 AND version = $9
            "#,
        )
        .bind(account.id())
        .bind(&profile.name)
        .bind(&profile.address)
        .bind(&profile.phone_number)
        .bind(account.balance().value())
        .bind(account.pin_hash())
        .bind(account.is_active())
        .bind(account.version())
        .bind(account.version() - 1)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn append_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &TransactionRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, account_id, transaction_type, amount, balance_after,
                description, performed_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.account_id)
        .bind(record.kind.as_str())
        .bind(record.amount.value())
        .bind(record.balance_after.value())
        .bind(&record.description)
        .bind(record.performed_by)
        .bind(record.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn fetch_accounts(
        &self,
        filter: &str,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {filter} ORDER BY created_at ASC");
        let rows: Vec<AccountRow> = match user_id {
            Some(user_id) => {
                sqlx::query_as(&sql)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query_as(&sql).fetch_all(&self.pool).await?,
        };
        into_accounts(rows)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(number.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.fetch_accounts("", None).await
    }

    async fn list_accounts_by_owner(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        self.fetch_accounts("WHERE user_id = $1", Some(user_id)).await
    }

    async fn exists_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE account_number = $1)")
                .bind(number.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_account_with_transaction(
        &self,
        account: &Account,
        opening: Option<&TransactionRecord>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let profile = account.profile();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, account_number, user_id, bank_id, name, address, phone_number,
                balance, pin_hash, account_type, is_active, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(account.id())
        .bind(account.number().as_str())
        .bind(account.user_id())
        .bind(account.bank_id())
        .bind(&profile.name)
        .bind(&profile.address)
        .bind(&profile.phone_number)
        .bind(account.balance().value())
        .bind(account.pin_hash())
        .bind(account.kind().as_str())
        .bind(account.is_active())
        .bind(account.version())
        .bind(account.created_at())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::DuplicateAccountNumber(account.number().to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(record) = opening {
            self.append_record(&mut tx, record).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        self.lock_and_check(&mut tx, account).await?;
        self.write_account(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_account_and_append_transaction(
        &self,
        account: &Account,
        record: &TransactionRecord,
    ) -> Result<TransactionRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        self.lock_and_check(&mut tx, account).await?;
        self.write_account(&mut tx, account).await?;

        self.append_record(&mut tx, record).await?;

        // Dropping `tx` on any error above rolls both writes back
        tx.commit().await?;

        tracing::debug!(
            account_number = %account.number(),
            version = account.version(),
            kind = %record.kind,
            "Account mutation committed"
        );

        Ok(record.clone())
    }

    async fn list_transactions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE t.account_id = $1
            ORDER BY t.created_at DESC, t.seq DESC
            "#
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }

    async fn list_all_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            ORDER BY t.created_at DESC, t.seq DESC
            "#
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn sum_active_balances(&self) -> Result<Decimal, StoreError> {
        let total: Option<Decimal> =
            sqlx::query_scalar("SELECT SUM(balance) FROM accounts WHERE is_active = true")
                .fetch_one(&self.pool)
                .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl Directory for PgLedgerStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRef>, StoreError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, display_name FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, display_name)| UserRef { id, display_name }))
    }

    async fn find_bank(&self, bank_id: Uuid) -> Result<Option<BankRef>, StoreError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, bank_name FROM banks WHERE id = $1")
                .bind(bank_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| BankRef { id, name }))
    }
}
