//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use bank_ledger::api::{self, AppState};
use bank_ledger::domain::{Account, Profile};
use bank_ledger::ledger::CreateAccountCommand;
use bank_ledger::security::{BcryptPinHasher, MIN_PIN_HASH_COST};
use bank_ledger::store::MemoryStore;
use bank_ledger::{AccountLedger, AccountQuery, LedgerSettings, OperationContext};

/// In-memory ledger with one seeded user and one seeded bank
pub struct TestLedger {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<AccountLedger>,
    pub query: Arc<AccountQuery>,
    pub user_id: Uuid,
    pub bank_id: Uuid,
}

pub fn setup_memory_ledger() -> TestLedger {
    setup_memory_ledger_with(LedgerSettings::default())
}

pub fn setup_memory_ledger_with(settings: LedgerSettings) -> TestLedger {
    let store = Arc::new(MemoryStore::new());
    let user_id = Uuid::new_v4();
    let bank_id = Uuid::new_v4();
    store.insert_user(user_id, "Test User").unwrap();
    store.insert_bank(bank_id, "Test Bank").unwrap();

    let hasher = Arc::new(BcryptPinHasher::new(MIN_PIN_HASH_COST));
    let ledger = AccountLedger::new(store.clone(), store.clone(), hasher)
        .with_settings(settings);
    let query = AccountQuery::new(store.clone(), store.clone());

    TestLedger {
        store,
        ledger: Arc::new(ledger),
        query: Arc::new(query),
        user_id,
        bank_id,
    }
}

impl TestLedger {
    /// Full HTTP application over this ledger
    pub fn app(&self) -> Router {
        api::build_router(AppState {
            ledger: self.ledger.clone(),
            query: self.query.clone(),
        })
    }

    /// Open an account for the seeded user
    pub async fn open_account(&self, initial_deposit: Option<Decimal>, pin: Option<&str>) -> Account {
        let mut command = CreateAccountCommand::new(self.user_id, Profile::new("Test Holder"));
        if let Some(amount) = initial_deposit {
            command = command.with_initial_deposit(amount);
        }
        if let Some(pin) = pin {
            command = command.with_pin(pin);
        }
        self.ledger
            .create_account(command, &OperationContext::new())
            .await
            .expect("Failed to open account")
    }
}

/// Setup test database - truncate tables and seed one user and one bank
pub async fn setup_test_db() -> (PgPool, Uuid, Uuid) {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    // Clean up DB for fresh state
    sqlx::query("TRUNCATE TABLE transactions, accounts, banks, users CASCADE")
        .execute(&mut *tx)
        .await
        .expect("Failed to clean up DB");

    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, display_name) VALUES ($1, 'Test User')")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .expect("Failed to seed user");

    let bank_id = Uuid::new_v4();
    sqlx::query("INSERT INTO banks (id, bank_name, ifsc_code) VALUES ($1, 'Test Bank', 'TEST0000001')")
        .bind(bank_id)
        .execute(&mut *tx)
        .await
        .expect("Failed to seed bank");

    tx.commit().await.expect("Failed to commit seed data");

    (pool, user_id, bank_id)
}
