//! bank_ledger Library
//!
//! Bank account ledger: accounts, deposits and withdrawals over an
//! append-only transaction history. Re-exports modules for integration
//! testing and the server binary.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod ledger;
pub mod query;
pub mod security;
pub mod store;

mod error;

pub use config::Config;
pub use domain::{Account, AccountNumber, Amount, AmountError, Balance, DomainError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};
pub use ledger::{AccountLedger, LedgerSettings};
pub use query::AccountQuery;
