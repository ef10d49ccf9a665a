//! Query module
//!
//! Read models for balances, ledger history and account listings.

mod service;
pub mod views;

pub use service::AccountQuery;
pub use views::{AccountView, BalanceView, TotalBalanceView, TransactionView};
