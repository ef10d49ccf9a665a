//! Ledger module
//!
//! Write side: commands, account-number allocation, and the
//! [`AccountLedger`] service that applies them.

mod commands;
mod identifier;
mod service;

pub use commands::*;
pub use identifier::IdentifierGenerator;
pub use service::{AccountLedger, LedgerSettings};
