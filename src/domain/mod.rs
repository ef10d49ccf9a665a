//! Domain module
//!
//! Core domain types and business rules.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod transaction;

pub use account::{
    Account, AccountKind, AccountNumber, AccountNumberError, Profile, ProfileChanges,
};
pub use amount::{Amount, AmountError, Balance, MONEY_SCALE};
pub use context::OperationContext;
pub use error::{DomainError, EntityKind};
pub use transaction::{ledger_sum, TransactionKind, TransactionRecord};
