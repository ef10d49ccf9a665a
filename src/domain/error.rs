//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use super::AmountError;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    User,
    Bank,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Account => "Account",
            EntityKind::User => "User",
            EntityKind::Bank => "Bank",
        };
        f.write_str(name)
    }
}

/// Business rule violations raised by the ledger.
///
/// Each variant names the account (or reference) involved so callers can
/// render a user-facing message without re-querying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Referenced account, user or bank does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    /// Mutation attempted on a deactivated account
    #[error("Account {0} is not active")]
    InactiveAccount(String),

    /// Zero, negative, or badly scaled amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal exceeds the current balance
    #[error("Insufficient balance on account {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        required: Decimal,
        available: Decimal,
    },

    /// Supplied PIN does not match the stored hash
    #[error("Invalid PIN for account {0}")]
    InvalidPin(String),

    /// Account number collided with an existing one at commit time
    #[error("Duplicate account number: {0}")]
    DuplicateIdentifier(String),

    /// Concurrent writers kept winning until the retry budget ran out
    #[error("Concurrent modification of account {account} not resolved after {attempts} attempts")]
    Conflict { account: String, attempts: u32 },
}

impl DomainError {
    pub fn account_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: EntityKind::Account,
            key: key.to_string(),
        }
    }

    pub fn user_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: EntityKind::User,
            key: key.to_string(),
        }
    }

    pub fn bank_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: EntityKind::Bank,
            key: key.to_string(),
        }
    }

    /// Create an insufficient balance error
    pub fn insufficient_balance(
        account: impl ToString,
        required: Decimal,
        available: Decimal,
    ) -> Self {
        Self::InsufficientBalance {
            account: account.to_string(),
            required,
            available,
        }
    }

    /// Check if this is a client error (caller must correct the request)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InactiveAccount(_)
                | Self::InvalidAmount(_)
                | Self::InsufficientBalance { .. }
                | Self::InvalidPin(_)
        )
    }

    /// Check if this is a conflict error (a fresh attempt may succeed)
    pub fn is_conflict_error(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::DuplicateIdentifier(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        DomainError::InvalidAmount(err.to_string())
    }
}
