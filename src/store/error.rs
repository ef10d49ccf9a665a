//! Store Errors
//!
//! Error types for ledger persistence.

use uuid::Uuid;

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Optimistic concurrency conflict
    #[error("Concurrency conflict for account {account_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        account_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// Account number already taken (unique constraint)
    #[error("Account number already exists: {0}")]
    DuplicateAccountNumber(String),

    /// Account vanished between load and save
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data violates a domain invariant
    #[error("Corrupted row: {0}")]
    Corrupted(String),

    /// In-memory state lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Check if this error is a concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. } | StoreError::DuplicateAccountNumber(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_retryable() {
        let conflict = StoreError::ConcurrencyConflict {
            account_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_retryable());
        assert!(conflict.is_concurrency_conflict());

        let duplicate = StoreError::DuplicateAccountNumber("0000000001".to_string());
        assert!(duplicate.is_retryable());
        assert!(!duplicate.is_concurrency_conflict());

        let not_found = StoreError::AccountNotFound(Uuid::new_v4());
        assert!(!not_found.is_retryable());
    }
}
