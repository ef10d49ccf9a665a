//! PIN hashing
//!
//! One-way hashing primitive for account PINs. Only the hash is ever stored.
//!
//! A PIN has a tiny keyspace, so the hash must be expensive to compute:
//! bcrypt with a configurable work factor, the cost travelling inside the
//! stored hash so verification keeps working after the cost is raised.

use thiserror::Error;

/// Lowest work factor bcrypt accepts
pub const MIN_PIN_HASH_COST: u32 = 4;

/// Highest work factor bcrypt accepts
pub const MAX_PIN_HASH_COST: u32 = 31;

/// Default work factor for stored PINs
pub const DEFAULT_PIN_HASH_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Error)]
pub enum PinHashError {
    #[error("PIN hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// One-way PIN hashing, treated by the ledger as a trusted external function
pub trait PinHasher: Send + Sync {
    /// Hash a plaintext PIN for storage
    fn hash(&self, pin: &str) -> Result<String, PinHashError>;

    /// Check a plaintext PIN against a stored hash. A malformed hash never verifies.
    fn verify(&self, pin: &str, hash: &str) -> bool;
}

/// bcrypt, stored in modular crypt format (`$2b$<cost>$<salt+digest>`)
#[derive(Debug, Clone, Copy)]
pub struct BcryptPinHasher {
    cost: u32,
}

impl BcryptPinHasher {
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPinHasher {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_HASH_COST)
    }
}

impl PinHasher for BcryptPinHasher {
    fn hash(&self, pin: &str) -> Result<String, PinHashError> {
        Ok(bcrypt::hash(pin, self.cost)?)
    }

    fn verify(&self, pin: &str, hash: &str) -> bool {
        match bcrypt::verify(pin, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Stored PIN hash could not be parsed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptPinHasher {
        BcryptPinHasher::new(MIN_PIN_HASH_COST)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("4321").unwrap();

        assert!(hasher.verify("4321", &hash));
        assert!(!hasher.verify("1234", &hash));
        assert!(!hash.contains("4321"));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        assert_ne!(hasher.hash("0000").unwrap(), hasher.hash("0000").unwrap());
    }

    #[test]
    fn test_default_cost_is_stored_in_hash() {
        let hasher = BcryptPinHasher::default();
        let hash = hasher.hash("4821").unwrap();

        assert_eq!(hasher.cost(), DEFAULT_PIN_HASH_COST);
        assert!(hash.starts_with(&format!("$2b${:02}$", DEFAULT_PIN_HASH_COST)));
    }

    #[test]
    fn test_default_cost_makes_pin_sweep_expensive() {
        let hasher = BcryptPinHasher::default();
        let hash = hasher.hash("4821").unwrap();

        let start = std::time::Instant::now();
        assert!(!hasher.verify("0000", &hash));
        let per_guess = start.elapsed();

        // every 4-digit PIN at this rate takes well over a minute
        assert!(
            per_guess * 10_000 > std::time::Duration::from_secs(60),
            "one guess took {:?}",
            per_guess
        );
    }

    #[test]
    fn test_verify_across_costs() {
        let hash = hasher().hash("2468").unwrap();
        // verification reads the cost from the hash, not from the hasher
        assert!(BcryptPinHasher::default().verify("2468", &hash));
    }

    #[test]
    fn test_cost_out_of_range_is_an_error() {
        let result = BcryptPinHasher::new(MIN_PIN_HASH_COST - 1).hash("0000");
        assert!(matches!(result, Err(PinHashError::Bcrypt(_))));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let hasher = hasher();
        assert!(!hasher.verify("0000", ""));
        assert!(!hasher.verify("0000", "not-a-hash"));
        assert!(!hasher.verify("0000", "zz$zz"));
    }
}
