//! Account number allocation

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::account::ACCOUNT_NUMBER_SPACE;
use crate::domain::AccountNumber;
use crate::store::{LedgerStore, StoreError};

/// Draws account numbers uniformly from the 10-digit space.
///
/// The uniqueness check here is advisory only: a concurrent creation can
/// claim the same number between the check and the insert, and the store's
/// unique constraint has the final word.
#[derive(Debug)]
pub struct IdentifierGenerator {
    rng: Mutex<StdRng>,
}

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible tests
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Draw one candidate without consulting the store
    pub fn candidate(&self) -> AccountNumber {
        let value = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(0..ACCOUNT_NUMBER_SPACE)
        };
        // gen_range stays below ACCOUNT_NUMBER_SPACE, so from_index always succeeds
        AccountNumber::from_index(value).unwrap_or_else(|| unreachable!("{value} out of range"))
    }

    /// Draw candidates until one is absent from the store
    pub async fn generate(&self, store: &dyn LedgerStore) -> Result<AccountNumber, StoreError> {
        loop {
            let candidate = self.candidate();
            if !store.exists_account_number(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(account_number = %candidate, "Account number taken, drawing again");
        }
    }
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountKind, Profile};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    #[test]
    fn test_candidate_format() {
        let generator = IdentifierGenerator::new();
        for _ in 0..1000 {
            let number = generator.candidate();
            assert_eq!(number.as_str().len(), 10);
            assert!(number.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = IdentifierGenerator::seeded(7);
        let b = IdentifierGenerator::seeded(7);
        assert_eq!(a.candidate(), b.candidate());
        assert_eq!(a.candidate(), b.candidate());
    }

    #[tokio::test]
    async fn test_generate_skips_taken_numbers() {
        let store = MemoryStore::new();

        // Claim the first two numbers the seeded generator will draw
        let preview = IdentifierGenerator::seeded(99);
        let taken = [preview.candidate(), preview.candidate()];
        let third = preview.candidate();
        for number in &taken {
            let account = Account::open(
                number.clone(),
                Uuid::new_v4(),
                None,
                Profile::new("Taken"),
                AccountKind::Savings,
                None,
            );
            store.insert_account(&account).await.unwrap();
        }

        let generator = IdentifierGenerator::seeded(99);
        let number = generator.generate(&store).await.unwrap();

        assert_eq!(number, third);
        assert!(!taken.contains(&number));
    }
}
