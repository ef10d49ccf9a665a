//! Account entity
//!
//! An account owns a balance that only ever changes together with a new
//! transaction record. The mutation methods here never touch storage: they
//! validate, then return the next account state plus the record to append,
//! leaving the atomic write to the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::security::PinHasher;

use super::{Amount, Balance, DomainError, TransactionKind, TransactionRecord};

/// Number of digits in an account number
pub const ACCOUNT_NUMBER_DIGITS: usize = 10;

/// Exclusive upper bound of the account-number space (10^10)
pub const ACCOUNT_NUMBER_SPACE: u64 = 10_000_000_000;

// =========================================================================
// AccountNumber
// =========================================================================

/// Opaque, zero-padded 10-digit account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("account number must be exactly {ACCOUNT_NUMBER_DIGITS} digits (got {0:?})")]
pub struct AccountNumberError(pub String);

impl AccountNumber {
    /// Format a value from the account-number space.
    ///
    /// Returns `None` if the value does not fit in 10 digits.
    pub fn from_index(value: u64) -> Option<Self> {
        (value < ACCOUNT_NUMBER_SPACE).then(|| Self(format!("{value:010}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ACCOUNT_NUMBER_DIGITS && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(AccountNumberError(s.to_string()))
        }
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

// =========================================================================
// AccountKind
// =========================================================================

/// Product type of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    #[default]
    Savings,
    Current,
    FixedDeposit,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Savings => "SAVINGS",
            AccountKind::Current => "CURRENT",
            AccountKind::FixedDeposit => "FIXED_DEPOSIT",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAVINGS" => Ok(AccountKind::Savings),
            "CURRENT" => Ok(AccountKind::Current),
            "FIXED_DEPOSIT" => Ok(AccountKind::FixedDeposit),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

// =========================================================================
// Profile
// =========================================================================

/// Holder contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            phone_number: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }
}

/// Partial profile update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.phone_number.is_none()
    }
}

// =========================================================================
// Account
// =========================================================================

/// Bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub(crate) id: Uuid,
    pub(crate) number: AccountNumber,
    pub(crate) user_id: Uuid,
    pub(crate) bank_id: Option<Uuid>,
    pub(crate) profile: Profile,
    pub(crate) balance: Balance,
    #[serde(skip_serializing, default)]
    pub(crate) pin_hash: Option<String>,
    pub(crate) kind: AccountKind,
    pub(crate) is_active: bool,
    /// Optimistic concurrency counter, 1 at creation
    pub(crate) version: i64,
    pub(crate) created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new, active, empty account
    pub fn open(
        number: AccountNumber,
        user_id: Uuid,
        bank_id: Option<Uuid>,
        profile: Profile,
        kind: AccountKind,
        pin_hash: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            user_id,
            bank_id,
            profile,
            balance: Balance::zero(),
            pin_hash,
            kind,
            is_active: true,
            version: 1,
            created_at: Utc::now(),
        }
    }

    /// Credit the account.
    ///
    /// Checks, in order: active, amount positive.
    pub fn deposit(
        &self,
        amount: Decimal,
        description: Option<String>,
        performed_by: Option<Uuid>,
    ) -> Result<(Account, TransactionRecord), DomainError> {
        self.ensure_active()?;
        let amount = Amount::new(amount)?;

        let mut next = self.next_version();
        next.balance = self.balance.credit(&amount)?;

        let record = next.record(TransactionKind::Deposit, amount, description, performed_by);
        Ok((next, record))
    }

    /// Debit the account.
    ///
    /// Checks, in order: active, amount positive, PIN (only when one is
    /// supplied), sufficient funds.
    pub fn withdraw(
        &self,
        amount: Decimal,
        pin: Option<&str>,
        hasher: &dyn PinHasher,
        description: Option<String>,
        performed_by: Option<Uuid>,
    ) -> Result<(Account, TransactionRecord), DomainError> {
        self.ensure_active()?;
        let amount = Amount::new(amount)?;

        if let Some(pin) = pin {
            let verified = self
                .pin_hash
                .as_deref()
                .is_some_and(|hash| hasher.verify(pin, hash));
            if !verified {
                return Err(DomainError::InvalidPin(self.number.to_string()));
            }
        }

        if !self.balance.is_sufficient_for(&amount) {
            return Err(DomainError::insufficient_balance(
                &self.number,
                amount.value(),
                self.balance.value(),
            ));
        }

        let mut next = self.next_version();
        next.balance = self.balance.debit(&amount)?;

        let record = next.record(TransactionKind::Withdraw, amount, description, performed_by);
        Ok((next, record))
    }

    /// Close the account. `None` when it is already inactive.
    pub fn deactivate(&self) -> Option<Account> {
        if !self.is_active {
            return None;
        }

        let mut next = self.next_version();
        next.is_active = false;
        Some(next)
    }

    /// Apply a partial profile update. `None` when nothing changes.
    pub fn with_profile(&self, changes: &ProfileChanges) -> Option<Account> {
        if changes.is_empty() {
            return None;
        }

        let mut next = self.next_version();
        if let Some(name) = &changes.name {
            next.profile.name = name.clone();
        }
        if let Some(address) = &changes.address {
            next.profile.address = Some(address.clone());
        }
        if let Some(phone_number) = &changes.phone_number {
            next.profile.phone_number = Some(phone_number.clone());
        }
        Some(next)
    }

    /// Replace the stored PIN hash
    pub fn with_pin_hash(&self, pin_hash: String) -> Account {
        let mut next = self.next_version();
        next.pin_hash = Some(pin_hash);
        next
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.is_active {
            Ok(())
        } else {
            Err(DomainError::InactiveAccount(self.number.to_string()))
        }
    }

    fn next_version(&self) -> Account {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    fn record(
        &self,
        kind: TransactionKind,
        amount: Amount,
        description: Option<String>,
        performed_by: Option<Uuid>,
    ) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            account_id: self.id,
            account_number: self.number.clone(),
            kind,
            amount,
            balance_after: self.balance,
            description,
            performed_by,
            created_at: Utc::now(),
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn bank_id(&self) -> Option<Uuid> {
        self.bank_id
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn pin_hash(&self) -> Option<&str> {
        self.pin_hash.as_deref()
    }

    pub fn has_pin(&self) -> bool {
        self.pin_hash.is_some()
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
