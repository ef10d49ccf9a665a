//! Command definitions
//!
//! Commands represent intentions to change account state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountKind, AccountNumber, Profile};

/// Description written on the record created by an opening deposit
pub const INITIAL_DEPOSIT_DESCRIPTION: &str = "Initial deposit";

// =========================================================================
// CreateAccountCommand
// =========================================================================

/// Command to open an account for an existing user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub user_id: Uuid,
    pub bank_id: Option<Uuid>,
    pub profile: Profile,
    pub pin: Option<String>,
    pub account_type: AccountKind,
    pub initial_deposit: Option<Decimal>,
}

impl CreateAccountCommand {
    pub fn new(user_id: Uuid, profile: Profile) -> Self {
        Self {
            user_id,
            bank_id: None,
            profile,
            pin: None,
            account_type: AccountKind::default(),
            initial_deposit: None,
        }
    }

    pub fn with_bank(mut self, bank_id: Uuid) -> Self {
        self.bank_id = Some(bank_id);
        self
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_account_type(mut self, account_type: AccountKind) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_initial_deposit(mut self, amount: Decimal) -> Self {
        self.initial_deposit = Some(amount);
        self
    }
}

// =========================================================================
// DepositCommand
// =========================================================================

/// Command to credit an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub account_number: AccountNumber,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl DepositCommand {
    pub fn new(account_number: AccountNumber, amount: Decimal) -> Self {
        Self {
            account_number,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =========================================================================
// WithdrawCommand
// =========================================================================

/// Command to debit an account.
///
/// `pin` is `None` for teller-initiated withdrawals, which skip PIN verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub account_number: AccountNumber,
    pub amount: Decimal,
    pub pin: Option<String>,
    pub description: Option<String>,
}

impl WithdrawCommand {
    pub fn new(account_number: AccountNumber, amount: Decimal) -> Self {
        Self {
            account_number,
            amount,
            pin: None,
            description: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
