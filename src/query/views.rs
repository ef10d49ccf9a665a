//! Read models returned by [`super::AccountQuery`]
//!
//! Money fields serialize as decimal strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Account, AccountKind, AccountNumber, Amount, Balance, TransactionKind, TransactionRecord,
};

/// Current balance of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    pub account_number: AccountNumber,
    pub name: String,
    pub balance: Balance,
}

impl From<&Account> for BalanceView {
    fn from(account: &Account) -> Self {
        Self {
            account_number: account.number().clone(),
            name: account.name().to_string(),
            balance: *account.balance(),
        }
    }
}

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: Uuid,
    pub account_number: AccountNumber,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub balance_after: Balance,
    pub description: Option<String>,
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&TransactionRecord> for TransactionView {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id,
            account_number: record.account_number.clone(),
            kind: record.kind,
            amount: record.amount,
            balance_after: record.balance_after,
            description: record.description.clone(),
            performed_by: record.performed_by,
            created_at: record.created_at,
        }
    }
}

/// Account summary with its bank resolved for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub account_number: AccountNumber,
    pub user_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub balance: Balance,
    pub account_type: AccountKind,
    pub is_active: bool,
    pub has_pin: bool,
    pub bank_id: Option<Uuid>,
    /// `None` when unaffiliated or the bank no longer resolves
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub fn new(account: &Account, bank_name: Option<String>) -> Self {
        let profile = account.profile();
        Self {
            id: account.id(),
            account_number: account.number().clone(),
            user_id: account.user_id(),
            name: profile.name.clone(),
            address: profile.address.clone(),
            phone_number: profile.phone_number.clone(),
            balance: *account.balance(),
            account_type: account.kind(),
            is_active: account.is_active(),
            has_pin: account.has_pin(),
            bank_id: account.bank_id(),
            bank_name,
            created_at: account.created_at(),
        }
    }
}

/// Sum of balances over active accounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalBalanceView {
    pub total_balance: Decimal,
}
