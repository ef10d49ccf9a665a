//! Transaction records
//!
//! Append-only entries in an account's ledger. A record is written once per
//! successful balance mutation and never updated afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{AccountNumber, Amount, Balance};

/// Direction of a balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
        }
    }

    /// Contribution of `amount` to the balance under this kind
    pub fn signed(&self, amount: &Amount) -> Decimal {
        match self {
            TransactionKind::Deposit => amount.value(),
            TransactionKind::Withdraw => -amount.value(),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "WITHDRAW" => Ok(TransactionKind::Withdraw),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub account_number: AccountNumber,
    pub kind: TransactionKind,
    pub amount: Amount,
    /// Account balance immediately after this record was applied
    pub balance_after: Balance,
    pub description: Option<String>,
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Signed contribution of this record to the account balance
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(&self.amount)
    }
}

/// Sum of signed amounts over a set of records.
///
/// For any account this must equal the stored balance.
pub fn ledger_sum<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Decimal {
    records
        .into_iter()
        .map(TransactionRecord::signed_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(kind: TransactionKind, amount: Decimal) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            account_number: "0000000001".parse().unwrap(),
            kind,
            amount: Amount::new(amount).unwrap(),
            balance_after: Balance::zero(),
            description: None,
            performed_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signed_amounts() {
        let deposit = record(TransactionKind::Deposit, dec!(100));
        let withdraw = record(TransactionKind::Withdraw, dec!(30.50));

        assert_eq!(deposit.signed_amount(), dec!(100.00));
        assert_eq!(withdraw.signed_amount(), dec!(-30.50));
        assert_eq!(ledger_sum([&deposit, &withdraw]), dec!(69.50));
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in [TransactionKind::Deposit, TransactionKind::Withdraw] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("TRANSFER".parse::<TransactionKind>().is_err());
        assert_eq!(
            serde_json::to_string(&TransactionKind::Withdraw).unwrap(),
            "\"WITHDRAW\""
        );
    }
}
