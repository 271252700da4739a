use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TransactionType;
use crate::types::{AccountId, TransactionId};

/// A single entry in the append-only ledger.
///
/// The amount is always positive; the direction comes from the transaction type.
/// A `deposit` credits the account, a `withdrawal` or `transfer` debits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    /// The account this entry is booked against.
    pub account_id: AccountId,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub description: String,
    pub date: DateTime<Utc>
}

impl Transaction {
    pub fn new(account_id: AccountId, transaction_type: TransactionType, amount: Decimal, description: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            transaction_type,
            description: description.into(),
            date
        }
    }

    /// The effect this entry has on its account's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Deposit => self.amount,
            TransactionType::Withdrawal | TransactionType::Transfer => -self.amount
        }
    }
}
