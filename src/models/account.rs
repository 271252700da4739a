use crate::models::errors::LedgerError;
use crate::models::{AccountType, Transaction, TransactionType};
use crate::types::{AccountId, UserId};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCOUNT_NUMBER_RANGE: std::ops::Range<u64> = 1_000_000_000..10_000_000_000;

/// A single bank account owned by one user.
///
/// The balance is expected to equal the signed sum of every transaction booked
/// against the account, including the initial deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    /// The owning user.
    pub user_id: UserId,
    /// Random 10 digit number shown to customers.
    pub account_number: String,
    pub balance: Decimal,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Inactive accounts reject every transaction.
    pub is_active: bool,
    pub created_at: DateTime<Utc>
}

impl Account {
    /// Creates an account holding `opening_balance`.
    ///
    /// The caller is responsible for booking the matching initial deposit.
    pub fn new(user_id: UserId, account_type: AccountType, opening_balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            account_number: generate_account_number(),
            balance: opening_balance,
            account_type,
            is_active: true,
            created_at: Utc::now()
        }
    }

    /// Applies a single transaction to the balance.
    ///
    /// # Errors
    /// Returns `LedgerError` if:
    /// - The account is inactive.
    /// - The amount is zero or negative.
    /// - A debit exceeds the current balance.
    /// - The balance would overflow.
    ///
    /// The balance is left untouched on error.
    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), LedgerError> {
        if !self.is_active {
            return Err(LedgerError::account_inactive(transaction))
        }

        if transaction.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(transaction))
        }

        match transaction.transaction_type {
            TransactionType::Deposit => self.credit(transaction),
            TransactionType::Withdrawal | TransactionType::Transfer => self.debit(transaction)
        }
    }

    /// Masked display name, e.g. `Checking (****1234)`.
    pub fn label(&self) -> String {
        let digits = self.account_number.chars().count();
        let last_four: String = self.account_number.chars().skip(digits.saturating_sub(4)).collect();
        format!("{} (****{})", self.account_type.title(), last_four)
    }

    fn credit(&mut self, transaction: &Transaction) -> Result<(), LedgerError> {
        self.balance = self.balance.checked_add(transaction.amount)
            .ok_or_else(|| LedgerError::overflow(transaction))?;

        Ok(())
    }

    fn debit(&mut self, transaction: &Transaction) -> Result<(), LedgerError> {
        if transaction.amount > self.balance {
            return Err(LedgerError::insufficient_funds(transaction, self.balance))
        }

        self.balance = self.balance.checked_sub(transaction.amount)
            .ok_or_else(|| LedgerError::overflow(transaction))?;

        Ok(())
    }
}

/// Generates a random 10 digit account number without a leading zero.
///
/// Collisions with existing accounts are not checked.
pub fn generate_account_number() -> String {
    rand::thread_rng().gen_range(ACCOUNT_NUMBER_RANGE).to_string()
}
