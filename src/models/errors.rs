use crate::models::{Transaction, TransactionType};
use crate::storage::StorageError;
use crate::types::{AccountId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Email or password is incorrect")]
    InvalidCredentials,
    #[error("Email [{email}] is already registered")]
    DuplicateEmail {
        email: String
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Password must be at least {minimum} characters")]
    WeakPassword {
        minimum: usize
    },
    #[error("Current password is incorrect for user [{user_id}]")]
    IncorrectPassword {
        user_id: UserId
    },
    #[error("No user is logged in")]
    NotAuthenticated,
    #[error("User [{user_id}] is not an administrator")]
    NotAuthorized {
        user_id: UserId
    },
    #[error("User [{user_id}] was not found")]
    UserNotFound {
        user_id: UserId
    },
    #[error("Administrator [{user_id}] cannot deactivate their own account")]
    SelfDeactivation {
        user_id: UserId
    },
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Storage(#[from] StorageError)
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No active account for user [{user_id}]")]
    NoActiveAccount {
        user_id: UserId
    },
    #[error("Account [{account_id}] was not found")]
    AccountNotFound {
        account_id: AccountId
    },
    #[error("Account [{account_id}] is inactive, [{transaction_type:?}] rejected")]
    AccountInactive {
        account_id: AccountId,
        transaction_type: TransactionType
    },
    #[error("Amount [{amount}] must be greater than zero for [{transaction_type:?}] on account [{account_id}]")]
    InvalidAmount {
        account_id: AccountId,
        transaction_type: TransactionType,
        amount: Decimal
    },
    #[error("Insufficient funds for [{transaction_type:?}] of [{requested}] on account [{account_id}], available [{available}]")]
    InsufficientFunds {
        account_id: AccountId,
        transaction_type: TransactionType,
        requested: Decimal,
        available: Decimal
    },
    #[error("Numeric overflow occurred for [{transaction_type:?}] on account [{account_id}]")]
    Overflow {
        account_id: AccountId,
        transaction_type: TransactionType
    },
    #[error("Cannot transfer from account [{account_id}] to itself")]
    SameAccountTransfer {
        account_id: AccountId
    },
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Account [{account_id}] does not belong to user [{user_id}]")]
    UnauthorizedTransfer {
        account_id: AccountId,
        user_id: UserId
    },
    #[error(transparent)]
    Storage(#[from] StorageError)
}

impl LedgerError {
    //NOTE: Factories keep the call sites in the account model short, every ledger rejection carries the same context.

    pub fn account_inactive(tx: &Transaction) -> Self {
        Self::AccountInactive {
            account_id: tx.account_id,
            transaction_type: tx.transaction_type
        }
    }

    pub fn invalid_amount(tx: &Transaction) -> Self {
        Self::InvalidAmount {
            account_id: tx.account_id,
            transaction_type: tx.transaction_type,
            amount: tx.amount
        }
    }

    pub fn insufficient_funds(tx: &Transaction, available: Decimal) -> Self {
        Self::InsufficientFunds {
            account_id: tx.account_id,
            transaction_type: tx.transaction_type,
            requested: tx.amount,
            available
        }
    }

    pub fn overflow(tx: &Transaction) -> Self {
        Self::Overflow {
            account_id: tx.account_id,
            transaction_type: tx.transaction_type
        }
    }
}
