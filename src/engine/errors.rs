use crate::engine::Operation;
use crate::models::{AccountType, IdentityError, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("[{operation:?}] requires the '{field}' column")]
    MissingField {
        operation: Operation,
        field: &'static str
    },
    #[error("[{operation:?}] has an invalid '{field}' value '{value}'")]
    InvalidField {
        operation: Operation,
        field: &'static str,
        value: String
    },
    #[error("[{operation:?}] requires a logged in user")]
    NotAuthenticated {
        operation: Operation
    },
    #[error("No {account_type} account for the current user")]
    AccountTypeNotFound {
        account_type: AccountType
    },
    #[error("No user with email [{email}]")]
    UnknownUser {
        email: String
    },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Ledger(#[from] LedgerError)
}
