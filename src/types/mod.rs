mod amount;
mod errors;

use uuid::Uuid;

pub use amount::{deserialize_amount, format_amount, parse_amount};
pub use errors::AmountError;

pub type UserId = Uuid;
pub type AccountId = Uuid;
pub type TransactionId = Uuid;
