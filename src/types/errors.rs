use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("Amount error: {0}")]
    InvalidFormat(String),
    #[error("Amount error: {0} has more than two decimal places")]
    TooPrecise(String),
    #[error("Amount error: {0} is negative")]
    Negative(String)
}
