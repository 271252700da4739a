use crate::types::errors::AmountError;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};
use std::str::FromStr;

/// Currency amounts are kept to cents.
pub const DECIMAL_PLACES: u32 = 2;

/// Parses a user supplied currency amount.
///
/// Surrounding whitespace is ignored. The value must be a plain decimal number,
/// not negative, with at most two fractional digits. Zero is accepted here;
/// the stores decide whether a zero amount makes sense for an operation.
pub fn parse_amount(value: &str) -> Result<Decimal, AmountError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(AmountError::InvalidFormat("Value is an empty string".to_string()));
    }

    let amount = Decimal::from_str(value).map_err(|error| {
        AmountError::InvalidFormat(format!("Value '{value}' is not a number: {error}"))
    })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(value.to_string()));
    }

    if amount.normalize().scale() > DECIMAL_PLACES {
        return Err(AmountError::TooPrecise(value.to_string()));
    }

    Ok(amount)
}

/// Renders an amount with exactly two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(DECIMAL_PLACES);
    rounded.rescale(DECIMAL_PLACES);
    rounded.to_string()
}

/// `deserialize_with` helper for optional amount columns.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;

    match value {
        Some(value) if !value.trim().is_empty() => parse_amount(&value).map(Some).map_err(de::Error::custom),
        _ => Ok(None)
    }
}
