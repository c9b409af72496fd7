//! Helpers for the TEXT columns that hold decimals, currencies and enum codes.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;
use brokerage_core::money::{Currency, Money};
use brokerage_core::Result;

/// Parses a stored decimal. Unlike user input, a malformed stored value is a
/// storage fault and is reported as such.
pub fn parse_decimal(value: &str, field: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| {
        StorageError::CorruptValue(format!("{} '{}' is not a decimal: {}", field, value, e)).into()
    })
}

pub fn parse_optional_decimal(value: Option<&str>, field: &str) -> Result<Option<Decimal>> {
    value.map(|v| parse_decimal(v, field)).transpose()
}

pub fn parse_currency(code: &str) -> Result<Currency> {
    Currency::parse(code).map_err(|e| StorageError::CorruptValue(e.to_string()).into())
}

pub fn parse_money(amount: &str, currency: Currency, field: &str) -> Result<Money> {
    Ok(Money::new(parse_decimal(amount, field)?, currency))
}

/// Parses a stored enum code through its `FromStr` impl.
pub fn parse_code<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = brokerage_core::Error>,
{
    value
        .parse::<T>()
        .map_err(|e| StorageError::CorruptValue(e.to_string()).into())
}
