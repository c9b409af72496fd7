use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::money::Money;

/// Latest known price of a traded symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub symbol: String,
    pub price: Money,
    pub updated_at: NaiveDateTime,
}

impl MarketPrice {
    pub fn new(symbol: &str, price: Money, updated_at: NaiveDateTime) -> Result<Self> {
        if price.is_negative() {
            return Err(Error::invalid_input(format!(
                "Market price of {} cannot be negative (got {})",
                symbol, price
            )));
        }
        Ok(Self {
            symbol: normalize_symbol(symbol)?,
            price,
            updated_at,
        })
    }
}

/// Trims a ticker symbol; symbols are otherwise matched exactly.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("Symbol cannot be empty"));
    }
    Ok(trimmed.to_string())
}
