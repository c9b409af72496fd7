//! Engine configuration stored in the `app_settings` key/value table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{DEFAULT_BASE_CURRENCY, DEFAULT_FEE_RATE};
use crate::errors::{Error, Result};
use crate::money::Currency;

/// Typed view of the engine settings, with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Trade fee as a fraction of the traded amount
    pub fee_rate: Decimal,
    /// Currency of newly provisioned portfolios
    pub base_currency: Currency,
}

impl EngineSettings {
    pub fn from_values(fee_rate: Option<&str>, base_currency: Option<&str>) -> Result<Self> {
        Ok(Self {
            fee_rate: parse_fee_rate(fee_rate)?,
            base_currency: Currency::parse(base_currency.unwrap_or(DEFAULT_BASE_CURRENCY))?,
        })
    }
}

/// Parses a stored fee rate, falling back to the default when unset.
pub fn parse_fee_rate(value: Option<&str>) -> Result<Decimal> {
    let rate = Decimal::from_str(value.unwrap_or(DEFAULT_FEE_RATE).trim())?;
    validate_fee_rate(rate)?;
    Ok(rate)
}

/// A fee rate must lie in `[0, 1)`.
pub fn validate_fee_rate(rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(Error::invalid_input(format!(
            "Fee rate must be in [0, 1) (got {})",
            rate
        )));
    }
    Ok(())
}
