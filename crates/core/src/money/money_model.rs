use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Currency;
use crate::errors::{Error, Result};

/// An immutable monetary amount in a single currency.
///
/// Arithmetic between two values requires the same currency; mixing
/// currencies fails with `Error::CurrencyMismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Builds a value from a raw currency code, validating it against ISO-4217.
    pub fn parse(amount: Decimal, currency_code: &str) -> Result<Self> {
        Ok(Self::new(amount, Currency::parse(currency_code)?))
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(Error::currency_mismatch(self.currency, other.currency));
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    /// Scales the amount by a plain factor (a quantity or a rate).
    pub fn times(&self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, self.currency)
    }

    /// Rounds half-to-even to the currency's minor unit.
    pub fn round_to_minor_units(&self) -> Money {
        Money::new(
            self.amount.round_dp_with_strategy(
                self.currency.minor_units(),
                RoundingStrategy::MidpointNearestEven,
            ),
            self.currency,
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// `part / whole × 100`, defined as zero when `whole` is zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole * Decimal::ONE_HUNDRED
    }
}
