use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::PERCENT_PRECISION;
use crate::errors::Result;
use crate::money::{percentage_of, Currency, Money};

/// Aggregate monetary totals of a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTotals {
    pub total_value: Money,
    pub total_invested: Money,
    pub total_gain: Money,
    pub gain_percentage: Decimal,
}

impl AggregateTotals {
    pub fn zero(currency: Currency) -> Self {
        Self {
            total_value: Money::zero(currency),
            total_invested: Money::zero(currency),
            total_gain: Money::zero(currency),
            gain_percentage: Decimal::ZERO,
        }
    }

    /// Builds totals from their monetary parts, deriving the gain percentage
    /// (zero when nothing is invested).
    pub fn from_parts(total_value: Money, total_invested: Money, total_gain: Money) -> Result<Self> {
        total_value.ensure_same_currency(&total_invested)?;
        total_value.ensure_same_currency(&total_gain)?;
        Ok(Self {
            total_value,
            total_invested,
            total_gain,
            gain_percentage: round_percentage(percentage_of(
                total_gain.amount(),
                total_invested.amount(),
            )),
        })
    }

    pub fn currency(&self) -> Currency {
        self.total_value.currency()
    }

    /// Rounds value and invested half-to-even to minor units and re-derives the
    /// gain from the rounded figures, so `gain == value - invested` still holds
    /// exactly once stored. The percentage is derived from the same rounded
    /// figures.
    pub fn rounded_for_persistence(&self) -> Self {
        let total_value = self.total_value.round_to_minor_units();
        let total_invested = self.total_invested.round_to_minor_units();
        let total_gain = total_value.amount() - total_invested.amount();
        Self {
            total_value,
            total_invested,
            total_gain: Money::new(total_gain, total_value.currency()),
            gain_percentage: round_percentage(percentage_of(total_gain, total_invested.amount())),
        }
    }
}

fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_PRECISION, RoundingStrategy::MidpointNearestEven)
}
