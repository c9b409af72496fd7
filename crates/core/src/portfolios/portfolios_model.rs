//! Portfolio domain models.

use chrono::NaiveDateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::money::{Currency, Money};
use crate::positions::{Position, PositionDelta};
use crate::valuation::{recalculate, AggregateTotals};

/// Who owns a portfolio's totals.
///
/// - `Auto`: totals are recalculated from positions after every change
/// - `Manual`: totals were set by an operator and are left alone until
///   [`Portfolio::switch_to_auto`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuationMode {
    #[default]
    Auto,
    Manual,
}

impl ValuationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationMode::Auto => "AUTO",
            ValuationMode::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for ValuationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValuationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AUTO" => Ok(ValuationMode::Auto),
            "MANUAL" => Ok(ValuationMode::Manual),
            other => Err(Error::invalid_input(format!(
                "Unknown valuation mode '{}'",
                other
            ))),
        }
    }
}

/// Aggregate root owning a user's positions and their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: Currency,
    pub valuation_mode: ValuationMode,
    pub totals: AggregateTotals,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Portfolio {
    pub fn is_manual(&self) -> bool {
        self.valuation_mode == ValuationMode::Manual
    }

    /// Reacts to a position mutation.
    ///
    /// In AUTO mode the totals are replaced by a full recalculation over
    /// `positions` (the complete set after the change). In MANUAL mode the totals
    /// are left untouched and the delta is returned as an audit record.
    pub fn apply_position_change(
        &mut self,
        delta: &PositionDelta,
        positions: &[Position],
        now: NaiveDateTime,
    ) -> Result<Option<PortfolioAdjustment>> {
        match self.valuation_mode {
            ValuationMode::Auto => {
                self.recalculate_totals(positions, now)?;
                Ok(None)
            }
            ValuationMode::Manual => {
                self.updated_at = now;
                Ok(Some(PortfolioAdjustment::new(
                    &self.id,
                    AdjustmentKind::DeferredPositionChange,
                    Some(delta.clone()),
                    None,
                    now,
                )))
            }
        }
    }

    /// Overrides the totals and moves the portfolio to MANUAL mode.
    ///
    /// The figures are stored as given; only the gain percentage is derived.
    pub fn set_manual_totals(
        &mut self,
        totals: &ManualTotals,
        now: NaiveDateTime,
    ) -> Result<PortfolioAdjustment> {
        totals.validate()?;
        let aggregate = AggregateTotals::from_parts(
            Money::new(totals.total_value, self.currency),
            Money::new(totals.total_invested, self.currency),
            Money::new(totals.total_gain, self.currency),
        )?;

        self.valuation_mode = ValuationMode::Manual;
        self.totals = aggregate;
        self.updated_at = now;
        Ok(PortfolioAdjustment::new(
            &self.id,
            AdjustmentKind::ManualTotals,
            None,
            Some(aggregate),
            now,
        ))
    }

    /// Returns the portfolio to AUTO mode and recalculates immediately.
    ///
    /// Idempotent: an AUTO portfolio is simply recalculated and no adjustment
    /// is recorded.
    pub fn switch_to_auto(
        &mut self,
        positions: &[Position],
        now: NaiveDateTime,
    ) -> Result<Option<PortfolioAdjustment>> {
        let was_manual = self.is_manual();
        self.valuation_mode = ValuationMode::Auto;
        self.recalculate_totals(positions, now)?;

        Ok(was_manual.then(|| {
            PortfolioAdjustment::new(
                &self.id,
                AdjustmentKind::SwitchToAuto,
                None,
                Some(self.totals),
                now,
            )
        }))
    }

    fn recalculate_totals(&mut self, positions: &[Position], now: NaiveDateTime) -> Result<()> {
        let owned: Vec<Position> = positions
            .iter()
            .filter(|p| p.portfolio_id == self.id)
            .cloned()
            .collect();
        if owned.len() != positions.len() {
            return Err(Error::Unexpected(format!(
                "Recalculation of portfolio {} received positions of another portfolio",
                self.id
            )));
        }
        self.totals = recalculate(self.currency, &owned)?.rounded_for_persistence();
        self.updated_at = now;
        Ok(())
    }
}

/// Input model for creating a new portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: Currency,
}

impl NewPortfolio {
    /// Validates the new portfolio data.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::invalid_input("User ID is required"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("Portfolio name cannot be empty"));
        }
        Ok(())
    }

    /// Validates and builds an empty AUTO portfolio.
    pub fn into_portfolio(self, id: String, now: NaiveDateTime) -> Result<Portfolio> {
        self.validate()?;
        Ok(Portfolio {
            id: self.id.unwrap_or(id),
            user_id: self.user_id,
            name: self.name.trim().to_string(),
            description: self.description,
            currency: self.currency,
            valuation_mode: ValuationMode::Auto,
            totals: AggregateTotals::zero(self.currency),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Input model for editing portfolio metadata.
///
/// Currency, mode and totals are not editable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl PortfolioUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("Portfolio name cannot be empty"));
        }
        Ok(())
    }
}

/// Operator-supplied totals for MANUAL mode, in the portfolio currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualTotals {
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_gain: Decimal,
}

impl ManualTotals {
    pub fn new(total_value: Decimal, total_invested: Decimal, total_gain: Decimal) -> Self {
        Self {
            total_value,
            total_invested,
            total_gain,
        }
    }

    /// Builds totals from floating point input, rejecting NaN and infinities.
    pub fn from_f64(total_value: f64, total_invested: f64, total_gain: f64) -> Result<Self> {
        Ok(Self {
            total_value: finite_decimal("total_value", total_value)?,
            total_invested: finite_decimal("total_invested", total_invested)?,
            total_gain: finite_decimal("total_gain", total_gain)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_value.is_sign_negative() && !self.total_value.is_zero() {
            return Err(Error::InvalidAdjustment(format!(
                "Total value cannot be negative (got {})",
                self.total_value
            )));
        }
        if self.total_invested.is_sign_negative() && !self.total_invested.is_zero() {
            return Err(Error::InvalidAdjustment(format!(
                "Total invested cannot be negative (got {})",
                self.total_invested
            )));
        }
        Ok(())
    }
}

fn finite_decimal(field: &str, value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(Error::InvalidAdjustment(format!(
            "{} must be a finite number (got {})",
            field, value
        )));
    }
    Decimal::from_f64(value).ok_or_else(|| {
        Error::InvalidAdjustment(format!("{} is out of range (got {})", field, value))
    })
}

/// Kind of audit record kept for a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    ManualTotals,
    SwitchToAuto,
    DeferredPositionChange,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::ManualTotals => "MANUAL_TOTALS",
            AdjustmentKind::SwitchToAuto => "SWITCH_TO_AUTO",
            AdjustmentKind::DeferredPositionChange => "DEFERRED_POSITION_CHANGE",
        }
    }
}

impl FromStr for AdjustmentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MANUAL_TOTALS" => Ok(AdjustmentKind::ManualTotals),
            "SWITCH_TO_AUTO" => Ok(AdjustmentKind::SwitchToAuto),
            "DEFERRED_POSITION_CHANGE" => Ok(AdjustmentKind::DeferredPositionChange),
            other => Err(Error::invalid_input(format!(
                "Unknown adjustment kind '{}'",
                other
            ))),
        }
    }
}

/// Audit record of a mode switch, a manual override or a position change that
/// MANUAL mode did not fold into the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAdjustment {
    pub id: String,
    pub portfolio_id: String,
    pub kind: AdjustmentKind,
    pub delta: Option<PositionDelta>,
    /// Totals in effect after the adjustment
    pub totals: Option<AggregateTotals>,
    pub created_at: NaiveDateTime,
}

impl PortfolioAdjustment {
    pub fn new(
        portfolio_id: &str,
        kind: AdjustmentKind,
        delta: Option<PositionDelta>,
        totals: Option<AggregateTotals>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.to_string(),
            kind,
            delta,
            totals,
            created_at,
        }
    }
}
