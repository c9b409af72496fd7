//! Database models for portfolios and their adjustment trail.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::utils::{parse_code, parse_currency, parse_decimal, parse_money};
use brokerage_core::errors::{Error, Result};
use brokerage_core::money::Currency;
use brokerage_core::portfolios::{Portfolio, PortfolioAdjustment};
use brokerage_core::positions::PositionDelta;
use brokerage_core::valuation::AggregateTotals;

/// Database model for portfolios
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PortfolioDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub valuation_mode: String,
    pub total_value: String,
    pub total_invested: String,
    pub total_gain: String,
    pub gain_percentage: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Portfolio> for PortfolioDB {
    fn from(domain: &Portfolio) -> Self {
        Self {
            id: domain.id.clone(),
            user_id: domain.user_id.clone(),
            name: domain.name.clone(),
            description: domain.description.clone(),
            currency: domain.currency.code().to_string(),
            valuation_mode: domain.valuation_mode.as_str().to_string(),
            total_value: domain.totals.total_value.amount().to_string(),
            total_invested: domain.totals.total_invested.amount().to_string(),
            total_gain: domain.totals.total_gain.amount().to_string(),
            gain_percentage: domain.totals.gain_percentage.to_string(),
            is_active: domain.is_active,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

impl TryFrom<PortfolioDB> for Portfolio {
    type Error = Error;

    fn try_from(db: PortfolioDB) -> Result<Self> {
        let currency = parse_currency(&db.currency)?;
        Ok(Self {
            totals: AggregateTotals {
                total_value: parse_money(&db.total_value, currency, "total_value")?,
                total_invested: parse_money(&db.total_invested, currency, "total_invested")?,
                total_gain: parse_money(&db.total_gain, currency, "total_gain")?,
                gain_percentage: parse_decimal(&db.gain_percentage, "gain_percentage")?,
            },
            valuation_mode: parse_code(&db.valuation_mode)?,
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            description: db.description,
            currency,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

/// Database model for portfolio adjustments. The delta and totals of the
/// domain record are flattened into nullable columns.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolio_adjustments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioAdjustmentDB {
    pub id: String,
    pub portfolio_id: String,
    pub kind: String,
    pub position_id: Option<String>,
    pub change_kind: Option<String>,
    pub quantity_delta: Option<String>,
    pub value_delta: Option<String>,
    pub invested_delta: Option<String>,
    pub total_value: Option<String>,
    pub total_invested: Option<String>,
    pub total_gain: Option<String>,
    pub gain_percentage: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<&PortfolioAdjustment> for PortfolioAdjustmentDB {
    fn from(domain: &PortfolioAdjustment) -> Self {
        let delta = domain.delta.as_ref();
        let totals = domain.totals.as_ref();
        Self {
            id: domain.id.clone(),
            portfolio_id: domain.portfolio_id.clone(),
            kind: domain.kind.as_str().to_string(),
            position_id: delta.map(|d| d.position_id.clone()),
            change_kind: delta.map(|d| d.kind.as_str().to_string()),
            quantity_delta: delta.map(|d| d.quantity_delta.to_string()),
            value_delta: delta.map(|d| d.value_delta.to_string()),
            invested_delta: delta.map(|d| d.invested_delta.to_string()),
            total_value: totals.map(|t| t.total_value.amount().to_string()),
            total_invested: totals.map(|t| t.total_invested.amount().to_string()),
            total_gain: totals.map(|t| t.total_gain.amount().to_string()),
            gain_percentage: totals.map(|t| t.gain_percentage.to_string()),
            created_at: domain.created_at,
        }
    }
}

impl PortfolioAdjustmentDB {
    /// Adjustment totals are stored without a currency; they are always in
    /// the owning portfolio's currency.
    pub fn into_domain(self, currency: Currency) -> Result<PortfolioAdjustment> {
        let delta = match (
            self.position_id,
            self.change_kind,
            self.quantity_delta,
            self.value_delta,
            self.invested_delta,
        ) {
            (Some(position_id), Some(kind), Some(quantity), Some(value), Some(invested)) => {
                Some(PositionDelta {
                    position_id,
                    kind: parse_code(&kind)?,
                    quantity_delta: parse_decimal(&quantity, "quantity_delta")?,
                    value_delta: parse_decimal(&value, "value_delta")?,
                    invested_delta: parse_decimal(&invested, "invested_delta")?,
                })
            }
            _ => None,
        };

        let totals = match (
            self.total_value,
            self.total_invested,
            self.total_gain,
            self.gain_percentage,
        ) {
            (Some(value), Some(invested), Some(gain), Some(percentage)) => Some(AggregateTotals {
                total_value: parse_money(&value, currency, "total_value")?,
                total_invested: parse_money(&invested, currency, "total_invested")?,
                total_gain: parse_money(&gain, currency, "total_gain")?,
                gain_percentage: parse_decimal(&percentage, "gain_percentage")?,
            }),
            _ => None,
        };

        Ok(PortfolioAdjustment {
            id: self.id,
            portfolio_id: self.portfolio_id,
            kind: parse_code(&self.kind)?,
            delta,
            totals,
            created_at: self.created_at,
        })
    }
}

