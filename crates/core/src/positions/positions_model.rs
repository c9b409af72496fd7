//! Position domain models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::money::{percentage_of, Currency, Money};
use crate::orders::OrderStatus;

/// Kind of instrument a position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestmentType {
    Stock,
    Bond,
    MutualFund,
    Savings,
    FixedDeposit,
    TermDeposit,
    Ipo,
    Other,
}

impl InvestmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Stock => "STOCK",
            InvestmentType::Bond => "BOND",
            InvestmentType::MutualFund => "MUTUAL_FUND",
            InvestmentType::Savings => "SAVINGS",
            InvestmentType::FixedDeposit => "FIXED_DEPOSIT",
            InvestmentType::TermDeposit => "TERM_DEPOSIT",
            InvestmentType::Ipo => "IPO",
            InvestmentType::Other => "OTHER",
        }
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STOCK" => Ok(InvestmentType::Stock),
            "BOND" => Ok(InvestmentType::Bond),
            "MUTUAL_FUND" => Ok(InvestmentType::MutualFund),
            "SAVINGS" => Ok(InvestmentType::Savings),
            "FIXED_DEPOSIT" => Ok(InvestmentType::FixedDeposit),
            "TERM_DEPOSIT" => Ok(InvestmentType::TermDeposit),
            "IPO" => Ok(InvestmentType::Ipo),
            "OTHER" => Ok(InvestmentType::Other),
            other => Err(Error::invalid_input(format!(
                "Unknown investment type '{}'",
                other
            ))),
        }
    }
}

/// A single holding inside a portfolio.
///
/// Value and gain figures are never stored; they are derived from quantity and
/// prices on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub portfolio_id: String,
    /// Order this position was created from, if any
    pub order_id: Option<String>,
    pub investment_type: InvestmentType,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub purchase_price: Money,
    pub current_price: Money,
    pub purchase_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    /// Annual rate in percent, for deposits and bonds
    pub interest_rate: Option<Decimal>,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Derived figures of a position, computed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub total_value: Money,
    pub cost_basis: Money,
    pub total_gain: Money,
    pub gain_percentage: Decimal,
}

impl Position {
    pub fn currency(&self) -> Currency {
        self.purchase_price.currency()
    }

    /// `quantity × current_price`
    pub fn total_value(&self) -> Money {
        self.current_price.times(self.quantity)
    }

    /// `quantity × purchase_price`
    pub fn cost_basis(&self) -> Money {
        self.purchase_price.times(self.quantity)
    }

    pub fn total_gain(&self) -> Money {
        Money::new(
            self.total_value().amount() - self.cost_basis().amount(),
            self.currency(),
        )
    }

    /// Gain relative to cost basis, in percent. Zero when the cost basis is zero.
    pub fn gain_percentage(&self) -> Decimal {
        percentage_of(self.total_gain().amount(), self.cost_basis().amount())
    }

    pub fn valuation(&self) -> PositionValuation {
        PositionValuation {
            total_value: self.total_value(),
            cost_basis: self.cost_basis(),
            total_gain: self.total_gain(),
            gain_percentage: self.gain_percentage(),
        }
    }

    /// Whether this position contributes to portfolio totals.
    pub fn is_counted(&self) -> bool {
        self.status != OrderStatus::Cancelled
    }

    /// Applies an admin edit. Status is not editable here; it only moves
    /// through the order lifecycle.
    pub fn apply_update(&mut self, update: PositionUpdate, now: NaiveDateTime) -> Result<()> {
        validate_position_values(
            &update.name,
            update.quantity,
            &update.purchase_price,
            &update.current_price,
            self.purchase_date,
            update.maturity_date,
            update.interest_rate,
        )?;
        if update.purchase_price.currency() != self.currency() {
            return Err(Error::currency_mismatch(
                update.purchase_price.currency(),
                self.currency(),
            ));
        }

        self.name = update.name;
        self.symbol = update.symbol;
        self.quantity = update.quantity;
        self.purchase_price = update.purchase_price;
        self.current_price = update.current_price;
        self.maturity_date = update.maturity_date;
        self.interest_rate = update.interest_rate;
        self.updated_at = now;
        Ok(())
    }

    /// Re-prices the position from a feed or trade observation.
    pub fn set_current_price(&mut self, price: Money, now: NaiveDateTime) -> Result<()> {
        price.ensure_same_currency(&self.purchase_price)?;
        if price.is_negative() {
            return Err(Error::invalid_input("Current price cannot be negative"));
        }
        self.current_price = price;
        self.updated_at = now;
        Ok(())
    }
}

/// Input model for creating a position directly (admin creation or order approval).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub portfolio_id: String,
    pub order_id: Option<String>,
    pub investment_type: InvestmentType,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub purchase_price: Money,
    /// Defaults to the purchase price
    pub current_price: Option<Money>,
    pub purchase_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
    /// Defaults to ACTIVE
    pub status: Option<OrderStatus>,
}

impl NewPosition {
    /// Validates the new position data.
    pub fn validate(&self) -> Result<()> {
        if self.portfolio_id.trim().is_empty() {
            return Err(Error::invalid_input("Portfolio ID is required"));
        }
        if self.status == Some(OrderStatus::Cancelled) {
            return Err(Error::invalid_input(
                "A position cannot be created in the CANCELLED state",
            ));
        }
        let current_price = self.current_price.unwrap_or(self.purchase_price);
        validate_position_values(
            &self.name,
            self.quantity,
            &self.purchase_price,
            &current_price,
            self.purchase_date,
            self.maturity_date,
            self.interest_rate,
        )
    }

    /// Validates and builds the stored position.
    pub fn into_position(self, id: String, now: NaiveDateTime) -> Result<Position> {
        self.validate()?;
        Ok(Position {
            id: self.id.unwrap_or(id),
            portfolio_id: self.portfolio_id,
            order_id: self.order_id,
            investment_type: self.investment_type,
            name: self.name,
            symbol: self.symbol,
            quantity: self.quantity,
            current_price: self.current_price.unwrap_or(self.purchase_price),
            purchase_price: self.purchase_price,
            purchase_date: self.purchase_date,
            maturity_date: self.maturity_date,
            interest_rate: self.interest_rate,
            status: self.status.unwrap_or(OrderStatus::Active),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Input model for an admin edit of an existing position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub id: String,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub purchase_price: Money,
    pub current_price: Money,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
}

fn validate_position_values(
    name: &str,
    quantity: Decimal,
    purchase_price: &Money,
    current_price: &Money,
    purchase_date: NaiveDate,
    maturity_date: Option<NaiveDate>,
    interest_rate: Option<Decimal>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Position name cannot be empty"));
    }
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(Error::InvalidQuantity(format!(
            "Quantity cannot be negative (got {})",
            quantity
        )));
    }
    if !purchase_price.is_positive() {
        return Err(Error::invalid_input(format!(
            "Purchase price must be positive (got {})",
            purchase_price
        )));
    }
    current_price.ensure_same_currency(purchase_price)?;
    if current_price.is_negative() {
        return Err(Error::invalid_input(format!(
            "Current price cannot be negative (got {})",
            current_price
        )));
    }
    if let Some(maturity) = maturity_date {
        if maturity < purchase_date {
            return Err(Error::invalid_input(
                "Maturity date cannot precede the purchase date",
            ));
        }
    }
    if let Some(rate) = interest_rate {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(Error::invalid_input("Interest rate cannot be negative"));
        }
    }
    Ok(())
}

/// What happened to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionChangeKind {
    Added,
    Updated,
    Removed,
    PriceChanged,
    QuantityChanged,
    StatusChanged,
}

impl PositionChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionChangeKind::Added => "ADDED",
            PositionChangeKind::Updated => "UPDATED",
            PositionChangeKind::Removed => "REMOVED",
            PositionChangeKind::PriceChanged => "PRICE_CHANGED",
            PositionChangeKind::QuantityChanged => "QUANTITY_CHANGED",
            PositionChangeKind::StatusChanged => "STATUS_CHANGED",
        }
    }

    /// Classifies an in-place change by the fields it touched.
    pub fn of_edit(before: &Position, after: &Position) -> Self {
        let only_differs_in = |field: fn(&mut Position, &Position)| {
            let mut probe = after.clone();
            field(&mut probe, before);
            probe.updated_at = before.updated_at;
            probe == *before
        };

        if before.status != after.status {
            PositionChangeKind::StatusChanged
        } else if only_differs_in(|p, b| p.current_price = b.current_price) {
            PositionChangeKind::PriceChanged
        } else if only_differs_in(|p, b| p.quantity = b.quantity) {
            PositionChangeKind::QuantityChanged
        } else {
            PositionChangeKind::Updated
        }
    }
}

impl FromStr for PositionChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADDED" => Ok(PositionChangeKind::Added),
            "UPDATED" => Ok(PositionChangeKind::Updated),
            "REMOVED" => Ok(PositionChangeKind::Removed),
            "PRICE_CHANGED" => Ok(PositionChangeKind::PriceChanged),
            "QUANTITY_CHANGED" => Ok(PositionChangeKind::QuantityChanged),
            "STATUS_CHANGED" => Ok(PositionChangeKind::StatusChanged),
            other => Err(Error::invalid_input(format!(
                "Unknown position change kind '{}'",
                other
            ))),
        }
    }
}

/// The effect of one position mutation on portfolio totals.
///
/// Deltas only cover counted (non-cancelled) state, so a cancelled position
/// contributes nothing on either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDelta {
    pub position_id: String,
    pub kind: PositionChangeKind,
    pub quantity_delta: Decimal,
    pub value_delta: Decimal,
    pub invested_delta: Decimal,
}

impl PositionDelta {
    pub fn added(after: &Position) -> Self {
        Self::build(PositionChangeKind::Added, &after.id, None, Some(after))
    }

    pub fn removed(before: &Position) -> Self {
        Self::build(PositionChangeKind::Removed, &before.id, Some(before), None)
    }

    pub fn changed(kind: PositionChangeKind, before: &Position, after: &Position) -> Self {
        Self::build(kind, &after.id, Some(before), Some(after))
    }

    fn build(
        kind: PositionChangeKind,
        position_id: &str,
        before: Option<&Position>,
        after: Option<&Position>,
    ) -> Self {
        let (q0, v0, i0) = counted_figures(before);
        let (q1, v1, i1) = counted_figures(after);
        Self {
            position_id: position_id.to_string(),
            kind,
            quantity_delta: q1 - q0,
            value_delta: v1 - v0,
            invested_delta: i1 - i0,
        }
    }
}

fn counted_figures(position: Option<&Position>) -> (Decimal, Decimal, Decimal) {
    match position {
        Some(p) if p.is_counted() => (
            p.quantity,
            p.total_value().amount(),
            p.cost_basis().amount(),
        ),
        _ => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
    }
}
