//! Order domain models and the order lifecycle state machine.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::money::Money;
use crate::positions::{InvestmentType, NewPosition, Position};

/// Lifecycle state shared by orders and the positions created from them.
///
/// ```text
/// PENDING --approve--> ACTIVE --complete--> COMPLETED
///    |                    \----mature-----> MATURED
///    \-----reject-----> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Cancelled,
    Matured,
}

/// Admin or time-driven action on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Approve,
    Reject,
    Complete,
    Mature,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Approve => "approve",
            OrderAction::Reject => "reject",
            OrderAction::Complete => "complete",
            OrderAction::Mature => "mature",
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Active => "ACTIVE",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Matured => "MATURED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Matured
        )
    }

    /// The state reached by applying `action`, or `None` if the transition is not allowed.
    pub fn transition(self, action: OrderAction) -> Option<OrderStatus> {
        match (self, action) {
            (OrderStatus::Pending, OrderAction::Approve) => Some(OrderStatus::Active),
            (OrderStatus::Pending, OrderAction::Reject) => Some(OrderStatus::Cancelled),
            (OrderStatus::Active, OrderAction::Complete) => Some(OrderStatus::Completed),
            (OrderStatus::Active, OrderAction::Mature) => Some(OrderStatus::Matured),
            _ => None,
        }
    }

    /// Like [`transition`](Self::transition) but fails with `InvalidOrderState`.
    pub fn ensure_transition(self, entity_id: &str, action: OrderAction) -> Result<OrderStatus> {
        self.transition(action)
            .ok_or_else(|| Error::InvalidOrderState {
                entity_id: entity_id.to_string(),
                status: self,
                action: action.as_str(),
            })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "ACTIVE" => Ok(OrderStatus::Active),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "MATURED" => Ok(OrderStatus::Matured),
            other => Err(Error::invalid_input(format!(
                "Unknown order status '{}'",
                other
            ))),
        }
    }
}

/// A client's request to acquire an investment, awaiting admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub portfolio_id: String,
    pub investment_type: InvestmentType,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    /// Requested unit price
    pub price: Money,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
    pub status: OrderStatus,
    pub rejection_reason: Option<String>,
    /// Position created on approval
    pub position_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub rejected_at: Option<NaiveDateTime>,
    /// When the order reached COMPLETED or MATURED
    pub closed_at: Option<NaiveDateTime>,
}

impl Order {
    /// Builds the position this order turns into once approved.
    pub fn to_new_position(&self, purchase_date: NaiveDate) -> NewPosition {
        NewPosition {
            id: None,
            portfolio_id: self.portfolio_id.clone(),
            order_id: Some(self.id.clone()),
            investment_type: self.investment_type,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            purchase_price: self.price,
            current_price: None,
            purchase_date,
            maturity_date: self.maturity_date,
            interest_rate: self.interest_rate,
            status: Some(OrderStatus::Active),
        }
    }

    pub fn approve(&mut self, position: &Position, now: NaiveDateTime) -> Result<()> {
        self.status = self.status.ensure_transition(&self.id, OrderAction::Approve)?;
        self.position_id = Some(position.id.clone());
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>, now: NaiveDateTime) -> Result<()> {
        self.status = self.status.ensure_transition(&self.id, OrderAction::Reject)?;
        self.rejection_reason = reason;
        self.rejected_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves an ACTIVE order to COMPLETED or MATURED.
    pub fn close(&mut self, action: OrderAction, now: NaiveDateTime) -> Result<()> {
        if !matches!(action, OrderAction::Complete | OrderAction::Mature) {
            return Err(Error::invalid_input(format!(
                "'{}' does not close an order",
                action.as_str()
            )));
        }
        self.status = self.status.ensure_transition(&self.id, action)?;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Input model for submitting a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub portfolio_id: String,
    pub investment_type: InvestmentType,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub price: Money,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
}

impl NewOrder {
    /// Validates the new order data.
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity(format!(
                "Order quantity must be positive (got {})",
                self.quantity
            )));
        }
        if !self.price.is_positive() {
            return Err(Error::invalid_input(format!(
                "Order price must be positive (got {})",
                self.price
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("Order name cannot be empty"));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::invalid_input("User ID is required"));
        }
        if let Some(rate) = self.interest_rate {
            if rate < Decimal::ZERO {
                return Err(Error::invalid_input("Interest rate cannot be negative"));
            }
        }
        Ok(())
    }

    /// Validates and builds a PENDING order.
    pub fn into_order(self, id: String, now: NaiveDateTime) -> Result<Order> {
        self.validate()?;
        Ok(Order {
            id: self.id.unwrap_or(id),
            user_id: self.user_id,
            portfolio_id: self.portfolio_id,
            investment_type: self.investment_type,
            name: self.name,
            symbol: self.symbol,
            quantity: self.quantity,
            price: self.price,
            maturity_date: self.maturity_date,
            interest_rate: self.interest_rate,
            status: OrderStatus::Pending,
            rejection_reason: None,
            position_id: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
            rejected_at: None,
            closed_at: None,
        })
    }
}
