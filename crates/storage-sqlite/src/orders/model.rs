//! Database models for orders.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::utils::{
    parse_code, parse_currency, parse_decimal, parse_money, parse_optional_decimal,
};
use brokerage_core::errors::{Error, Result};
use brokerage_core::orders::Order;

/// Database model for orders
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct OrderDB {
    pub id: String,
    pub user_id: String,
    pub portfolio_id: String,
    pub investment_type: String,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: String,
    pub currency: String,
    pub price: String,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub position_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub rejected_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
}

impl From<&Order> for OrderDB {
    fn from(domain: &Order) -> Self {
        Self {
            id: domain.id.clone(),
            user_id: domain.user_id.clone(),
            portfolio_id: domain.portfolio_id.clone(),
            investment_type: domain.investment_type.as_str().to_string(),
            name: domain.name.clone(),
            symbol: domain.symbol.clone(),
            quantity: domain.quantity.to_string(),
            currency: domain.price.currency().code().to_string(),
            price: domain.price.amount().to_string(),
            maturity_date: domain.maturity_date,
            interest_rate: domain.interest_rate.map(|r| r.to_string()),
            status: domain.status.as_str().to_string(),
            rejection_reason: domain.rejection_reason.clone(),
            position_id: domain.position_id.clone(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
            approved_at: domain.approved_at,
            rejected_at: domain.rejected_at,
            closed_at: domain.closed_at,
        }
    }
}

impl TryFrom<OrderDB> for Order {
    type Error = Error;

    fn try_from(db: OrderDB) -> Result<Self> {
        let currency = parse_currency(&db.currency)?;
        Ok(Self {
            investment_type: parse_code(&db.investment_type)?,
            quantity: parse_decimal(&db.quantity, "quantity")?,
            price: parse_money(&db.price, currency, "price")?,
            interest_rate: parse_optional_decimal(db.interest_rate.as_deref(), "interest_rate")?,
            status: parse_code(&db.status)?,
            id: db.id,
            user_id: db.user_id,
            portfolio_id: db.portfolio_id,
            name: db.name,
            symbol: db.symbol,
            maturity_date: db.maturity_date,
            rejection_reason: db.rejection_reason,
            position_id: db.position_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
            approved_at: db.approved_at,
            rejected_at: db.rejected_at,
            closed_at: db.closed_at,
        })
    }
}
