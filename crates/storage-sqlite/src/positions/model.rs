//! Database models for positions.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::utils::{
    parse_code, parse_currency, parse_decimal, parse_money, parse_optional_decimal,
};
use brokerage_core::errors::{Error, Result};
use brokerage_core::positions::Position;

/// Database model for positions. Both prices share the `currency` column.
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PositionDB {
    pub id: String,
    pub portfolio_id: String,
    pub order_id: Option<String>,
    pub investment_type: String,
    pub name: String,
    pub symbol: Option<String>,
    pub quantity: String,
    pub currency: String,
    pub purchase_price: String,
    pub current_price: String,
    pub purchase_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Position> for PositionDB {
    fn from(domain: &Position) -> Self {
        Self {
            id: domain.id.clone(),
            portfolio_id: domain.portfolio_id.clone(),
            order_id: domain.order_id.clone(),
            investment_type: domain.investment_type.as_str().to_string(),
            name: domain.name.clone(),
            symbol: domain.symbol.clone(),
            quantity: domain.quantity.to_string(),
            currency: domain.currency().code().to_string(),
            purchase_price: domain.purchase_price.amount().to_string(),
            current_price: domain.current_price.amount().to_string(),
            purchase_date: domain.purchase_date,
            maturity_date: domain.maturity_date,
            interest_rate: domain.interest_rate.map(|r| r.to_string()),
            status: domain.status.as_str().to_string(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

impl TryFrom<PositionDB> for Position {
    type Error = Error;

    fn try_from(db: PositionDB) -> Result<Self> {
        let currency = parse_currency(&db.currency)?;
        Ok(Self {
            investment_type: parse_code(&db.investment_type)?,
            quantity: parse_decimal(&db.quantity, "quantity")?,
            purchase_price: parse_money(&db.purchase_price, currency, "purchase_price")?,
            current_price: parse_money(&db.current_price, currency, "current_price")?,
            interest_rate: parse_optional_decimal(db.interest_rate.as_deref(), "interest_rate")?,
            status: parse_code(&db.status)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            order_id: db.order_id,
            name: db.name,
            symbol: db.symbol,
            purchase_date: db.purchase_date,
            maturity_date: db.maturity_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
