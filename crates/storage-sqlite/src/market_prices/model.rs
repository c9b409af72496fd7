//! Database model for market prices.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::utils::{parse_currency, parse_money};
use brokerage_core::errors::{Error, Result};
use brokerage_core::market_prices::MarketPrice;

/// Latest price per symbol
#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::market_prices)]
#[diesel(primary_key(symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketPriceDB {
    pub symbol: String,
    pub price: String,
    pub currency: String,
    pub updated_at: NaiveDateTime,
}

impl From<&MarketPrice> for MarketPriceDB {
    fn from(domain: &MarketPrice) -> Self {
        Self {
            symbol: domain.symbol.clone(),
            price: domain.price.amount().to_string(),
            currency: domain.price.currency().code().to_string(),
            updated_at: domain.updated_at,
        }
    }
}

impl TryFrom<MarketPriceDB> for MarketPrice {
    type Error = Error;

    fn try_from(db: MarketPriceDB) -> Result<Self> {
        let currency = parse_currency(&db.currency)?;
        Ok(Self {
            price: parse_money(&db.price, currency, "price")?,
            symbol: db.symbol,
            updated_at: db.updated_at,
        })
    }
}
