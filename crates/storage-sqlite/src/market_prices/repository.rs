use diesel::prelude::*;
use std::sync::Arc;

use super::model::MarketPriceDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::market_prices;
use brokerage_core::errors::Result;
use brokerage_core::market_prices::{MarketPrice, MarketPriceRepositoryTrait};

pub struct MarketPriceRepository {
    pool: Arc<DbPool>,
}

impl MarketPriceRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl MarketPriceRepositoryTrait for MarketPriceRepository {
    fn get_price(&self, symbol: &str) -> Result<Option<MarketPrice>> {
        let mut conn = get_connection(&self.pool)?;
        market_prices::table
            .find(symbol)
            .select(MarketPriceDB::as_select())
            .first::<MarketPriceDB>(&mut conn)
            .optional()
            .into_core()?
            .map(MarketPrice::try_from)
            .transpose()
    }

    fn list_prices(&self) -> Result<Vec<MarketPrice>> {
        let mut conn = get_connection(&self.pool)?;
        market_prices::table
            .select(MarketPriceDB::as_select())
            .order(market_prices::symbol.asc())
            .load::<MarketPriceDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(MarketPrice::try_from)
            .collect()
    }
}
