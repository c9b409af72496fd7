//! `LedgerWriter` over the writer actor's connection.

use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::errors::IntoCore;
use crate::market_prices::MarketPriceDB;
use crate::orders::OrderDB;
use crate::portfolios::{PortfolioAdjustmentDB, PortfolioDB};
use crate::positions::PositionDB;
use crate::schema::{
    app_settings, market_prices, orders, portfolio_adjustments, portfolios, positions,
};
use brokerage_core::errors::{DatabaseError, Error, Result};
use brokerage_core::ledger::LedgerWriter;
use brokerage_core::market_prices::MarketPrice;
use brokerage_core::orders::{Order, OrderStatus};
use brokerage_core::portfolios::{Portfolio, PortfolioAdjustment};
use brokerage_core::positions::Position;

/// Runs inside the immediate transaction opened by the writer actor, so every
/// read here sees the job's own uncommitted writes.
pub struct SqliteLedgerWriter<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> SqliteLedgerWriter<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self { conn }
    }
}

fn missing(kind: &str, id: &str) -> Error {
    Error::Database(DatabaseError::NotFound(format!(
        "{} {} not found",
        kind, id
    )))
}

fn ensure_updated(rows: usize, kind: &str, id: &str) -> Result<()> {
    if rows == 0 {
        return Err(missing(kind, id));
    }
    Ok(())
}

impl LedgerWriter for SqliteLedgerWriter<'_> {
    fn get_portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio> {
        portfolios::table
            .find(portfolio_id)
            .select(PortfolioDB::as_select())
            .first::<PortfolioDB>(self.conn)
            .optional()
            .into_core()?
            .ok_or_else(|| missing("Portfolio", portfolio_id))?
            .try_into()
    }

    fn list_portfolios_for_user(&mut self, user_id: &str) -> Result<Vec<Portfolio>> {
        portfolios::table
            .filter(portfolios::user_id.eq(user_id))
            .select(PortfolioDB::as_select())
            .order((portfolios::created_at.asc(), portfolios::id.asc()))
            .load::<PortfolioDB>(self.conn)
            .into_core()?
            .into_iter()
            .map(Portfolio::try_from)
            .collect()
    }

    fn insert_portfolio(&mut self, portfolio: &Portfolio) -> Result<()> {
        diesel::insert_into(portfolios::table)
            .values(&PortfolioDB::from(portfolio))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn update_portfolio(&mut self, portfolio: &Portfolio) -> Result<()> {
        let rows = diesel::update(portfolios::table.find(&portfolio.id))
            .set(&PortfolioDB::from(portfolio))
            .execute(self.conn)
            .into_core()?;
        ensure_updated(rows, "Portfolio", &portfolio.id)
    }

    fn delete_portfolio(&mut self, portfolio_id: &str) -> Result<usize> {
        diesel::delete(portfolios::table.find(portfolio_id))
            .execute(self.conn)
            .into_core()
    }

    fn get_position(&mut self, position_id: &str) -> Result<Position> {
        positions::table
            .find(position_id)
            .select(PositionDB::as_select())
            .first::<PositionDB>(self.conn)
            .optional()
            .into_core()?
            .ok_or_else(|| missing("Position", position_id))?
            .try_into()
    }

    fn load_positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>> {
        positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .select(PositionDB::as_select())
            .order((positions::created_at.asc(), positions::id.asc()))
            .load::<PositionDB>(self.conn)
            .into_core()?
            .into_iter()
            .map(Position::try_from)
            .collect()
    }

    fn list_positions_by_symbol(&mut self, symbol: &str) -> Result<Vec<Position>> {
        positions::table
            .filter(positions::symbol.eq(symbol))
            .select(PositionDB::as_select())
            .order((positions::created_at.asc(), positions::id.asc()))
            .load::<PositionDB>(self.conn)
            .into_core()?
            .into_iter()
            .map(Position::try_from)
            .collect()
    }

    fn insert_position(&mut self, position: &Position) -> Result<()> {
        diesel::insert_into(positions::table)
            .values(&PositionDB::from(position))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn update_position(&mut self, position: &Position) -> Result<()> {
        let rows = diesel::update(positions::table.find(&position.id))
            .set(&PositionDB::from(position))
            .execute(self.conn)
            .into_core()?;
        ensure_updated(rows, "Position", &position.id)
    }

    fn delete_position(&mut self, position_id: &str) -> Result<usize> {
        diesel::delete(positions::table.find(position_id))
            .execute(self.conn)
            .into_core()
    }

    fn get_order(&mut self, order_id: &str) -> Result<Order> {
        orders::table
            .find(order_id)
            .select(OrderDB::as_select())
            .first::<OrderDB>(self.conn)
            .optional()
            .into_core()?
            .ok_or_else(|| missing("Order", order_id))?
            .try_into()
    }

    fn list_orders_by_status(&mut self, status: OrderStatus) -> Result<Vec<Order>> {
        orders::table
            .filter(orders::status.eq(status.as_str()))
            .select(OrderDB::as_select())
            .order((orders::created_at.asc(), orders::id.asc()))
            .load::<OrderDB>(self.conn)
            .into_core()?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    fn insert_order(&mut self, order: &Order) -> Result<()> {
        diesel::insert_into(orders::table)
            .values(&OrderDB::from(order))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn compare_and_set_order(&mut self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let rows = diesel::update(
            orders::table
                .filter(orders::id.eq(&order.id))
                .filter(orders::status.eq(expected.as_str())),
        )
        .set(&OrderDB::from(order))
        .execute(self.conn)
        .into_core()?;
        Ok(rows == 1)
    }

    fn insert_adjustment(&mut self, adjustment: &PortfolioAdjustment) -> Result<()> {
        diesel::insert_into(portfolio_adjustments::table)
            .values(&PortfolioAdjustmentDB::from(adjustment))
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn get_market_price(&mut self, symbol: &str) -> Result<Option<MarketPrice>> {
        market_prices::table
            .find(symbol)
            .select(MarketPriceDB::as_select())
            .first::<MarketPriceDB>(self.conn)
            .optional()
            .into_core()?
            .map(MarketPrice::try_from)
            .transpose()
    }

    fn upsert_market_price(&mut self, price: &MarketPrice) -> Result<()> {
        let row = MarketPriceDB::from(price);
        diesel::insert_into(market_prices::table)
            .values(&row)
            .on_conflict(market_prices::symbol)
            .do_update()
            .set(&row)
            .execute(self.conn)
            .into_core()?;
        Ok(())
    }

    fn get_setting(&mut self, setting_key: &str) -> Result<Option<String>> {
        app_settings::table
            .filter(app_settings::setting_key.eq(setting_key))
            .select(app_settings::setting_value)
            .first::<String>(self.conn)
            .optional()
            .into_core()
    }
}
