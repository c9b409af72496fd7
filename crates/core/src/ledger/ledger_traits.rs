use std::any::Any;

use async_trait::async_trait;

use crate::errors::{Error, Result};
use crate::market_prices::MarketPrice;
use crate::orders::{Order, OrderStatus};
use crate::portfolios::{Portfolio, PortfolioAdjustment};
use crate::positions::Position;

/// Mutable view of the ledger inside one atomic write.
///
/// Lookups by id fail with `DatabaseError::NotFound` when the record is missing.
pub trait LedgerWriter {
    fn get_portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio>;
    fn list_portfolios_for_user(&mut self, user_id: &str) -> Result<Vec<Portfolio>>;
    fn insert_portfolio(&mut self, portfolio: &Portfolio) -> Result<()>;
    fn update_portfolio(&mut self, portfolio: &Portfolio) -> Result<()>;
    /// Fails with a foreign key violation while positions still reference it.
    fn delete_portfolio(&mut self, portfolio_id: &str) -> Result<usize>;

    fn get_position(&mut self, position_id: &str) -> Result<Position>;
    fn load_positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>>;
    fn list_positions_by_symbol(&mut self, symbol: &str) -> Result<Vec<Position>>;
    fn insert_position(&mut self, position: &Position) -> Result<()>;
    fn update_position(&mut self, position: &Position) -> Result<()>;
    fn delete_position(&mut self, position_id: &str) -> Result<usize>;

    fn get_order(&mut self, order_id: &str) -> Result<Order>;
    fn list_orders_by_status(&mut self, status: OrderStatus) -> Result<Vec<Order>>;
    fn insert_order(&mut self, order: &Order) -> Result<()>;
    /// Stores `order` only if the stored status still equals `expected`.
    /// Returns whether the write happened.
    fn compare_and_set_order(&mut self, order: &Order, expected: OrderStatus) -> Result<bool>;

    fn insert_adjustment(&mut self, adjustment: &PortfolioAdjustment) -> Result<()>;

    fn get_market_price(&mut self, symbol: &str) -> Result<Option<MarketPrice>>;
    fn upsert_market_price(&mut self, price: &MarketPrice) -> Result<()>;

    fn get_setting(&mut self, setting_key: &str) -> Result<Option<String>>;
}

/// Type-erased job accepted by [`LedgerStoreTrait::execute_boxed`].
pub type LedgerJob =
    Box<dyn FnOnce(&mut dyn LedgerWriter) -> Result<Box<dyn Any + Send>> + Send + 'static>;

/// Executes jobs atomically and one at a time.
#[async_trait]
pub trait LedgerStoreTrait: Send + Sync {
    async fn execute_boxed(&self, job: LedgerJob) -> Result<Box<dyn Any + Send>>;
}

impl dyn LedgerStoreTrait {
    /// Runs `f` as one atomic write and returns its typed result.
    pub async fn execute<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let job: LedgerJob = Box::new(move |writer| {
            f(writer).map(|value| Box::new(value) as Box<dyn Any + Send>)
        });
        let result = self.execute_boxed(job).await?;
        result
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::Unexpected("Ledger job returned an unexpected type".to_string()))
    }
}
