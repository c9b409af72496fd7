use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{LedgerJob, LedgerStoreTrait, LedgerWriter};
use crate::errors::{DatabaseError, Error, Result};
use crate::market_prices::{MarketPrice, MarketPriceRepositoryTrait};
use crate::orders::{Order, OrderRepositoryTrait, OrderStatus};
use crate::portfolios::{Portfolio, PortfolioAdjustment, PortfolioRepositoryTrait};
use crate::positions::{Position, PositionRepositoryTrait};
use crate::settings::SettingsRepositoryTrait;

#[derive(Debug, Clone, Default)]
struct LedgerState {
    portfolios: BTreeMap<String, Portfolio>,
    positions: BTreeMap<String, Position>,
    orders: BTreeMap<String, Order>,
    adjustments: Vec<PortfolioAdjustment>,
    market_prices: BTreeMap<String, MarketPrice>,
    settings: BTreeMap<String, String>,
}

/// Ledger kept in process memory.
///
/// Jobs run under a mutex against a copy of the state; the copy replaces the
/// state only when the job succeeds. Enforces the same referential rules as
/// the SQLite schema. Suitable for tests and embedding without a database.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| Error::Unexpected("In-memory ledger lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStoreTrait for InMemoryLedgerStore {
    async fn execute_boxed(&self, job: LedgerJob) -> Result<Box<dyn Any + Send>> {
        let mut guard = self.lock()?;
        let mut draft = guard.clone();
        let result = job(&mut MemoryWriter { state: &mut draft })?;
        *guard = draft;
        Ok(result)
    }
}

struct MemoryWriter<'a> {
    state: &'a mut LedgerState,
}

fn missing(kind: &str, id: &str) -> Error {
    Error::not_found(format!("{} {} not found", kind, id))
}

fn duplicate(kind: &str, id: &str) -> Error {
    Error::Database(DatabaseError::UniqueViolation(format!(
        "{} {} already exists",
        kind, id
    )))
}

fn sorted_by_creation<T>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (NaiveDateTime, String),
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(key);
    items
}

impl LedgerState {
    fn portfolios_for(&self, user_id: Option<&str>) -> Vec<Portfolio> {
        sorted_by_creation(
            self.portfolios
                .values()
                .filter(|p| user_id.map_or(true, |u| p.user_id == u))
                .cloned(),
            |p| (p.created_at, p.id.clone()),
        )
    }

    fn positions_where(&self, predicate: impl Fn(&Position) -> bool) -> Vec<Position> {
        sorted_by_creation(
            self.positions.values().filter(|p| predicate(p)).cloned(),
            |p| (p.created_at, p.id.clone()),
        )
    }

    fn orders_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        sorted_by_creation(
            self.orders.values().filter(|o| predicate(o)).cloned(),
            |o| (o.created_at, o.id.clone()),
        )
    }
}

impl LedgerWriter for MemoryWriter<'_> {
    fn get_portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio> {
        self.state
            .portfolios
            .get(portfolio_id)
            .cloned()
            .ok_or_else(|| missing("Portfolio", portfolio_id))
    }

    fn list_portfolios_for_user(&mut self, user_id: &str) -> Result<Vec<Portfolio>> {
        Ok(self.state.portfolios_for(Some(user_id)))
    }

    fn insert_portfolio(&mut self, portfolio: &Portfolio) -> Result<()> {
        if self.state.portfolios.contains_key(&portfolio.id) {
            return Err(duplicate("Portfolio", &portfolio.id));
        }
        self.state
            .portfolios
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(())
    }

    fn update_portfolio(&mut self, portfolio: &Portfolio) -> Result<()> {
        match self.state.portfolios.get_mut(&portfolio.id) {
            Some(stored) => {
                *stored = portfolio.clone();
                Ok(())
            }
            None => Err(missing("Portfolio", &portfolio.id)),
        }
    }

    fn delete_portfolio(&mut self, portfolio_id: &str) -> Result<usize> {
        if self
            .state
            .positions
            .values()
            .any(|p| p.portfolio_id == portfolio_id)
        {
            return Err(Error::Database(DatabaseError::ForeignKeyViolation(format!(
                "Portfolio {} is still referenced by positions",
                portfolio_id
            ))));
        }
        if self.state.portfolios.remove(portfolio_id).is_none() {
            return Ok(0);
        }
        self.state.orders.retain(|_, o| o.portfolio_id != portfolio_id);
        self.state
            .adjustments
            .retain(|a| a.portfolio_id != portfolio_id);
        Ok(1)
    }

    fn get_position(&mut self, position_id: &str) -> Result<Position> {
        self.state
            .positions
            .get(position_id)
            .cloned()
            .ok_or_else(|| missing("Position", position_id))
    }

    fn load_positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>> {
        Ok(self.state.positions_where(|p| p.portfolio_id == portfolio_id))
    }

    fn list_positions_by_symbol(&mut self, symbol: &str) -> Result<Vec<Position>> {
        Ok(self
            .state
            .positions_where(|p| p.symbol.as_deref() == Some(symbol)))
    }

    fn insert_position(&mut self, position: &Position) -> Result<()> {
        if self.state.positions.contains_key(&position.id) {
            return Err(duplicate("Position", &position.id));
        }
        if !self.state.portfolios.contains_key(&position.portfolio_id) {
            return Err(Error::Database(DatabaseError::ForeignKeyViolation(format!(
                "Portfolio {} does not exist",
                position.portfolio_id
            ))));
        }
        self.state
            .positions
            .insert(position.id.clone(), position.clone());
        Ok(())
    }

    fn update_position(&mut self, position: &Position) -> Result<()> {
        match self.state.positions.get_mut(&position.id) {
            Some(stored) => {
                *stored = position.clone();
                Ok(())
            }
            None => Err(missing("Position", &position.id)),
        }
    }

    fn delete_position(&mut self, position_id: &str) -> Result<usize> {
        Ok(usize::from(self.state.positions.remove(position_id).is_some()))
    }

    fn get_order(&mut self, order_id: &str) -> Result<Order> {
        self.state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| missing("Order", order_id))
    }

    fn list_orders_by_status(&mut self, status: OrderStatus) -> Result<Vec<Order>> {
        Ok(self.state.orders_where(|o| o.status == status))
    }

    fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.state.orders.contains_key(&order.id) {
            return Err(duplicate("Order", &order.id));
        }
        if !self.state.portfolios.contains_key(&order.portfolio_id) {
            return Err(Error::Database(DatabaseError::ForeignKeyViolation(format!(
                "Portfolio {} does not exist",
                order.portfolio_id
            ))));
        }
        self.state.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn compare_and_set_order(&mut self, order: &Order, expected: OrderStatus) -> Result<bool> {
        match self.state.orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_adjustment(&mut self, adjustment: &PortfolioAdjustment) -> Result<()> {
        if !self.state.portfolios.contains_key(&adjustment.portfolio_id) {
            return Err(Error::Database(DatabaseError::ForeignKeyViolation(format!(
                "Portfolio {} does not exist",
                adjustment.portfolio_id
            ))));
        }
        self.state.adjustments.push(adjustment.clone());
        Ok(())
    }

    fn get_market_price(&mut self, symbol: &str) -> Result<Option<MarketPrice>> {
        Ok(self.state.market_prices.get(symbol).cloned())
    }

    fn upsert_market_price(&mut self, price: &MarketPrice) -> Result<()> {
        self.state
            .market_prices
            .insert(price.symbol.clone(), price.clone());
        Ok(())
    }

    fn get_setting(&mut self, setting_key: &str) -> Result<Option<String>> {
        Ok(self.state.settings.get(setting_key).cloned())
    }
}

impl PortfolioRepositoryTrait for InMemoryLedgerStore {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        self.lock()?
            .portfolios
            .get(portfolio_id)
            .cloned()
            .ok_or_else(|| missing("Portfolio", portfolio_id))
    }

    fn list(&self, user_id: Option<&str>) -> Result<Vec<Portfolio>> {
        Ok(self.lock()?.portfolios_for(user_id))
    }

    fn list_adjustments(&self, portfolio_id: &str) -> Result<Vec<PortfolioAdjustment>> {
        Ok(self
            .lock()?
            .adjustments
            .iter()
            .filter(|a| a.portfolio_id == portfolio_id)
            .cloned()
            .collect())
    }
}

impl PositionRepositoryTrait for InMemoryLedgerStore {
    fn get_by_id(&self, position_id: &str) -> Result<Position> {
        self.lock()?
            .positions
            .get(position_id)
            .cloned()
            .ok_or_else(|| missing("Position", position_id))
    }

    fn load_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        Ok(self
            .lock()?
            .positions_where(|p| p.portfolio_id == portfolio_id))
    }
}

impl OrderRepositoryTrait for InMemoryLedgerStore {
    fn get_by_id(&self, order_id: &str) -> Result<Order> {
        self.lock()?
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| missing("Order", order_id))
    }

    fn list(&self, status: Option<OrderStatus>, portfolio_id: Option<&str>) -> Result<Vec<Order>> {
        Ok(self.lock()?.orders_where(|o| {
            status.map_or(true, |s| o.status == s)
                && portfolio_id.map_or(true, |p| o.portfolio_id == p)
        }))
    }
}

impl MarketPriceRepositoryTrait for InMemoryLedgerStore {
    fn get_price(&self, symbol: &str) -> Result<Option<MarketPrice>> {
        Ok(self.lock()?.market_prices.get(symbol).cloned())
    }

    fn list_prices(&self) -> Result<Vec<MarketPrice>> {
        Ok(self.lock()?.market_prices.values().cloned().collect())
    }
}

#[async_trait]
impl SettingsRepositoryTrait for InMemoryLedgerStore {
    fn get_setting(&self, setting_key: &str) -> Result<String> {
        self.lock()?
            .settings
            .get(setting_key)
            .cloned()
            .ok_or_else(|| missing("Setting", setting_key))
    }

    fn get_settings(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .lock()?
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn update_setting(&self, setting_key: &str, setting_value: &str) -> Result<()> {
        self.lock()?
            .settings
            .insert(setting_key.to_string(), setting_value.to_string());
        Ok(())
    }
}
