//! Order repository and service traits.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::orders_model::{NewOrder, Order, OrderStatus};
use crate::errors::Result;

/// Read access to stored orders. Writes go through the ledger.
pub trait OrderRepositoryTrait: Send + Sync {
    fn get_by_id(&self, order_id: &str) -> Result<Order>;

    /// Lists orders, oldest first, optionally filtered by status and portfolio.
    fn list(&self, status: Option<OrderStatus>, portfolio_id: Option<&str>) -> Result<Vec<Order>>;
}

/// Trait defining the contract for order lifecycle operations.
///
/// Every transition is a compare-and-swap on the stored status. Losing a race
/// against a concurrent transition fails with `InvalidOrderState`, exactly as
/// if the precondition had never held.
#[async_trait]
pub trait OrderServiceTrait: Send + Sync {
    /// Stores a new PENDING order.
    async fn submit_order(&self, new_order: NewOrder) -> Result<Order>;

    /// PENDING -> ACTIVE. Creates the position and updates the portfolio.
    async fn approve(&self, order_id: &str) -> Result<Order>;

    /// PENDING -> CANCELLED. No position is touched.
    async fn reject(&self, order_id: &str, reason: Option<String>) -> Result<Order>;

    /// ACTIVE -> COMPLETED, together with the linked position.
    async fn complete(&self, order_id: &str) -> Result<Order>;

    /// ACTIVE -> MATURED, together with the linked position.
    async fn mature(&self, order_id: &str) -> Result<Order>;

    /// Matures every ACTIVE order whose position matures on or before `as_of`.
    async fn mature_due_orders(&self, as_of: NaiveDate) -> Result<Vec<Order>>;

    fn get_order(&self, order_id: &str) -> Result<Order>;

    fn list_orders(
        &self,
        status: Option<OrderStatus>,
        portfolio_id: Option<&str>,
    ) -> Result<Vec<Order>>;
}
