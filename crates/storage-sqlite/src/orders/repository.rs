use diesel::prelude::*;
use std::sync::Arc;

use super::model::OrderDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::orders;
use brokerage_core::errors::Result;
use brokerage_core::orders::{Order, OrderRepositoryTrait, OrderStatus};

pub struct OrderRepository {
    pool: Arc<DbPool>,
}

impl OrderRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl OrderRepositoryTrait for OrderRepository {
    fn get_by_id(&self, order_id: &str) -> Result<Order> {
        let mut conn = get_connection(&self.pool)?;
        orders::table
            .find(order_id)
            .select(OrderDB::as_select())
            .first::<OrderDB>(&mut conn)
            .into_core()?
            .try_into()
    }

    fn list(&self, status: Option<OrderStatus>, portfolio_id: Option<&str>) -> Result<Vec<Order>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = orders::table
            .select(OrderDB::as_select())
            .order((orders::created_at.asc(), orders::id.asc()))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(orders::status.eq(status.as_str()));
        }
        if let Some(portfolio_id) = portfolio_id {
            query = query.filter(orders::portfolio_id.eq(portfolio_id.to_string()));
        }
        query
            .load::<OrderDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }
}
