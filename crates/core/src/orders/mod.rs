//! Orders module - client orders and their approval lifecycle.

mod orders_model;
mod orders_service;
mod orders_traits;


pub use orders_model::{NewOrder, Order, OrderAction, OrderStatus};
pub use orders_service::OrderService;
pub use orders_traits::{OrderRepositoryTrait, OrderServiceTrait};
