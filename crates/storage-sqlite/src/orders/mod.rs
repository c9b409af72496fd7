//! SQLite storage implementation for orders.

mod model;
mod repository;

pub use model::OrderDB;
pub use repository::OrderRepository;

// Re-export trait from core for convenience
pub use brokerage_core::orders::OrderRepositoryTrait;
