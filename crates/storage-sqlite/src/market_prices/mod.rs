//! SQLite storage implementation for market prices.

mod model;
mod repository;

pub use model::MarketPriceDB;
pub use repository::MarketPriceRepository;

// Re-export trait from core for convenience
pub use brokerage_core::market_prices::MarketPriceRepositoryTrait;
