//! SQLite storage implementation for portfolios.

mod model;
mod repository;

pub use model::{PortfolioAdjustmentDB, PortfolioDB};
pub use repository::PortfolioRepository;

// Re-export trait from core for convenience
pub use brokerage_core::portfolios::PortfolioRepositoryTrait;
