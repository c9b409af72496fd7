//! SQLite storage implementation for positions.

mod model;
mod repository;

pub use model::PositionDB;
pub use repository::PositionRepository;

// Re-export trait from core for convenience
pub use brokerage_core::positions::PositionRepositoryTrait;
