//! Position repository trait.

use super::positions_model::Position;
use crate::errors::Result;

/// Read access to stored positions.
///
/// Writes go through the ledger so that a position never changes without its
/// portfolio totals changing in the same transaction.
pub trait PositionRepositoryTrait: Send + Sync {
    /// Retrieves a position by its ID.
    fn get_by_id(&self, position_id: &str) -> Result<Position>;

    /// Loads every position of a portfolio, cancelled ones included.
    fn load_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;
}
