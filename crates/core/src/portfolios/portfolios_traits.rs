//! Portfolio repository and service traits.

use async_trait::async_trait;

use super::portfolios_model::{
    ManualTotals, NewPortfolio, Portfolio, PortfolioAdjustment, PortfolioUpdate,
};
use crate::errors::Result;
use crate::positions::{NewPosition, Position, PositionUpdate};

/// Read access to stored portfolios. Writes go through the ledger.
pub trait PortfolioRepositoryTrait: Send + Sync {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio>;

    /// Lists portfolios, optionally only those of one user.
    fn list(&self, user_id: Option<&str>) -> Result<Vec<Portfolio>>;

    /// Audit trail of a portfolio, oldest first.
    fn list_adjustments(&self, portfolio_id: &str) -> Result<Vec<PortfolioAdjustment>>;
}

/// Trait defining the contract for portfolio service operations.
#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;

    /// Returns the user's first portfolio, creating a default one in the base
    /// currency when the user has none.
    async fn ensure_user_portfolio(&self, user_id: &str) -> Result<Portfolio>;

    async fn update_portfolio(&self, portfolio_update: PortfolioUpdate) -> Result<Portfolio>;

    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio>;

    fn list_portfolios(&self, user_id: Option<&str>) -> Result<Vec<Portfolio>>;

    fn list_adjustments(&self, portfolio_id: &str) -> Result<Vec<PortfolioAdjustment>>;

    /// Deletes an empty portfolio. Fails with `PortfolioNotEmpty` otherwise.
    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<usize>;

    /// Deletes a portfolio together with its positions, orders and audit trail.
    async fn delete_portfolio_with_positions(&self, portfolio_id: &str) -> Result<usize>;

    async fn add_position(&self, new_position: NewPosition) -> Result<Position>;

    async fn update_position(&self, position_update: PositionUpdate) -> Result<Position>;

    async fn remove_position(&self, position_id: &str) -> Result<Position>;

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;

    async fn set_manual_totals(&self, portfolio_id: &str, totals: ManualTotals)
        -> Result<Portfolio>;

    async fn switch_to_auto(&self, portfolio_id: &str) -> Result<Portfolio>;
}
