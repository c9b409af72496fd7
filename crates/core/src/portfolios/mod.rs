//! Portfolios module - the portfolio aggregate, its totals and its positions.

mod portfolios_model;
mod portfolios_service;
mod portfolios_traits;

#[cfg(test)]
mod portfolios_model_tests;

#[cfg(test)]
mod portfolios_service_tests;

pub use portfolios_model::{
    AdjustmentKind, ManualTotals, NewPortfolio, Portfolio, PortfolioAdjustment, PortfolioUpdate,
    ValuationMode,
};
pub use portfolios_service::PortfolioService;
pub use portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
