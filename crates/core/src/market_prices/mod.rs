//! Market prices module - latest prices per symbol and the pricing collaborator.

mod market_prices_model;
mod market_prices_service;
mod market_prices_traits;

#[cfg(test)]
mod market_prices_service_tests;

pub use market_prices_model::{normalize_symbol, MarketPrice};
pub use market_prices_service::{MarketPriceService, PricingService};
pub use market_prices_traits::{
    MarketPriceRepositoryTrait, MarketPriceServiceTrait, PricingProviderTrait,
};
