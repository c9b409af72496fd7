//! Brokerage Core - Domain entities, services, and traits.
//!
//! This crate contains the portfolio and investment valuation engine: money and
//! currency handling, positions, portfolio totals (auto or manually overridden),
//! the order lifecycle and trade execution. It is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod market_prices;
pub mod money;
pub mod orders;
pub mod portfolios;
pub mod positions;
pub mod settings;
pub mod trading;
pub mod valuation;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
