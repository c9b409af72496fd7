use async_trait::async_trait;

use super::trading_model::{PricingResult, TradeExecution, TradeRequest};
use crate::errors::Result;

#[async_trait]
pub trait TradeServiceTrait: Send + Sync {
    /// Prices a trade without changing anything.
    fn preview(&self, request: &TradeRequest) -> Result<PricingResult>;

    /// Prices and commits a purchase against the latest price and fee rate.
    async fn buy(&self, request: TradeRequest) -> Result<TradeExecution>;

    /// Prices and commits a sale against the latest price and fee rate.
    async fn sell(&self, request: TradeRequest) -> Result<TradeExecution>;
}
