use async_trait::async_trait;
use rust_decimal::Decimal;

use super::MarketPrice;
use crate::errors::Result;
use crate::money::Money;

/// Read access to stored market prices.
pub trait MarketPriceRepositoryTrait: Send + Sync {
    fn get_price(&self, symbol: &str) -> Result<Option<MarketPrice>>;
    fn list_prices(&self) -> Result<Vec<MarketPrice>>;
}

/// Source of the fee rate and current prices used for trade pricing.
pub trait PricingProviderTrait: Send + Sync {
    /// Fee as a fraction of the traded amount, in `[0, 1)`.
    fn fee_rate(&self) -> Result<Decimal>;

    /// Latest price of `symbol`, if one is known.
    fn current_price(&self, symbol: &str) -> Result<Option<Money>>;
}

#[async_trait]
pub trait MarketPriceServiceTrait: Send + Sync {
    fn get_price(&self, symbol: &str) -> Result<Option<MarketPrice>>;
    fn list_prices(&self) -> Result<Vec<MarketPrice>>;

    /// Records a new price and re-prices every counted position holding the
    /// symbol, applying the change to each owning portfolio in the same write.
    async fn update_price(&self, symbol: &str, price: Money) -> Result<MarketPrice>;
}
