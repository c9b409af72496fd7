//! Trading module - buy/sell pricing and execution against positions.

mod trading_model;
mod trading_service;
mod trading_traits;


pub use trading_model::{
    price_buy, price_sell, BuyPricing, PricingResult, SellPricing, TradeExecution, TradeRequest,
    TradeSide, TradeTarget,
};
pub use trading_service::TradeService;
pub use trading_traits::TradeServiceTrait;
