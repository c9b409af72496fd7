//! Trade requests and pricing results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::money::{percentage_of, Money};
use crate::orders::Order;
use crate::portfolios::Portfolio;
use crate::positions::{InvestmentType, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// What a trade acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeTarget {
    /// An existing position of the portfolio.
    #[serde(rename_all = "camelCase")]
    Position { position_id: String },
    /// A listed instrument, priced from the market price feed. Buying opens a
    /// new position. Selling draws from a single ACTIVE lot holding the
    /// symbol (the first one large enough); lots are never combined.
    #[serde(rename_all = "camelCase")]
    Catalog {
        symbol: String,
        name: String,
        investment_type: InvestmentType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub side: TradeSide,
    pub portfolio_id: String,
    pub target: TradeTarget,
    pub quantity: Decimal,
}

impl TradeRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_positive_quantity(self.quantity)?;
        if self.portfolio_id.trim().is_empty() {
            return Err(Error::invalid_input("Portfolio ID is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyPricing {
    pub quantity: Decimal,
    pub unit_price: Money,
    pub fee_rate: Decimal,
    /// `quantity × unit_price`
    pub total_cost: Money,
    pub fee: Money,
    /// What the buyer pays: cost plus fee
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellPricing {
    pub quantity: Decimal,
    pub unit_price: Money,
    pub purchase_price: Money,
    pub fee_rate: Decimal,
    /// `quantity × unit_price`
    pub proceeds: Money,
    pub fee: Money,
    pub net_proceeds: Money,
    /// Net proceeds minus the cost basis of the sold quantity
    pub gain_loss: Money,
    pub return_percent: Decimal,
}

/// Unrounded pricing of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingResult {
    Buy(BuyPricing),
    Sell(SellPricing),
}

impl PricingResult {
    pub fn side(&self) -> TradeSide {
        match self {
            PricingResult::Buy(_) => TradeSide::Buy,
            PricingResult::Sell(_) => TradeSide::Sell,
        }
    }
}

/// A committed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeExecution {
    pub pricing: PricingResult,
    pub position: Position,
    pub portfolio: Portfolio,
    /// Originating order, when a sell closed it
    pub closed_order: Option<Order>,
}

fn ensure_positive_quantity(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(Error::InvalidQuantity(format!(
            "Trade quantity must be positive (got {})",
            quantity
        )));
    }
    Ok(())
}

/// Prices a purchase of `quantity` units at `unit_price`.
pub fn price_buy(quantity: Decimal, unit_price: Money, fee_rate: Decimal) -> Result<BuyPricing> {
    ensure_positive_quantity(quantity)?;
    let total_cost = unit_price.times(quantity);
    let fee = total_cost.times(fee_rate);
    let total_amount = total_cost.checked_add(&fee)?;
    Ok(BuyPricing {
        quantity,
        unit_price,
        fee_rate,
        total_cost,
        fee,
        total_amount,
    })
}

/// Prices a sale of `quantity` units at `unit_price`, against units bought at
/// `purchase_price`.
pub fn price_sell(
    quantity: Decimal,
    unit_price: Money,
    purchase_price: Money,
    fee_rate: Decimal,
) -> Result<SellPricing> {
    ensure_positive_quantity(quantity)?;
    unit_price.ensure_same_currency(&purchase_price)?;

    let proceeds = unit_price.times(quantity);
    let fee = proceeds.times(fee_rate);
    let net_proceeds = proceeds.checked_sub(&fee)?;
    let cost_basis = purchase_price.times(quantity);
    let gain_loss = net_proceeds.checked_sub(&cost_basis)?;
    Ok(SellPricing {
        quantity,
        unit_price,
        purchase_price,
        fee_rate,
        proceeds,
        fee,
        net_proceeds,
        gain_loss,
        return_percent: percentage_of(gain_loss.amount(), cost_basis.amount()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> Money {
        Money::parse(amount, "USD").unwrap()
    }

    #[test]
    fn test_buy_pricing() {
        let pricing = price_buy(dec!(5), usd(dec!(450)), dec!(0.01)).unwrap();
        assert_eq!(pricing.total_cost, usd(dec!(2250)));
        assert_eq!(pricing.fee, usd(dec!(22.50)));
        assert_eq!(pricing.total_amount, usd(dec!(2272.50)));
    }

    #[test]
    fn test_sell_pricing() {
        let pricing = price_sell(dec!(1), usd(dec!(450)), usd(dec!(400)), dec!(0.01)).unwrap();
        assert_eq!(pricing.proceeds, usd(dec!(450)));
        assert_eq!(pricing.fee, usd(dec!(4.50)));
        assert_eq!(pricing.net_proceeds, usd(dec!(445.50)));
        assert_eq!(pricing.gain_loss, usd(dec!(45.50)));
        assert_eq!(pricing.return_percent, dec!(11.375));
    }

    #[test]
    fn test_sell_at_a_loss() {
        let pricing = price_sell(dec!(2), usd(dec!(90)), usd(dec!(100)), dec!(0)).unwrap();
        assert_eq!(pricing.gain_loss, usd(dec!(-20)));
        assert_eq!(pricing.return_percent, dec!(-10));
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        for quantity in [dec!(0), dec!(-1)] {
            assert!(matches!(
                price_buy(quantity, usd(dec!(1)), dec!(0.01)),
                Err(Error::InvalidQuantity(_))
            ));
            assert!(matches!(
                price_sell(quantity, usd(dec!(1)), usd(dec!(1)), dec!(0.01)),
                Err(Error::InvalidQuantity(_))
            ));
        }
    }

    #[test]
    fn test_sell_requires_matching_currencies() {
        let eur = Money::parse(dec!(400), "EUR").unwrap();
        assert!(matches!(
            price_sell(dec!(1), usd(dec!(450)), eur, dec!(0.01)),
            Err(Error::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_pricing_result_is_tagged_by_side() {
        let result = PricingResult::Buy(price_buy(dec!(1), usd(dec!(10)), dec!(0.01)).unwrap());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["side"], "BUY");
        assert!(json.get("totalAmount").is_some());
        assert_eq!(result.side(), TradeSide::Buy);
    }
}
