//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::orders::OrderStatus;
use crate::portfolios::ValuationMode;
use crate::trading::TradeSide;

/// Domain events emitted by core services after a write has committed.
///
/// Events are facts about data that already changed; a failed or rolled back
/// write never emits anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A portfolio was created, edited or deleted.
    PortfoliosChanged { portfolio_ids: Vec<String> },

    /// Stored totals of a portfolio changed.
    PortfolioTotalsChanged {
        portfolio_id: String,
        valuation_mode: ValuationMode,
    },

    /// A portfolio switched between AUTO and MANUAL.
    ValuationModeChanged {
        portfolio_id: String,
        old_mode: ValuationMode,
        new_mode: ValuationMode,
    },

    /// Positions were created, edited, re-priced or removed.
    PositionsChanged {
        portfolio_id: String,
        position_ids: Vec<String>,
    },

    /// An order moved through its lifecycle (including submission).
    OrderStatusChanged {
        order_id: String,
        portfolio_id: String,
        old_status: Option<OrderStatus>,
        new_status: OrderStatus,
    },

    /// A buy or sell was executed against a position.
    TradeExecuted {
        portfolio_id: String,
        position_id: String,
        side: TradeSide,
    },

    /// A new market price was recorded.
    MarketPriceUpdated {
        symbol: String,
        position_ids: Vec<String>,
    },
}

impl DomainEvent {
    pub fn portfolios_changed(portfolio_ids: Vec<String>) -> Self {
        Self::PortfoliosChanged { portfolio_ids }
    }

    pub fn portfolio_totals_changed(portfolio_id: String, valuation_mode: ValuationMode) -> Self {
        Self::PortfolioTotalsChanged {
            portfolio_id,
            valuation_mode,
        }
    }

    pub fn valuation_mode_changed(
        portfolio_id: String,
        old_mode: ValuationMode,
        new_mode: ValuationMode,
    ) -> Self {
        Self::ValuationModeChanged {
            portfolio_id,
            old_mode,
            new_mode,
        }
    }

    pub fn positions_changed(portfolio_id: String, position_ids: Vec<String>) -> Self {
        Self::PositionsChanged {
            portfolio_id,
            position_ids,
        }
    }

    pub fn order_status_changed(
        order_id: String,
        portfolio_id: String,
        old_status: Option<OrderStatus>,
        new_status: OrderStatus,
    ) -> Self {
        Self::OrderStatusChanged {
            order_id,
            portfolio_id,
            old_status,
            new_status,
        }
    }

    pub fn trade_executed(portfolio_id: String, position_id: String, side: TradeSide) -> Self {
        Self::TradeExecuted {
            portfolio_id,
            position_id,
            side,
        }
    }

    pub fn market_price_updated(symbol: String, position_ids: Vec<String>) -> Self {
        Self::MarketPriceUpdated {
            symbol,
            position_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_event_serialization() {
        let event = DomainEvent::order_status_changed(
            "order-1".to_string(),
            "pf-1".to_string(),
            Some(OrderStatus::Pending),
            OrderStatus::Active,
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"order_status_changed\""));
        assert!(json.contains("\"new_status\":\"ACTIVE\""));

        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_mode_change_serialization() {
        let event = DomainEvent::valuation_mode_changed(
            "pf-1".to_string(),
            ValuationMode::Manual,
            ValuationMode::Auto,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("valuation_mode_changed"));
        assert!(json.contains("\"old_mode\":\"MANUAL\""));
    }
}
