use chrono::{NaiveDateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::trading_model::{
    price_buy, price_sell, PricingResult, TradeExecution, TradeRequest, TradeSide, TradeTarget,
};
use super::trading_traits::TradeServiceTrait;
use crate::constants::FEE_RATE_SETTING_KEY;
use crate::errors::{Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::ledger::{
    apply_position_change, close_originating_order, LedgerStoreTrait, LedgerWriter,
};
use crate::market_prices::{normalize_symbol, PricingProviderTrait};
use crate::money::Money;
use crate::orders::{Order, OrderStatus};
use crate::portfolios::{Portfolio, PortfolioRepositoryTrait};
use crate::positions::{
    NewPosition, Position, PositionChangeKind, PositionDelta, PositionRepositoryTrait,
};
use crate::settings::parse_fee_rate;

/// Everything pricing needs to know, read either from the repositories
/// (preview) or from inside the write (execution).
trait TradeSource {
    fn portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio>;
    fn position(&mut self, position_id: &str) -> Result<Position>;
    fn positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>>;
    fn market_price(&mut self, symbol: &str) -> Result<Option<Money>>;
    fn fee_rate(&mut self) -> Result<Decimal>;
}

struct RepositorySource<'a> {
    portfolios: &'a dyn PortfolioRepositoryTrait,
    positions: &'a dyn PositionRepositoryTrait,
    pricing: &'a dyn PricingProviderTrait,
}

impl TradeSource for RepositorySource<'_> {
    fn portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio> {
        self.portfolios.get_by_id(portfolio_id)
    }

    fn position(&mut self, position_id: &str) -> Result<Position> {
        self.positions.get_by_id(position_id)
    }

    fn positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>> {
        self.positions.load_positions(portfolio_id)
    }

    fn market_price(&mut self, symbol: &str) -> Result<Option<Money>> {
        self.pricing.current_price(symbol)
    }

    fn fee_rate(&mut self) -> Result<Decimal> {
        self.pricing.fee_rate()
    }
}

struct WriterSource<'a, 'w> {
    writer: &'a mut (dyn LedgerWriter + 'w),
}

impl TradeSource for WriterSource<'_, '_> {
    fn portfolio(&mut self, portfolio_id: &str) -> Result<Portfolio> {
        self.writer.get_portfolio(portfolio_id)
    }

    fn position(&mut self, position_id: &str) -> Result<Position> {
        self.writer.get_position(position_id)
    }

    fn positions(&mut self, portfolio_id: &str) -> Result<Vec<Position>> {
        self.writer.load_positions(portfolio_id)
    }

    fn market_price(&mut self, symbol: &str) -> Result<Option<Money>> {
        Ok(self
            .writer
            .get_market_price(&normalize_symbol(symbol)?)?
            .map(|p| p.price))
    }

    fn fee_rate(&mut self) -> Result<Decimal> {
        parse_fee_rate(self.writer.get_setting(FEE_RATE_SETTING_KEY)?.as_deref())
    }
}

/// A priced trade and the state it was priced against.
struct Quote {
    portfolio: Portfolio,
    /// Position the trade acts on; `None` for a catalog buy
    position: Option<Position>,
    unit_price: Money,
    pricing: PricingResult,
}

fn ensure_tradable(position: &Position, side: TradeSide) -> Result<()> {
    if position.status != OrderStatus::Active {
        return Err(Error::InvalidOrderState {
            entity_id: position.id.clone(),
            status: position.status,
            action: side.as_str(),
        });
    }
    Ok(())
}

fn quote(source: &mut dyn TradeSource, request: &TradeRequest) -> Result<Quote> {
    request.validate()?;
    let portfolio = source.portfolio(&request.portfolio_id)?;

    let (position, unit_price) = match &request.target {
        TradeTarget::Position { position_id } => {
            let position = source.position(position_id)?;
            if position.portfolio_id != portfolio.id {
                return Err(Error::invalid_input(format!(
                    "Position {} does not belong to portfolio {}",
                    position.id, portfolio.id
                )));
            }
            ensure_tradable(&position, request.side)?;
            let market = match position.symbol.as_deref() {
                Some(symbol) if !symbol.is_empty() => source.market_price(symbol)?,
                _ => None,
            };
            let unit_price = market.unwrap_or(position.current_price);
            (Some(position), unit_price)
        }
        TradeTarget::Catalog { symbol, .. } => {
            let symbol = normalize_symbol(symbol)?;
            let unit_price = source.market_price(&symbol)?.ok_or_else(|| {
                Error::invalid_input(format!("No market price is known for {}", symbol))
            })?;
            let position = match request.side {
                TradeSide::Buy => None,
                TradeSide::Sell => {
                    let lots: Vec<Position> = source
                        .positions(&portfolio.id)?
                        .into_iter()
                        .filter(|p| {
                            p.status == OrderStatus::Active && p.symbol.as_deref() == Some(symbol.as_str())
                        })
                        .collect();
                    Some(pick_sell_lot(lots, request.quantity)?)
                }
            };
            (position, unit_price)
        }
    };

    if unit_price.currency() != portfolio.currency {
        return Err(Error::currency_mismatch(
            unit_price.currency(),
            portfolio.currency,
        ));
    }

    let fee_rate = source.fee_rate()?;
    let pricing = match (request.side, &position) {
        (TradeSide::Buy, _) => {
            PricingResult::Buy(price_buy(request.quantity, unit_price, fee_rate)?)
        }
        (TradeSide::Sell, Some(held)) => {
            if request.quantity > held.quantity {
                return Err(Error::InsufficientHolding {
                    held: held.quantity,
                    requested: request.quantity,
                });
            }
            PricingResult::Sell(price_sell(
                request.quantity,
                unit_price,
                held.purchase_price,
                fee_rate,
            )?)
        }
        (TradeSide::Sell, None) => {
            return Err(Error::InsufficientHolding {
                held: Decimal::ZERO,
                requested: request.quantity,
            })
        }
    };

    Ok(Quote {
        portfolio,
        position,
        unit_price,
        pricing,
    })
}

/// A catalog sell draws from a single lot: the first one covering the
/// quantity. When none does, the error reports the largest lot.
fn pick_sell_lot(lots: Vec<Position>, quantity: Decimal) -> Result<Position> {
    let largest = lots
        .iter()
        .map(|p| p.quantity)
        .max()
        .unwrap_or(Decimal::ZERO);
    lots.into_iter()
        .find(|p| p.quantity >= quantity)
        .ok_or(Error::InsufficientHolding {
            held: largest,
            requested: quantity,
        })
}

/// Applies a priced trade to its position and returns the position before and
/// after. A catalog buy has no "before".
fn apply_trade(
    writer: &mut dyn LedgerWriter,
    request: &TradeRequest,
    quote: &Quote,
    new_position_id: String,
    now: NaiveDateTime,
) -> Result<(Option<Position>, Position, Option<Order>)> {
    match (&quote.position, &request.target) {
        (None, TradeTarget::Catalog {
            symbol,
            name,
            investment_type,
        }) => {
            let position = NewPosition {
                id: None,
                portfolio_id: quote.portfolio.id.clone(),
                order_id: None,
                investment_type: *investment_type,
                name: name.clone(),
                symbol: Some(normalize_symbol(symbol)?),
                quantity: request.quantity,
                purchase_price: quote.unit_price,
                current_price: Some(quote.unit_price),
                purchase_date: now.date(),
                maturity_date: None,
                interest_rate: None,
                status: Some(OrderStatus::Active),
            }
            .into_position(new_position_id, now)?;
            writer.insert_position(&position)?;
            Ok((None, position, None))
        }
        (Some(before), _) => {
            let mut after = before.clone();
            match request.side {
                TradeSide::Buy => {
                    let quantity = before.quantity + request.quantity;
                    let invested = before
                        .cost_basis()
                        .checked_add(&quote.unit_price.times(request.quantity))?;
                    after.quantity = quantity;
                    after.purchase_price =
                        Money::new(invested.amount() / quantity, invested.currency());
                }
                TradeSide::Sell => {
                    after.quantity = before.quantity - request.quantity;
                    if after.quantity.is_zero() {
                        after.status = OrderStatus::Completed;
                    }
                }
            }
            after.set_current_price(quote.unit_price, now)?;
            writer.update_position(&after)?;

            let closed_order = if after.status == OrderStatus::Completed {
                close_originating_order(writer, &after, false, now)?
            } else {
                None
            };
            Ok((Some(before.clone()), after, closed_order))
        }
        (None, TradeTarget::Position { position_id }) => Err(Error::Unexpected(format!(
            "Quote for position {} lost its position",
            position_id
        ))),
    }
}

/// Service pricing and executing trades.
pub struct TradeService {
    ledger: Arc<dyn LedgerStoreTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    position_repository: Arc<dyn PositionRepositoryTrait>,
    pricing_provider: Arc<dyn PricingProviderTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl TradeService {
    pub fn new(
        ledger: Arc<dyn LedgerStoreTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        position_repository: Arc<dyn PositionRepositoryTrait>,
        pricing_provider: Arc<dyn PricingProviderTrait>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            ledger,
            portfolio_repository,
            position_repository,
            pricing_provider,
            event_sink,
        }
    }

    async fn execute(&self, side: TradeSide, request: TradeRequest) -> Result<TradeExecution> {
        if request.side != side {
            return Err(Error::invalid_input(format!(
                "Cannot {} with a {} request",
                side.as_str(),
                request.side.as_str()
            )));
        }
        request.validate()?;
        let new_position_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let execution = self
            .ledger
            .execute(move |writer| {
                let quote = quote(&mut WriterSource { writer: &mut *writer }, &request)?;
                let (before, position, closed_order) =
                    apply_trade(writer, &request, &quote, new_position_id, now)?;

                let delta = match &before {
                    Some(before) => PositionDelta::changed(
                        PositionChangeKind::of_edit(before, &position),
                        before,
                        &position,
                    ),
                    None => PositionDelta::added(&position),
                };
                let portfolio = apply_position_change(writer, &position.portfolio_id, &delta, now)?;
                Ok(TradeExecution {
                    pricing: quote.pricing,
                    position,
                    portfolio,
                    closed_order,
                })
            })
            .await?;

        info!(
            "Executed {} of {} on position {} in portfolio {}",
            side.as_str(),
            request_quantity(&execution.pricing),
            execution.position.id,
            execution.portfolio.id
        );
        self.emit_execution(&execution, side);
        Ok(execution)
    }

    fn emit_execution(&self, execution: &TradeExecution, side: TradeSide) {
        let portfolio = &execution.portfolio;
        let mut events = vec![
            DomainEvent::trade_executed(portfolio.id.clone(), execution.position.id.clone(), side),
            DomainEvent::positions_changed(portfolio.id.clone(), vec![execution.position.id.clone()]),
            DomainEvent::portfolio_totals_changed(portfolio.id.clone(), portfolio.valuation_mode),
        ];
        if let Some(order) = &execution.closed_order {
            events.push(DomainEvent::order_status_changed(
                order.id.clone(),
                order.portfolio_id.clone(),
                Some(OrderStatus::Active),
                order.status,
            ));
        }
        self.event_sink.emit_batch(events);
    }
}

fn request_quantity(pricing: &PricingResult) -> Decimal {
    match pricing {
        PricingResult::Buy(buy) => buy.quantity,
        PricingResult::Sell(sell) => sell.quantity,
    }
}

#[async_trait::async_trait]
impl TradeServiceTrait for TradeService {
    fn preview(&self, request: &TradeRequest) -> Result<PricingResult> {
        let mut source = RepositorySource {
            portfolios: self.portfolio_repository.as_ref(),
            positions: self.position_repository.as_ref(),
            pricing: self.pricing_provider.as_ref(),
        };
        let quote = quote(&mut source, request)?;
        debug!(
            "Previewed {} of {} in portfolio {}",
            request.side.as_str(),
            request.quantity,
            quote.portfolio.id
        );
        Ok(quote.pricing)
    }

    async fn buy(&self, request: TradeRequest) -> Result<TradeExecution> {
        self.execute(TradeSide::Buy, request).await
    }

    async fn sell(&self, request: TradeRequest) -> Result<TradeExecution> {
        self.execute(TradeSide::Sell, request).await
    }
}
