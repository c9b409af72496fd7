use chrono::Utc;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::market_prices_model::{normalize_symbol, MarketPrice};
use super::market_prices_traits::{
    MarketPriceRepositoryTrait, MarketPriceServiceTrait, PricingProviderTrait,
};
use crate::constants::FEE_RATE_SETTING_KEY;
use crate::errors::{DatabaseError, Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::ledger::{apply_position_change, LedgerStoreTrait};
use crate::money::Money;
use crate::positions::{PositionChangeKind, PositionDelta};
use crate::settings::{parse_fee_rate, SettingsRepositoryTrait};

/// Pricing collaborator backed by the settings table and stored market prices.
pub struct PricingService {
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
    market_price_repository: Arc<dyn MarketPriceRepositoryTrait>,
}

impl PricingService {
    pub fn new(
        settings_repository: Arc<dyn SettingsRepositoryTrait>,
        market_price_repository: Arc<dyn MarketPriceRepositoryTrait>,
    ) -> Self {
        Self {
            settings_repository,
            market_price_repository,
        }
    }
}

impl PricingProviderTrait for PricingService {
    fn fee_rate(&self) -> Result<Decimal> {
        let stored = match self.settings_repository.get_setting(FEE_RATE_SETTING_KEY) {
            Ok(value) => Some(value),
            Err(Error::Database(DatabaseError::NotFound(_))) => None,
            Err(e) => return Err(e),
        };
        parse_fee_rate(stored.as_deref())
    }

    fn current_price(&self, symbol: &str) -> Result<Option<Money>> {
        let symbol = normalize_symbol(symbol)?;
        Ok(self
            .market_price_repository
            .get_price(&symbol)?
            .map(|p| p.price))
    }
}

/// Service recording price observations and re-pricing the positions they affect.
pub struct MarketPriceService {
    ledger: Arc<dyn LedgerStoreTrait>,
    market_price_repository: Arc<dyn MarketPriceRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl MarketPriceService {
    pub fn new(
        ledger: Arc<dyn LedgerStoreTrait>,
        market_price_repository: Arc<dyn MarketPriceRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            ledger,
            market_price_repository,
            event_sink,
        }
    }
}

#[async_trait::async_trait]
impl MarketPriceServiceTrait for MarketPriceService {
    fn get_price(&self, symbol: &str) -> Result<Option<MarketPrice>> {
        self.market_price_repository
            .get_price(&normalize_symbol(symbol)?)
    }

    fn list_prices(&self) -> Result<Vec<MarketPrice>> {
        self.market_price_repository.list_prices()
    }

    async fn update_price(&self, symbol: &str, price: Money) -> Result<MarketPrice> {
        let now = Utc::now().naive_utc();
        let market_price = MarketPrice::new(symbol, price, now)?;

        let (market_price, repriced) = self
            .ledger
            .execute(move |writer| {
                writer.upsert_market_price(&market_price)?;

                // portfolio id -> repriced position ids
                let mut repriced: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for before in writer.list_positions_by_symbol(&market_price.symbol)? {
                    if !before.is_counted() {
                        continue;
                    }
                    if before.currency() != market_price.price.currency() {
                        warn!(
                            "Skipping position {}: priced in {}, feed for {} is in {}",
                            before.id,
                            before.currency(),
                            market_price.symbol,
                            market_price.price.currency()
                        );
                        continue;
                    }
                    let mut after = before.clone();
                    after.set_current_price(market_price.price, now)?;
                    writer.update_position(&after)?;
                    apply_position_change(
                        writer,
                        &after.portfolio_id,
                        &PositionDelta::changed(PositionChangeKind::PriceChanged, &before, &after),
                        now,
                    )?;
                    repriced
                        .entry(after.portfolio_id.clone())
                        .or_default()
                        .push(after.id);
                }
                Ok((market_price, repriced))
            })
            .await?;

        let position_count: usize = repriced.values().map(Vec::len).sum();
        info!(
            "Price of {} set to {}, {} position(s) re-priced",
            market_price.symbol, market_price.price, position_count
        );

        let mut events = vec![DomainEvent::market_price_updated(
            market_price.symbol.clone(),
            repriced.values().flatten().cloned().collect(),
        )];
        for (portfolio_id, position_ids) in repriced {
            debug!(
                "Portfolio {} re-priced positions {:?}",
                portfolio_id, position_ids
            );
            events.push(DomainEvent::positions_changed(portfolio_id, position_ids));
        }
        self.event_sink.emit_batch(events);
        Ok(market_price)
    }
}
