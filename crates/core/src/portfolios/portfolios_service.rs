use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use super::portfolios_model::{
    ManualTotals, NewPortfolio, Portfolio, PortfolioAdjustment, PortfolioUpdate, ValuationMode,
};
use super::portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
use crate::constants::{BASE_CURRENCY_SETTING_KEY, DEFAULT_BASE_CURRENCY, DEFAULT_PORTFOLIO_NAME};
use crate::errors::{Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::ledger::{apply_position_change, close_originating_order, LedgerStoreTrait};
use crate::money::Currency;
use crate::orders::OrderStatus;
use crate::positions::{
    NewPosition, Position, PositionChangeKind, PositionDelta, PositionRepositoryTrait,
    PositionUpdate,
};

/// Service owning portfolio totals and direct position administration.
pub struct PortfolioService {
    ledger: Arc<dyn LedgerStoreTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    position_repository: Arc<dyn PositionRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl PortfolioService {
    pub fn new(
        ledger: Arc<dyn LedgerStoreTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        position_repository: Arc<dyn PositionRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            ledger,
            portfolio_repository,
            position_repository,
            event_sink,
        }
    }

    fn emit_position_change(&self, portfolio: &Portfolio, position_id: &str) {
        let mut events = vec![DomainEvent::positions_changed(
            portfolio.id.clone(),
            vec![position_id.to_string()],
        )];
        if portfolio.valuation_mode == ValuationMode::Auto {
            events.push(DomainEvent::portfolio_totals_changed(
                portfolio.id.clone(),
                portfolio.valuation_mode,
            ));
        }
        self.event_sink.emit_batch(events);
    }
}

fn ensure_editable(position: &Position, action: &'static str) -> Result<()> {
    if position.status == OrderStatus::Pending {
        return Err(Error::InvalidOrderState {
            entity_id: position.id.clone(),
            status: position.status,
            action,
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        let portfolio =
            new_portfolio.into_portfolio(Uuid::new_v4().to_string(), Utc::now().naive_utc())?;

        let created = self
            .ledger
            .execute(move |writer| {
                writer.insert_portfolio(&portfolio)?;
                Ok(portfolio)
            })
            .await?;

        info!(
            "Created portfolio {} ({}) for user {}",
            created.id, created.currency, created.user_id
        );
        self.event_sink
            .emit(DomainEvent::portfolios_changed(vec![created.id.clone()]));
        Ok(created)
    }

    async fn ensure_user_portfolio(&self, user_id: &str) -> Result<Portfolio> {
        if user_id.trim().is_empty() {
            return Err(Error::invalid_input("User ID is required"));
        }
        let user_id = user_id.to_string();
        let now = Utc::now().naive_utc();
        let new_id = Uuid::new_v4().to_string();

        let (portfolio, created) = self
            .ledger
            .execute(move |writer| {
                if let Some(existing) = writer.list_portfolios_for_user(&user_id)?.into_iter().next()
                {
                    return Ok((existing, false));
                }
                let base_currency = writer.get_setting(BASE_CURRENCY_SETTING_KEY)?;
                let currency =
                    Currency::parse(base_currency.as_deref().unwrap_or(DEFAULT_BASE_CURRENCY))?;
                let portfolio = NewPortfolio {
                    id: None,
                    user_id,
                    name: DEFAULT_PORTFOLIO_NAME.to_string(),
                    description: None,
                    currency,
                }
                .into_portfolio(new_id, now)?;
                writer.insert_portfolio(&portfolio)?;
                Ok((portfolio, true))
            })
            .await?;

        if created {
            info!(
                "Provisioned portfolio {} for user {}",
                portfolio.id, portfolio.user_id
            );
            self.event_sink
                .emit(DomainEvent::portfolios_changed(vec![portfolio.id.clone()]));
        }
        Ok(portfolio)
    }

    async fn update_portfolio(&self, portfolio_update: PortfolioUpdate) -> Result<Portfolio> {
        portfolio_update.validate()?;
        let now = Utc::now().naive_utc();

        let updated = self
            .ledger
            .execute(move |writer| {
                let mut portfolio = writer.get_portfolio(&portfolio_update.id)?;
                portfolio.name = portfolio_update.name.trim().to_string();
                portfolio.description = portfolio_update.description;
                portfolio.is_active = portfolio_update.is_active;
                portfolio.updated_at = now;
                writer.update_portfolio(&portfolio)?;
                Ok(portfolio)
            })
            .await?;

        self.event_sink
            .emit(DomainEvent::portfolios_changed(vec![updated.id.clone()]));
        Ok(updated)
    }

    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        self.portfolio_repository.get_by_id(portfolio_id)
    }

    fn list_portfolios(&self, user_id: Option<&str>) -> Result<Vec<Portfolio>> {
        self.portfolio_repository.list(user_id)
    }

    fn list_adjustments(&self, portfolio_id: &str) -> Result<Vec<PortfolioAdjustment>> {
        self.portfolio_repository.list_adjustments(portfolio_id)
    }

    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<usize> {
        let id = portfolio_id.to_string();
        let deleted = self
            .ledger
            .execute(move |writer| {
                writer.get_portfolio(&id)?;
                let position_count = writer.load_positions(&id)?.len();
                if position_count > 0 {
                    return Err(Error::PortfolioNotEmpty {
                        portfolio_id: id,
                        position_count,
                    });
                }
                writer.delete_portfolio(&id)
            })
            .await?;

        info!("Deleted portfolio {}", portfolio_id);
        self.event_sink
            .emit(DomainEvent::portfolios_changed(vec![portfolio_id.to_string()]));
        Ok(deleted)
    }

    async fn delete_portfolio_with_positions(&self, portfolio_id: &str) -> Result<usize> {
        let id = portfolio_id.to_string();
        let (deleted, removed_positions) = self
            .ledger
            .execute(move |writer| {
                writer.get_portfolio(&id)?;
                let positions = writer.load_positions(&id)?;
                for position in &positions {
                    writer.delete_position(&position.id)?;
                }
                Ok((writer.delete_portfolio(&id)?, positions.len()))
            })
            .await?;

        info!(
            "Deleted portfolio {} together with {} position(s)",
            portfolio_id, removed_positions
        );
        self.event_sink
            .emit(DomainEvent::portfolios_changed(vec![portfolio_id.to_string()]));
        Ok(deleted)
    }

    async fn add_position(&self, new_position: NewPosition) -> Result<Position> {
        let position =
            new_position.into_position(Uuid::new_v4().to_string(), Utc::now().naive_utc())?;
        let now = position.created_at;

        let (position, portfolio) = self
            .ledger
            .execute(move |writer| {
                let portfolio = writer.get_portfolio(&position.portfolio_id)?;
                if position.currency() != portfolio.currency {
                    return Err(Error::currency_mismatch(
                        position.currency(),
                        portfolio.currency,
                    ));
                }
                writer.insert_position(&position)?;
                let portfolio = apply_position_change(
                    writer,
                    &position.portfolio_id,
                    &PositionDelta::added(&position),
                    now,
                )?;
                Ok((position, portfolio))
            })
            .await?;

        debug!(
            "Added position {} ({} x {}) to portfolio {}",
            position.id, position.quantity, position.purchase_price, portfolio.id
        );
        self.emit_position_change(&portfolio, &position.id);
        Ok(position)
    }

    async fn update_position(&self, position_update: PositionUpdate) -> Result<Position> {
        let now = Utc::now().naive_utc();

        let (position, portfolio) = self
            .ledger
            .execute(move |writer| {
                let before = writer.get_position(&position_update.id)?;
                ensure_editable(&before, "edit")?;

                let mut after = before.clone();
                after.apply_update(position_update, now)?;
                writer.update_position(&after)?;

                let kind = PositionChangeKind::of_edit(&before, &after);
                let portfolio = apply_position_change(
                    writer,
                    &after.portfolio_id,
                    &PositionDelta::changed(kind, &before, &after),
                    now,
                )?;
                Ok((after, portfolio))
            })
            .await?;

        self.emit_position_change(&portfolio, &position.id);
        Ok(position)
    }

    async fn remove_position(&self, position_id: &str) -> Result<Position> {
        let id = position_id.to_string();
        let now = Utc::now().naive_utc();

        let (position, portfolio, closed_order) = self
            .ledger
            .execute(move |writer| {
                let position = writer.get_position(&id)?;
                ensure_editable(&position, "remove")?;
                // an ACTIVE order must not outlive its position
                let closed_order = close_originating_order(writer, &position, true, now)?;
                writer.delete_position(&id)?;
                let portfolio = apply_position_change(
                    writer,
                    &position.portfolio_id,
                    &PositionDelta::removed(&position),
                    now,
                )?;
                Ok((position, portfolio, closed_order))
            })
            .await?;

        info!(
            "Removed position {} from portfolio {}",
            position.id, portfolio.id
        );
        self.emit_position_change(&portfolio, &position.id);
        if let Some(order) = closed_order {
            info!("Order {} completed with its removed position", order.id);
            self.event_sink.emit(DomainEvent::order_status_changed(
                order.id,
                order.portfolio_id,
                Some(OrderStatus::Active),
                order.status,
            ));
        }
        Ok(position)
    }

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        self.portfolio_repository.get_by_id(portfolio_id)?;
        self.position_repository.load_positions(portfolio_id)
    }

    async fn set_manual_totals(
        &self,
        portfolio_id: &str,
        totals: ManualTotals,
    ) -> Result<Portfolio> {
        totals.validate()?;
        let id = portfolio_id.to_string();
        let now = Utc::now().naive_utc();

        let (portfolio, old_mode) = self
            .ledger
            .execute(move |writer| {
                let mut portfolio = writer.get_portfolio(&id)?;
                let old_mode = portfolio.valuation_mode;
                let adjustment = portfolio.set_manual_totals(&totals, now)?;
                writer.update_portfolio(&portfolio)?;
                writer.insert_adjustment(&adjustment)?;
                Ok((portfolio, old_mode))
            })
            .await?;

        info!(
            "Portfolio {} totals overridden: value {}, invested {}",
            portfolio.id, portfolio.totals.total_value, portfolio.totals.total_invested
        );
        let mut events = vec![DomainEvent::portfolio_totals_changed(
            portfolio.id.clone(),
            portfolio.valuation_mode,
        )];
        if old_mode != portfolio.valuation_mode {
            events.push(DomainEvent::valuation_mode_changed(
                portfolio.id.clone(),
                old_mode,
                portfolio.valuation_mode,
            ));
        }
        self.event_sink.emit_batch(events);
        Ok(portfolio)
    }

    async fn switch_to_auto(&self, portfolio_id: &str) -> Result<Portfolio> {
        let id = portfolio_id.to_string();
        let now = Utc::now().naive_utc();

        let (portfolio, switched) = self
            .ledger
            .execute(move |writer| {
                let mut portfolio = writer.get_portfolio(&id)?;
                let positions = writer.load_positions(&id)?;
                let adjustment = portfolio.switch_to_auto(&positions, now)?;
                writer.update_portfolio(&portfolio)?;
                if let Some(adjustment) = &adjustment {
                    writer.insert_adjustment(adjustment)?;
                }
                Ok((portfolio, adjustment.is_some()))
            })
            .await?;

        let mut events = vec![DomainEvent::portfolio_totals_changed(
            portfolio.id.clone(),
            portfolio.valuation_mode,
        )];
        if switched {
            info!("Portfolio {} switched back to AUTO valuation", portfolio.id);
            events.push(DomainEvent::valuation_mode_changed(
                portfolio.id.clone(),
                ValuationMode::Manual,
                ValuationMode::Auto,
            ));
        }
        self.event_sink.emit_batch(events);
        Ok(portfolio)
    }
}
