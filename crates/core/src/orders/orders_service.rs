use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::orders_model::{NewOrder, Order, OrderAction, OrderStatus};
use super::orders_traits::{OrderRepositoryTrait, OrderServiceTrait};
use crate::errors::{Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::ledger::{apply_position_change, find_position, LedgerStoreTrait, LedgerWriter};
use crate::portfolios::Portfolio;
use crate::positions::{PositionChangeKind, PositionDelta};

/// Outcome of one committed transition, used to emit events afterwards.
struct Transition {
    order: Order,
    from: OrderStatus,
    portfolio: Option<Portfolio>,
}

/// Service driving orders through PENDING -> ACTIVE -> COMPLETED | MATURED and
/// PENDING -> CANCELLED.
pub struct OrderService {
    ledger: Arc<dyn LedgerStoreTrait>,
    order_repository: Arc<dyn OrderRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl OrderService {
    pub fn new(
        ledger: Arc<dyn LedgerStoreTrait>,
        order_repository: Arc<dyn OrderRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            ledger,
            order_repository,
            event_sink,
        }
    }

    fn emit_transition(&self, transition: &Transition) {
        let order = &transition.order;
        let mut events = vec![DomainEvent::order_status_changed(
            order.id.clone(),
            order.portfolio_id.clone(),
            Some(transition.from),
            order.status,
        )];
        if let (Some(portfolio), Some(position_id)) = (&transition.portfolio, &order.position_id) {
            events.push(DomainEvent::positions_changed(
                portfolio.id.clone(),
                vec![position_id.clone()],
            ));
            events.push(DomainEvent::portfolio_totals_changed(
                portfolio.id.clone(),
                portfolio.valuation_mode,
            ));
        }
        self.event_sink.emit_batch(events);
    }

    async fn close(&self, order_id: &str, action: OrderAction) -> Result<Order> {
        let id = order_id.to_string();
        let now = Utc::now().naive_utc();

        let transition = self
            .ledger
            .execute(move |writer| close_order(writer, &id, action, now))
            .await?;

        info!(
            "Order {} moved {} -> {}",
            transition.order.id, transition.from, transition.order.status
        );
        self.emit_transition(&transition);
        Ok(transition.order)
    }
}

/// Writes `order` if its stored status is still `expected`. A lost race is
/// reported against the status that won.
fn commit_transition(
    writer: &mut dyn LedgerWriter,
    order: &Order,
    expected: OrderStatus,
    action: OrderAction,
) -> Result<()> {
    if writer.compare_and_set_order(order, expected)? {
        return Ok(());
    }
    let current = writer.get_order(&order.id)?.status;
    warn!(
        "Lost race to {} order {}: status is now {}",
        action.as_str(),
        order.id,
        current
    );
    Err(Error::InvalidOrderState {
        entity_id: order.id.clone(),
        status: current,
        action: action.as_str(),
    })
}

/// Moves an ACTIVE order and its position to COMPLETED or MATURED. An order
/// whose position no longer exists closes on its own.
fn close_order(
    writer: &mut dyn LedgerWriter,
    order_id: &str,
    action: OrderAction,
    now: NaiveDateTime,
) -> Result<Transition> {
    let mut order = writer.get_order(order_id)?;
    let from = order.status;
    order.close(action, now)?;
    commit_transition(writer, &order, from, action)?;

    let position = match &order.position_id {
        Some(position_id) => find_position(writer, position_id)?,
        None => None,
    };
    let portfolio = match position {
        Some(before) => {
            let mut after = before.clone();
            after.status = order.status;
            after.updated_at = now;
            writer.update_position(&after)?;
            Some(apply_position_change(
                writer,
                &after.portfolio_id,
                &PositionDelta::changed(PositionChangeKind::StatusChanged, &before, &after),
                now,
            )?)
        }
        None => None,
    };

    Ok(Transition {
        order,
        from,
        portfolio,
    })
}

#[async_trait::async_trait]
impl OrderServiceTrait for OrderService {
    async fn submit_order(&self, new_order: NewOrder) -> Result<Order> {
        let order = new_order.into_order(Uuid::new_v4().to_string(), Utc::now().naive_utc())?;

        let order = self
            .ledger
            .execute(move |writer| {
                let portfolio = writer.get_portfolio(&order.portfolio_id)?;
                if portfolio.user_id != order.user_id {
                    return Err(Error::invalid_input(format!(
                        "Portfolio {} does not belong to user {}",
                        portfolio.id, order.user_id
                    )));
                }
                if order.price.currency() != portfolio.currency {
                    return Err(Error::currency_mismatch(
                        order.price.currency(),
                        portfolio.currency,
                    ));
                }
                writer.insert_order(&order)?;
                Ok(order)
            })
            .await?;

        info!(
            "Order {} submitted: {} x {} at {}",
            order.id, order.quantity, order.name, order.price
        );
        self.event_sink.emit(DomainEvent::order_status_changed(
            order.id.clone(),
            order.portfolio_id.clone(),
            None,
            order.status,
        ));
        Ok(order)
    }

    async fn approve(&self, order_id: &str) -> Result<Order> {
        let id = order_id.to_string();
        let position_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let transition = self
            .ledger
            .execute(move |writer| {
                let mut order = writer.get_order(&id)?;
                let from = order.status;
                let position = order
                    .to_new_position(now.date())
                    .into_position(position_id, now)?;
                order.approve(&position, now)?;
                commit_transition(writer, &order, from, OrderAction::Approve)?;

                writer.insert_position(&position)?;
                let portfolio = apply_position_change(
                    writer,
                    &position.portfolio_id,
                    &PositionDelta::added(&position),
                    now,
                )?;
                Ok(Transition {
                    order,
                    from,
                    portfolio: Some(portfolio),
                })
            })
            .await?;

        info!(
            "Order {} approved, position {:?} opened",
            transition.order.id, transition.order.position_id
        );
        self.emit_transition(&transition);
        Ok(transition.order)
    }

    async fn reject(&self, order_id: &str, reason: Option<String>) -> Result<Order> {
        let id = order_id.to_string();
        let now = Utc::now().naive_utc();

        let transition = self
            .ledger
            .execute(move |writer| {
                let mut order = writer.get_order(&id)?;
                let from = order.status;
                order.reject(reason, now)?;
                commit_transition(writer, &order, from, OrderAction::Reject)?;
                Ok(Transition {
                    order,
                    from,
                    portfolio: None,
                })
            })
            .await?;

        info!(
            "Order {} rejected: {}",
            transition.order.id,
            transition
                .order
                .rejection_reason
                .as_deref()
                .unwrap_or("no reason given")
        );
        self.emit_transition(&transition);
        Ok(transition.order)
    }

    async fn complete(&self, order_id: &str) -> Result<Order> {
        self.close(order_id, OrderAction::Complete).await
    }

    async fn mature(&self, order_id: &str) -> Result<Order> {
        self.close(order_id, OrderAction::Mature).await
    }

    async fn mature_due_orders(&self, as_of: NaiveDate) -> Result<Vec<Order>> {
        let now = Utc::now().naive_utc();

        let transitions = self
            .ledger
            .execute(move |writer| {
                let mut matured = Vec::new();
                for order in writer.list_orders_by_status(OrderStatus::Active)? {
                    let position = match &order.position_id {
                        Some(position_id) => find_position(writer, position_id)?,
                        None => None,
                    };
                    let maturity_date = position
                        .and_then(|p| p.maturity_date)
                        .or(order.maturity_date);
                    if maturity_date.map_or(false, |date| date <= as_of) {
                        matured.push(close_order(writer, &order.id, OrderAction::Mature, now)?);
                    }
                }
                Ok(matured)
            })
            .await?;

        debug!(
            "Maturity run as of {} matured {} order(s)",
            as_of,
            transitions.len()
        );
        for transition in &transitions {
            self.emit_transition(transition);
        }
        Ok(transitions.into_iter().map(|t| t.order).collect())
    }

    fn get_order(&self, order_id: &str) -> Result<Order> {
        self.order_repository.get_by_id(order_id)
    }

    fn list_orders(
        &self,
        status: Option<OrderStatus>,
        portfolio_id: Option<&str>,
    ) -> Result<Vec<Order>> {
        self.order_repository.list(status, portfolio_id)
    }
}
