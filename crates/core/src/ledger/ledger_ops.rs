use chrono::NaiveDateTime;
use log::debug;

use super::LedgerWriter;
use crate::errors::{DatabaseError, Error, Result};
use crate::orders::{Order, OrderAction, OrderStatus};
use crate::portfolios::Portfolio;
use crate::positions::{Position, PositionDelta};

/// Folds one position mutation into its portfolio, inside the current write.
///
/// Must run after the position itself was written so the reload sees the new
/// state. AUTO portfolios get fresh totals; MANUAL ones get a deferred-change
/// adjustment instead.
pub fn apply_position_change(
    writer: &mut dyn LedgerWriter,
    portfolio_id: &str,
    delta: &PositionDelta,
    now: NaiveDateTime,
) -> Result<Portfolio> {
    let mut portfolio = writer.get_portfolio(portfolio_id)?;
    let positions = writer.load_positions(portfolio_id)?;

    if let Some(adjustment) = portfolio.apply_position_change(delta, &positions, now)? {
        debug!(
            "Portfolio {} is MANUAL, deferring {:?} of position {}",
            portfolio_id, delta.kind, delta.position_id
        );
        writer.insert_adjustment(&adjustment)?;
    }
    writer.update_portfolio(&portfolio)?;
    Ok(portfolio)
}

/// Loads a position, mapping "not found" to `None`.
pub fn find_position(
    writer: &mut dyn LedgerWriter,
    position_id: &str,
) -> Result<Option<Position>> {
    match writer.get_position(position_id) {
        Ok(position) => Ok(Some(position)),
        Err(Error::Database(DatabaseError::NotFound(_))) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Completes the ACTIVE order `position` was created from, if any.
///
/// With `unlink` the order also forgets the position, for when the position
/// row is about to disappear.
pub fn close_originating_order(
    writer: &mut dyn LedgerWriter,
    position: &Position,
    unlink: bool,
    now: NaiveDateTime,
) -> Result<Option<Order>> {
    let order_id = match &position.order_id {
        Some(order_id) => order_id,
        None => return Ok(None),
    };
    let mut order = writer.get_order(order_id)?;
    if order.status != OrderStatus::Active
        || order.position_id.as_deref() != Some(position.id.as_str())
    {
        return Ok(None);
    }
    order.close(OrderAction::Complete, now)?;
    if unlink {
        order.position_id = None;
    }
    if !writer.compare_and_set_order(&order, OrderStatus::Active)? {
        return Err(Error::InvalidOrderState {
            entity_id: order.id.clone(),
            status: writer.get_order(order_id)?.status,
            action: OrderAction::Complete.as_str(),
        });
    }
    debug!(
        "Order {} completed along with position {}",
        order.id, position.id
    );
    Ok(Some(order))
}
