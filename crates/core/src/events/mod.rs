//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful ledger commits. Hosts implement the sink to fan events
//! out to notifications, caches or UI refreshes.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
