//! Ledger module - atomic units of work over portfolios, positions and orders.
//!
//! Every mutating service operation runs as one job on a [`LedgerStoreTrait`].
//! The job sees a [`LedgerWriter`] whose changes become visible together when
//! the job returns `Ok`, or not at all.

mod ledger_memory;
mod ledger_ops;
mod ledger_traits;

pub use ledger_memory::InMemoryLedgerStore;
pub use ledger_ops::{apply_position_change, close_originating_order, find_position};
pub use ledger_traits::{LedgerJob, LedgerStoreTrait, LedgerWriter};
