//! SQLite implementation of the ledger's atomic unit of work.

mod store;
mod writer;

pub use store::SqliteLedgerStore;
pub use writer::SqliteLedgerWriter;
