use async_trait::async_trait;
use std::any::Any;

use super::writer::SqliteLedgerWriter;
use crate::db::WriteHandle;
use brokerage_core::errors::Result;
use brokerage_core::ledger::{LedgerJob, LedgerStoreTrait};

/// Ledger backed by SQLite. Every job runs on the writer actor inside one
/// immediate transaction, so jobs are serialized and all-or-nothing.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    writer: WriteHandle,
}

impl SqliteLedgerStore {
    pub fn new(writer: WriteHandle) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl LedgerStoreTrait for SqliteLedgerStore {
    async fn execute_boxed(&self, job: LedgerJob) -> Result<Box<dyn Any + Send>> {
        self.writer
            .exec(move |conn| job(&mut SqliteLedgerWriter::new(conn)))
            .await
    }
}
