use super::DbPool;
use crate::errors::StorageError;
use brokerage_core::errors::{DatabaseError, Error, Result};
use diesel::SqliteConnection;
use log::error;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the actor's connection and returns a type-erased value.
type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<Box<dyn Any + Send>> + Send + 'static>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job, Reply)>,
}

fn actor_stopped() -> Error {
    Error::Database(DatabaseError::TransactionFailed(
        "Writer actor is not running".to_string(),
    ))
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection,
    /// inside one immediate transaction. The transaction commits only when
    /// the job returns `Ok`.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| actor_stopped())?;

        let boxed = ret_rx.await.map_err(|_| actor_stopped())??;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("Writer actor returned an unexpected type".to_string()))
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
/// The actor owns one connection from the pool and processes jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(Job, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                // Dropping the receiver fails every pending and future job.
                error!("Writer actor could not acquire a connection: {}", e);
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            if let Err(e) = &result {
                if !e.is_domain_error() {
                    error!("Write transaction failed: {}", e);
                }
            }

            // The requester may have gone away; nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
