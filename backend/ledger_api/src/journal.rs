//! Event journal: the ledger's [`EventSink`] and the background task that
//! persists what it receives.
//!
//! `publish` is called while the ledger holds a campaign lock, so it only
//! enqueues. A single writer drains the queue, which keeps row ids in
//! publication order.

use milestone_escrow::{EventSink, LedgerEvent};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db;
use crate::events::NewEvent;

pub struct JournalSink {
    tx: UnboundedSender<LedgerEvent>,
}

impl JournalSink {
    pub fn new(tx: UnboundedSender<LedgerEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for JournalSink {
    fn publish(&self, event: LedgerEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            warn!(kind = event.kind(), "journal writer stopped; event not persisted");
        }
    }
}

/// Create the sink and spawn its writer.
pub fn start(pool: SqlitePool, shutdown: CancellationToken) -> (JournalSink, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(pool, rx, shutdown));
    (JournalSink::new(tx), handle)
}

/// Persist events until `shutdown` fires or every sender is gone, then flush
/// whatever is still queued.
pub async fn run(
    pool: SqlitePool,
    mut rx: UnboundedReceiver<LedgerEvent>,
    shutdown: CancellationToken,
) {
    info!("Event journal starting");

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(event) => persist(&pool, &event).await,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }

    rx.close();
    let mut drained = 0usize;
    while let Some(event) = rx.recv().await {
        persist(&pool, &event).await;
        drained += 1;
    }
    info!(drained, "Event journal stopped");
}

async fn persist(pool: &SqlitePool, event: &LedgerEvent) {
    let row = match NewEvent::from_ledger(event) {
        Ok(row) => row,
        Err(e) => {
            error!(kind = event.kind(), "Journal encode error: {e}");
            return;
        }
    };
    match db::insert_event(pool, &row).await {
        Ok(id) => debug!(id, kind = %row.event_type, "event journaled"),
        Err(e) => error!(kind = %row.event_type, "Journal write error: {e}"),
    }
}
