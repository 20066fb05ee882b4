use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{kinds::ActivityKind, repo};

#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub user_id: Uuid,
    pub kind: ActivityKind,
    pub details: Option<Value>,
}

impl ActivityEvent {
    pub fn new(user_id: Uuid, kind: ActivityKind) -> Self {
        Self {
            user_id,
            kind,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Best-effort activity log writer.
///
/// `record` never blocks and never fails the caller: events are queued on a
/// bounded channel and written by a single background task. A full or closed
/// queue drops the event with a warning, as does a failed insert.
#[derive(Clone)]
pub struct ActivityLogger {
    tx: mpsc::Sender<ActivityEvent>,
}

impl ActivityLogger {
    /// Logger plus the receiving end, without a worker attached.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ActivityEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Logger backed by a worker task writing to `user_activities`.
    pub fn spawn(db: PgPool, capacity: usize) -> Self {
        let (logger, rx) = Self::channel(capacity);
        tokio::spawn(run_worker(db, rx));
        logger
    }

    pub fn record(&self, event: ActivityEvent) {
        if let Err(e) = self.tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(ev) => {
                    warn!(
                        user_id = %ev.user_id,
                        action = ev.kind.as_str(),
                        "activity queue full, dropping event"
                    );
                }
                mpsc::error::TrySendError::Closed(ev) => {
                    warn!(
                        user_id = %ev.user_id,
                        action = ev.kind.as_str(),
                        "activity queue closed, dropping event"
                    );
                }
            }
        }
    }
}

async fn run_worker(db: PgPool, mut rx: mpsc::Receiver<ActivityEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = repo::insert(&db, &event).await {
            warn!(
                error = %e,
                user_id = %event.user_id,
                action = event.kind.as_str(),
                "activity logging failed"
            );
        }
    }
    debug!("activity worker stopped");
}
