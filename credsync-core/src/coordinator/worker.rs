//! Background persistence worker
//!
//! The worker owns the only path to [`PersistenceGateway::replace`]. It
//! waits on a watch channel that holds the newest validated snapshot, so at
//! most one write is in flight and a snapshot queued during a write
//! supersedes every older one that has not been written yet.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::Instrument;

use super::{PendingSave, SaveReport, SaveStatus};
use crate::notify::{SaveEvent, SaveNotifier};
use crate::persistence::PersistenceGateway;
use crate::tracing::span_names;

/// Waits for queued snapshots, debounces, then writes the latest one.
///
/// Exits once the sender is dropped and the last queued snapshot has been
/// handled.
pub(super) async fn persist_worker(
    gateway: Arc<dyn PersistenceGateway>,
    notifier: Arc<dyn SaveNotifier>,
    mut rx: watch::Receiver<Option<PendingSave>>,
    report_tx: watch::Sender<SaveReport>,
    debounce: Duration,
) {
    loop {
        if rx.changed().await.is_err() {
            break;
        }

        let mut closed = false;
        if !debounce.is_zero() {
            // Restart the quiet period on every new snapshot
            loop {
                tokio::select! {
                    result = rx.changed() => {
                        if result.is_err() {
                            closed = true;
                            break;
                        }
                    }
                    () = tokio::time::sleep(debounce) => break,
                }
            }
        }

        let pending = rx.borrow_and_update().clone();
        if let Some(pending) = pending {
            persist(gateway.as_ref(), notifier.as_ref(), &report_tx, pending).await;
        }

        if closed {
            break;
        }
    }

    tracing::debug!("Persistence worker stopped");
}

async fn persist(
    gateway: &dyn PersistenceGateway,
    notifier: &dyn SaveNotifier,
    report_tx: &watch::Sender<SaveReport>,
    pending: PendingSave,
) {
    let PendingSave {
        generation,
        snapshot,
    } = pending;
    let record_count = snapshot.len();
    let span = tracing::info_span!(
        span_names::SAVE_PERSIST,
        generation,
        record_count,
        gateway = gateway.gateway_id()
    );

    let result = gateway
        .replace(snapshot.records())
        .instrument(span.clone())
        .await;

    match result {
        Ok(()) => {
            tracing::info!(parent: &span, "Collection saved");
            report_tx.send_replace(SaveReport {
                generation,
                status: SaveStatus::Saved {
                    at: Utc::now(),
                    record_count,
                },
            });
            notifier.notify(SaveEvent::Saved {
                generation,
                record_count,
            });
        }
        Err(e) => {
            let reason = e.to_string();
            tracing::error!(parent: &span, error = %reason, "Failed to persist collection");
            report_tx.send_replace(SaveReport {
                generation,
                status: SaveStatus::Failed {
                    reason: reason.clone(),
                    snapshot,
                },
            });
            notifier.notify(SaveEvent::Failed { generation, reason });
        }
    }
}
