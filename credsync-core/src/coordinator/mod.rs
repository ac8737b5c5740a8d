//! Save coordinator
//!
//! The [`SaveCoordinator`] owns the [`CollectionState`] and turns UI events
//! into save cycles:
//!
//! ```text
//! Idle -> Validating -> Saved           -> Idle
//!                    -> RejectedInvalid -> Idle
//! ```
//!
//! A cycle queues a snapshot for persistence only when the whole collection
//! validates. One invalid record blocks saving every other record, including
//! valid edits made in the same session.
//!
//! Persistence runs on a single background worker. The coordinator never
//! waits for a write; [`SaveCoordinator::flush`] does.

mod worker;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::collection::{CollectionState, EntryKey, FieldUpdate};
use crate::config::PersistenceSettings;
use crate::error::{FieldError, SaveError, SaveResult, ValidationErrors};
use crate::models::AccountType;
use crate::notify::SaveNotifier;
use crate::persistence::PersistenceGateway;
use crate::schema::{FieldPath, RecordField};
use crate::tracing::span_names;
use crate::validation::{ValidatedSnapshot, ValidationEngine};

/// Phase of a save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    /// No cycle running
    #[default]
    Idle,
    /// Running field or collection validation
    Validating,
    /// The collection validated and a snapshot was queued
    Saved,
    /// Validation failed; nothing was queued
    RejectedInvalid,
}

/// Result of one save cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The committed field failed its own rule; the collection was not checked
    FieldInvalid(FieldError),
    /// The collection has invalid fields; nothing was queued
    Rejected(ValidationErrors),
    /// A snapshot was queued for persistence
    Queued {
        /// Generation of the queued snapshot
        generation: u64,
    },
}

impl CycleOutcome {
    /// Returns true if a snapshot was queued
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }

    /// Generation of the queued snapshot, if any
    #[must_use]
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::Queued { generation } => Some(*generation),
            Self::FieldInvalid(_) | Self::Rejected(_) => None,
        }
    }
}

/// Status of the newest completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing has been written since startup
    Idle,
    /// The write succeeded
    Saved {
        /// Completion time
        at: DateTime<Utc>,
        /// Number of records written
        record_count: usize,
    },
    /// The write failed; the snapshot is kept for [`SaveCoordinator::retry_failed_save`]
    Failed {
        /// Error description
        reason: String,
        /// The snapshot that failed to write
        snapshot: ValidatedSnapshot,
    },
}

/// Report published by the persistence worker after each write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Newest generation the worker has handled (0 before the first write)
    pub generation: u64,
    /// Outcome of that write
    pub status: SaveStatus,
}

impl SaveReport {
    const fn initial() -> Self {
        Self {
            generation: 0,
            status: SaveStatus::Idle,
        }
    }

    /// Returns true if the newest write succeeded
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self.status, SaveStatus::Saved { .. })
    }

    /// Returns true if the newest write failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, SaveStatus::Failed { .. })
    }
}

/// Snapshot queued for the worker
#[derive(Debug, Clone)]
struct PendingSave {
    generation: u64,
    snapshot: ValidatedSnapshot,
}

/// Orchestrates edit → validate → conditional persist
#[derive(Debug)]
pub struct SaveCoordinator {
    collection: CollectionState,
    engine: ValidationEngine,
    /// Errors retained for display
    errors: ValidationErrors,
    state: SaveState,
    /// End state of the most recent cycle
    last_cycle: Option<SaveState>,
    /// Generation of the newest queued snapshot
    generation: u64,
    pending_tx: watch::Sender<Option<PendingSave>>,
    report_rx: watch::Receiver<SaveReport>,
    worker: JoinHandle<()>,
}

impl SaveCoordinator {
    /// Loads the collection from `gateway` and starts the persistence worker.
    ///
    /// `gateway.load()` is called exactly once. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Persistence` if loading fails.
    pub async fn start(
        gateway: Arc<dyn PersistenceGateway>,
        notifier: Arc<dyn SaveNotifier>,
        settings: &PersistenceSettings,
    ) -> SaveResult<Self> {
        Self::start_with_engine(gateway, notifier, settings, ValidationEngine::new()).await
    }

    /// Like [`start`](Self::start) with a custom validation engine
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Persistence` if loading fails.
    pub async fn start_with_engine(
        gateway: Arc<dyn PersistenceGateway>,
        notifier: Arc<dyn SaveNotifier>,
        settings: &PersistenceSettings,
        engine: ValidationEngine,
    ) -> SaveResult<Self> {
        let span = tracing::info_span!(
            span_names::COLLECTION_LOAD,
            gateway = gateway.gateway_id()
        );
        let records = gateway.load().instrument(span).await?;
        let collection = CollectionState::from_records(records);
        tracing::info!(
            record_count = collection.len(),
            gateway = gateway.gateway_id(),
            "Collection loaded"
        );

        let (pending_tx, pending_rx) = watch::channel(None);
        let (report_tx, report_rx) = watch::channel(SaveReport::initial());
        let worker = tokio::spawn(worker::persist_worker(
            gateway,
            notifier,
            pending_rx,
            report_tx,
            settings.debounce(),
        ));

        Ok(Self {
            collection,
            engine,
            errors: ValidationErrors::new(),
            state: SaveState::Idle,
            last_cycle: None,
            generation: 0,
            pending_tx,
            report_rx,
            worker,
        })
    }

    // ========== UI Events ==========

    /// Appends an empty local record. Does not start a save cycle.
    pub fn add_record(&mut self) -> EntryKey {
        self.collection.add_record()
    }

    /// Replaces one field in place. Does not validate or persist.
    ///
    /// A `FieldUpdate::Type` is a type change and runs a save cycle through
    /// [`change_type`](Self::change_type); its outcome is reflected in
    /// [`errors`](Self::errors) and [`last_cycle`](Self::last_cycle).
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Collection` if `index` is out of bounds.
    pub fn update_field(&mut self, index: usize, update: FieldUpdate) -> SaveResult<()> {
        if let FieldUpdate::Type(kind) = update {
            self.change_type(index, kind)?;
            return Ok(());
        }
        self.collection.update_field(index, update)?;
        Ok(())
    }

    /// Field blur: validates the committed field, then the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Collection` if `index` is out of bounds.
    pub fn commit_field(&mut self, index: usize, field: RecordField) -> SaveResult<CycleOutcome> {
        self.collection.key_at(index)?;
        let _span = tracing::info_span!(
            span_names::SAVE_CYCLE,
            trigger = "commit",
            record_index = index,
            field = %field
        )
        .entered();

        self.transition(SaveState::Validating);
        if let Err(error) = self.engine.validate_field(&self.collection, index, field) {
            tracing::debug!(path = %error.path, "Committed field is invalid");
            self.errors.insert(error.clone());
            self.finish(SaveState::RejectedInvalid);
            return Ok(CycleOutcome::FieldInvalid(error));
        }
        self.errors.clear_path(FieldPath::new(index, field));

        Ok(self.validate_and_queue())
    }

    /// Changes the account type of a record and saves if the collection is valid.
    ///
    /// Switching to directory drops the password immediately.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Collection` if `index` is out of bounds.
    pub fn change_type(&mut self, index: usize, kind: AccountType) -> SaveResult<CycleOutcome> {
        self.collection
            .update_field(index, FieldUpdate::Type(kind))?;
        let _span = tracing::info_span!(
            span_names::SAVE_CYCLE,
            trigger = "type_change",
            record_index = index,
            kind = %kind
        )
        .entered();

        self.transition(SaveState::Validating);
        Ok(self.validate_and_queue())
    }

    /// Removes a record and saves the remaining collection if it is valid.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Collection` if `index` is out of bounds.
    pub fn remove_record(&mut self, index: usize) -> SaveResult<CycleOutcome> {
        let removed = self.collection.remove(index)?;
        let _span = tracing::info_span!(
            span_names::SAVE_CYCLE,
            trigger = "remove",
            record_index = index,
            key = %removed.key
        )
        .entered();

        self.transition(SaveState::Validating);
        Ok(self.validate_and_queue())
    }

    /// Explicit save request
    pub fn request_save(&mut self) -> CycleOutcome {
        let _span = tracing::info_span!(span_names::SAVE_CYCLE, trigger = "request").entered();

        self.transition(SaveState::Validating);
        self.validate_and_queue()
    }

    // ========== Persistence ==========

    /// Waits until the worker has handled the newest queued snapshot
    ///
    /// # Errors
    ///
    /// Returns `SaveError::WorkerStopped` if the worker exited first.
    pub async fn flush(&mut self) -> SaveResult<SaveReport> {
        let target = self.generation;
        let report = self
            .report_rx
            .wait_for(|report| report.generation >= target)
            .await
            .map_err(|_| SaveError::WorkerStopped)?;
        Ok(report.clone())
    }

    /// Re-queues the snapshot of a failed write.
    ///
    /// Returns the new generation, or `None` if the newest write did not fail
    /// or a newer snapshot has been queued since.
    pub fn retry_failed_save(&mut self) -> Option<u64> {
        let report = self.report_rx.borrow().clone();
        match report.status {
            SaveStatus::Failed { snapshot, .. } if report.generation == self.generation => {
                tracing::info!(
                    failed_generation = report.generation,
                    "Retrying failed save"
                );
                Some(self.queue(snapshot))
            }
            _ => None,
        }
    }

    /// Flushes pending writes and stops the worker
    ///
    /// # Errors
    ///
    /// Returns `SaveError::WorkerStopped` if the worker exited early or panicked.
    pub async fn shutdown(mut self) -> SaveResult<SaveReport> {
        let report = self.flush().await;
        let Self {
            pending_tx, worker, ..
        } = self;
        drop(pending_tx);
        worker.await.map_err(|e| {
            tracing::error!(error = %e, "Persistence worker panicked");
            SaveError::WorkerStopped
        })?;
        report
    }

    // ========== Accessors ==========

    /// The collection being edited
    #[must_use]
    pub const fn collection(&self) -> &CollectionState {
        &self.collection
    }

    /// Errors retained from the most recent cycles
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Current cycle phase; `Idle` between events
    #[must_use]
    pub const fn state(&self) -> SaveState {
        self.state
    }

    /// End state of the most recent cycle (`Saved` or `RejectedInvalid`)
    #[must_use]
    pub const fn last_cycle(&self) -> Option<SaveState> {
        self.last_cycle
    }

    /// Generation of the newest queued snapshot
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Newest report from the worker
    #[must_use]
    pub fn last_report(&self) -> SaveReport {
        self.report_rx.borrow().clone()
    }

    // ========== Cycle internals ==========

    fn validate_and_queue(&mut self) -> CycleOutcome {
        match self.engine.validate_all(&self.collection) {
            Ok(snapshot) => {
                self.errors = ValidationErrors::new();
                let generation = self.queue(snapshot);
                self.finish(SaveState::Saved);
                CycleOutcome::Queued { generation }
            }
            Err(errors) => {
                tracing::debug!(
                    error_count = errors.len(),
                    "Collection invalid, save blocked"
                );
                self.errors = errors.clone();
                self.finish(SaveState::RejectedInvalid);
                CycleOutcome::Rejected(errors)
            }
        }
    }

    fn queue(&mut self, snapshot: ValidatedSnapshot) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        tracing::debug!(
            generation,
            record_count = snapshot.len(),
            "Snapshot queued"
        );
        self.pending_tx.send_replace(Some(PendingSave {
            generation,
            snapshot,
        }));
        generation
    }

    fn finish(&mut self, end: SaveState) {
        self.transition(end);
        self.last_cycle = Some(end);
        self.transition(SaveState::Idle);
    }

    fn transition(&mut self, next: SaveState) {
        tracing::trace!(from = ?self.state, to = ?next, "Save state transition");
        self.state = next;
    }
}
