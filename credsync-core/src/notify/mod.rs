//! Save notifications
//!
//! The persistence worker reports every completed write to a
//! [`SaveNotifier`]. A UI typically turns [`SaveEvent::Saved`] into a
//! "saved" toast and [`SaveEvent::Failed`] into an error banner.

use tokio::sync::mpsc;

/// Outcome of one persistence write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    /// The collection was written
    Saved {
        /// Generation of the written snapshot
        generation: u64,
        /// Number of records written
        record_count: usize,
    },
    /// The write failed; the snapshot is retained for retry
    Failed {
        /// Generation of the snapshot that failed to write
        generation: u64,
        /// Error description
        reason: String,
    },
}

impl SaveEvent {
    /// Returns true for a successful save
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    /// Generation the event refers to
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Saved { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// Receives save notifications from the persistence worker
pub trait SaveNotifier: Send + Sync {
    /// Called once per completed write
    fn notify(&self, event: SaveEvent);
}

/// Notifier that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl SaveNotifier for NoopNotifier {
    fn notify(&self, _event: SaveEvent) {}
}

/// Notifier that forwards events over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<SaveEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver for its events
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SaveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SaveNotifier for ChannelNotifier {
    fn notify(&self, event: SaveEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Save notification dropped, receiver closed");
        }
    }
}
