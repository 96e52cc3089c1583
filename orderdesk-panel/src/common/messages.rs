//! Cross-component events.
//!
//! Components publish what happened; the composition root decides which
//! dependent views to refresh. Nothing here carries payload beyond what the
//! router needs to pick a refresh.

use tokio::sync::broadcast;

use crate::domains::exports::BatchKind;
use crate::domains::workflow::JobKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// A workflow reached COMPLETED and its result reported success,
    /// possibly with failed sub-items.
    WorkflowSucceeded(JobKind),
    /// A batch convert/upload was accepted by the server.
    ExportsTriggered(BatchKind),
    /// The scrape target override was saved.
    ScrapeConfigPersisted,
    /// A schedule was added, removed, toggled or synced.
    SchedulesChanged,
}

/// Broadcast channel shared by every component of one panel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PanelEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: PanelEvent) {
        log::debug!("[Events] Publishing {:?}", event);
        // No receivers simply means nothing is wired to react yet.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.tx.subscribe()
    }
}
