//! Process-wide queue of short-lived user messages.
//!
//! Every outcome that reaches a user goes through here. Each toast removes
//! itself after the configured lifetime; removal timers are independent and
//! later pushes never cancel earlier ones.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
}

/// Creation timestamp plus a process-wide sequence number, so two toasts
/// created in the same millisecond still differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId {
    millis: i64,
    seq: u64,
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct BusInner {
    toasts: Mutex<Vec<Toast>>,
    seq: AtomicU64,
    ttl: Duration,
    tx: broadcast::Sender<Toast>,
}

#[derive(Debug, Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    pub fn new(ttl: Duration) -> Self {
        let (tx, _) = broadcast::channel(128);
        Self {
            inner: Arc::new(BusInner {
                toasts: Mutex::new(Vec::new()),
                seq: AtomicU64::new(0),
                ttl,
                tx,
            }),
        }
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.push(message, ToastKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.push(message, ToastKind::Error)
    }

    pub fn push(&self, message: impl Into<String>, kind: ToastKind) -> ToastId {
        let created_at = Utc::now();
        let id = ToastId {
            millis: created_at.timestamp_millis(),
            seq: self.inner.seq.fetch_add(1, Ordering::Relaxed),
        };
        let toast = Toast {
            id,
            message: message.into(),
            kind,
            created_at,
        };

        match kind {
            ToastKind::Success => {
                log::info!("[Notifications] {}", toast.message)
            }
            ToastKind::Error => log::warn!("[Notifications] {}", toast.message),
        }

        self.inner.toasts.lock().push(toast.clone());
        let _ = self.inner.tx.send(toast);
        self.schedule_removal(id);
        id
    }

    fn schedule_removal(&self, id: ToastId) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!(
                "[Notifications] No runtime; toast {} will not expire",
                id
            );
            return;
        };
        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                inner.toasts.lock().retain(|toast| toast.id != id);
            }
        });
    }

    /// Remove a toast before its timer fires.
    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut toasts = self.inner.toasts.lock();
        let before = toasts.len();
        toasts.retain(|toast| toast.id != id);
        toasts.len() != before
    }

    /// Live toasts in insertion order.
    pub fn snapshot(&self) -> Vec<Toast> {
        self.inner.toasts.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.inner.tx.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test(start_paused = true)]
    async fn ids_are_unique_within_one_millisecond() {
        let bus = NotificationBus::new(Duration::from_secs(4));
        let ids: HashSet<ToastId> =
            (0..100).map(|n| bus.success(format!("toast {n}"))).collect();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn each_toast_expires_on_its_own_timer() {
        let bus = NotificationBus::new(Duration::from_secs(4));
        bus.success("first");

        tokio::time::sleep(Duration::from_secs(3)).await;
        bus.error("second");
        assert_eq!(bus.snapshot().len(), 2);

        // The first toast's timer is not reset by the second push.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let remaining = bus.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "second");
        assert_eq!(remaining[0].kind, ToastKind::Error);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(bus.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_early_and_timer_is_harmless() {
        let bus = NotificationBus::new(Duration::from_secs(4));
        let id = bus.success("bye");
        assert!(bus.dismiss(id));
        assert!(!bus.dismiss(id));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(bus.snapshot().is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_pushes() {
        let bus = NotificationBus::new(Duration::from_secs(4));
        let mut rx = bus.subscribe();
        bus.error("nope");
        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.message, "nope");
    }
}
