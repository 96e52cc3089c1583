//! The API key and its change notifications.
//!
//! One [`CredentialContext`] is created by the composition root and cloned
//! into every component. Each set bumps a [`CredentialEpoch`]; components
//! remember the epoch a request was issued under and drop the response if
//! it has moved on.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::infra::error::{ApiError, ApiResult};

/// Secret sent in the `X-API-Key` header. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank input yields `None`; a blank key is the same as no key.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Monotonic generation of the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CredentialEpoch(u64);

impl CredentialEpoch {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
struct CredentialState {
    key: Option<Arc<ApiKey>>,
    epoch: CredentialEpoch,
}

#[derive(Clone)]
pub struct CredentialContext {
    tx: Arc<watch::Sender<CredentialState>>,
}

impl fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.tx.borrow();
        f.debug_struct("CredentialContext")
            .field("has_key", &state.key.is_some())
            .field("epoch", &state.epoch)
            .finish()
    }
}

impl Default for CredentialContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CredentialContext {
    pub fn new(initial: Option<&str>) -> Self {
        let state = CredentialState {
            key: initial.and_then(ApiKey::new).map(Arc::new),
            epoch: CredentialEpoch::default(),
        };
        let (tx, _) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the key and notify subscribers. Setting the same key again
    /// is a no-op and returns the unchanged epoch.
    pub fn set(&self, raw: &str) -> CredentialEpoch {
        let next = ApiKey::new(raw).map(Arc::new);
        let mut epoch = self.epoch();
        self.tx.send_if_modified(|state| {
            if state.key == next {
                return false;
            }
            state.key = next.clone();
            state.epoch = CredentialEpoch(state.epoch.0 + 1);
            epoch = state.epoch;
            true
        });
        log::info!(
            "[Credentials] API key {} (epoch {})",
            if next.is_some() { "set" } else { "cleared" },
            epoch.value()
        );
        epoch
    }

    pub fn clear(&self) -> CredentialEpoch {
        self.set("")
    }

    pub fn current(&self) -> Option<Arc<ApiKey>> {
        self.tx.borrow().key.clone()
    }

    pub fn epoch(&self) -> CredentialEpoch {
        self.tx.borrow().epoch
    }

    pub fn is_set(&self) -> bool {
        self.tx.borrow().key.is_some()
    }

    /// The key plus the epoch to stamp an outgoing request with.
    pub fn require(&self) -> ApiResult<(Arc<ApiKey>, CredentialEpoch)> {
        let state = self.tx.borrow();
        state
            .key
            .clone()
            .map(|key| (key, state.epoch))
            .ok_or(ApiError::MissingCredential)
    }

    pub fn is_current(&self, epoch: CredentialEpoch) -> bool {
        self.epoch() == epoch
    }

    /// Receiver that wakes on every credential change.
    pub fn subscribe(&self) -> CredentialChanges {
        CredentialChanges {
            rx: self.tx.subscribe(),
        }
    }
}

/// Subscription handed to components that reload on credential changes.
#[derive(Debug)]
pub struct CredentialChanges {
    rx: watch::Receiver<CredentialState>,
}

impl CredentialChanges {
    /// Waits for the next change and returns its epoch and whether a key is
    /// now present. `None` once the context has been dropped.
    pub async fn changed(&mut self) -> Option<(CredentialEpoch, bool)> {
        self.rx.changed().await.ok()?;
        let state = self.rx.borrow_and_update();
        Some((state.epoch, state.key.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_count_as_absent() {
        let ctx = CredentialContext::new(Some("   "));
        assert!(!ctx.is_set());
        assert_eq!(ctx.require().unwrap_err(), ApiError::MissingCredential);
    }

    #[test]
    fn changing_the_key_bumps_the_epoch_once() {
        let ctx = CredentialContext::new(None);
        let first = ctx.set("alpha");
        assert_eq!(first.value(), 1);
        assert_eq!(ctx.set(" alpha "), first);

        let second = ctx.set("beta");
        assert!(second > first);
        assert!(!ctx.is_current(first));
        assert_eq!(ctx.current().unwrap().expose(), "beta");
    }

    #[test]
    fn debug_output_never_contains_the_key() {
        let ctx = CredentialContext::new(Some("hunter2"));
        let key = ctx.current().unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(!format!("{ctx:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let ctx = CredentialContext::new(None);
        let mut changes = ctx.subscribe();
        ctx.set("k1");
        assert_eq!(
            changes.changed().await,
            Some((CredentialEpoch(1), true))
        );
        ctx.clear();
        assert_eq!(
            changes.changed().await,
            Some((CredentialEpoch(2), false))
        );
    }
}
