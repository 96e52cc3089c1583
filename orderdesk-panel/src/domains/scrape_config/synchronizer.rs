use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use orderdesk_model::prelude::{
    ScrapeConfig, ScrapeConfigUpdate, normalize_override,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::common::{EventBus, OpStatus, PanelEvent};
use crate::domains::notifications::NotificationBus;
use crate::domains::schedules::ScheduleSync;
use crate::infra::credential::CredentialContext;
use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigSnapshot {
    /// What the input shows; may be ahead of `persisted`.
    pub draft: String,
    pub persisted: Option<ScrapeConfig>,
    pub status: OpStatus,
    /// The user has typed since the last seed.
    pub edited: bool,
}

impl ConfigSnapshot {
    /// The draft would store a different override than the server holds.
    pub fn is_dirty(&self) -> bool {
        let stored = self
            .persisted
            .as_ref()
            .and_then(|config| config.custom_order_list_url.clone());
        normalize_override(&self.draft) != stored
    }
}

#[derive(Debug, Default)]
struct SyncState {
    snapshot: ConfigSnapshot,
    initial_loaded: bool,
    timer: Option<CancellationToken>,
    generation: u64,
}

struct SynchronizerInner {
    api: Arc<dyn ApiService>,
    credentials: CredentialContext,
    notifications: NotificationBus,
    events: EventBus,
    schedules: Arc<dyn ScheduleSync>,
    debounce: Duration,
    state: Mutex<SyncState>,
    /// Persists run one at a time, in edit order.
    persist_lock: tokio::sync::Mutex<()>,
    idle: watch::Sender<bool>,
}

/// Keeps the scrape target draft and the stored override in step.
///
/// Every edit restarts a single settle timer; when it fires the draft is
/// stored and the external scheduler is re-synced, in that order.
#[derive(Clone)]
pub struct ConfigSynchronizer {
    inner: Arc<SynchronizerInner>,
}

impl std::fmt::Debug for ConfigSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConfigSynchronizer")
            .field("draft", &state.snapshot.draft)
            .field("status", &state.snapshot.status)
            .field("timer_armed", &state.timer.is_some())
            .finish()
    }
}

impl ConfigSynchronizer {
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        notifications: NotificationBus,
        events: EventBus,
        schedules: Arc<dyn ScheduleSync>,
        debounce: Duration,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(SynchronizerInner {
                api,
                credentials,
                notifications,
                events,
                schedules,
                debounce,
                state: Mutex::new(SyncState::default()),
                persist_lock: tokio::sync::Mutex::new(()),
                idle,
            }),
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    pub fn draft(&self) -> String {
        self.inner.state.lock().snapshot.draft.clone()
    }

    pub fn persisted(&self) -> Option<ScrapeConfig> {
        self.inner.state.lock().snapshot.persisted.clone()
    }

    pub fn status(&self) -> OpStatus {
        self.inner.state.lock().snapshot.status
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().snapshot.is_dirty()
    }

    /// Seed the draft from the server. Only the first call does anything.
    pub async fn load_initial(&self) -> ApiResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.initial_loaded {
                return Ok(());
            }
            state.initial_loaded = true;
        }
        self.reload().await
    }

    /// Re-read the stored override. The draft follows it unless the user
    /// has already typed something.
    pub async fn reload(&self) -> ApiResult<()> {
        let (_, epoch) = match self.inner.credentials.require() {
            Ok(credential) => credential,
            Err(err) => {
                self.inner.notifications.error(err.to_string());
                return Err(err);
            }
        };
        let result = self.inner.api.scrape_config().await;
        if !self.inner.credentials.is_current(epoch) {
            return Ok(());
        }

        match result {
            Ok(config) => {
                let mut state = self.inner.state.lock();
                if !state.snapshot.edited {
                    state.snapshot.draft = config.effective_url().to_string();
                }
                debug!(
                    "[ScrapeConfig] Loaded override: {:?}",
                    config.custom_order_list_url
                );
                state.snapshot.persisted = Some(config);
                Ok(())
            }
            Err(err) => {
                warn!("[ScrapeConfig] Failed to load: {}", err);
                self.inner
                    .notifications
                    .error(format!("Failed to load scrape config: {}", err));
                Err(err)
            }
        }
    }

    /// Record a keystroke-level edit and restart the settle timer.
    pub fn on_local_edit(&self, value: impl Into<String>) {
        let value = value.into();
        let token = CancellationToken::new();
        let generation = {
            let mut state = self.inner.state.lock();
            state.snapshot.draft = value.clone();
            state.snapshot.edited = true;
            if let Some(previous) = state.timer.replace(token.clone()) {
                previous.cancel();
            }
            state.generation += 1;
            state.generation
        };
        self.inner.idle.send_replace(false);

        let this = self.clone();
        let debounce = self.inner.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    if let Err(err) = this.persist(value).await {
                        debug!(
                            "[ScrapeConfig] Settled edit not stored: {}",
                            err
                        );
                    }
                    this.finish(generation);
                }
            }
        });
    }

    /// Resolves once no edit is waiting to be persisted.
    pub async fn settled(&self) {
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// Store `value` now, then re-sync schedules.
    pub async fn persist(&self, value: String) -> ApiResult<ScrapeConfig> {
        let _serial = self.inner.persist_lock.lock().await;

        let (_, epoch) = match self.inner.credentials.require() {
            Ok(credential) => credential,
            Err(err) => {
                self.set_status(OpStatus::Error);
                self.inner.notifications.error(err.to_string());
                return Err(err);
            }
        };
        self.set_status(OpStatus::Loading);

        let update = ScrapeConfigUpdate::from_draft(&value);
        info!(
            "[ScrapeConfig] Persisting override: {:?}",
            update.custom_order_list_url
        );

        let stored = match self.inner.api.update_scrape_config(&update).await
        {
            Ok(stored) => stored,
            Err(err) => {
                warn!("[ScrapeConfig] Persist failed: {}", err);
                self.set_status(OpStatus::Error);
                self.inner
                    .notifications
                    .error(format!("Failed to save scrape URL: {}", err));
                return Err(err);
            }
        };
        if !self.inner.credentials.is_current(epoch) {
            debug!("[ScrapeConfig] Credential changed during persist");
            self.set_status(OpStatus::Idle);
            return Ok(stored);
        }

        {
            let mut state = self.inner.state.lock();
            state.snapshot.persisted = Some(stored.clone());
            state.snapshot.status = OpStatus::Success;
        }
        self.inner.notifications.success(
            if stored.custom_order_list_url.is_some() {
                "Scrape URL saved"
            } else {
                "Scrape URL reset to default"
            },
        );

        // Schedules read the target at trigger time; tell the scheduler
        // only after the new value is stored.
        if let Err(err) = self.inner.schedules.sync().await {
            warn!("[ScrapeConfig] Schedule sync after persist failed: {}", err);
        }
        self.inner.events.publish(PanelEvent::ScrapeConfigPersisted);
        Ok(stored)
    }

    fn finish(&self, generation: u64) {
        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.timer = None;
            self.inner.idle.send_replace(true);
        }
    }

    fn set_status(&self, status: OpStatus) {
        self.inner.state.lock().snapshot.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::schedules::ScheduleCoordinator;
    use crate::domains::schedules::coordinator::MockScheduleSync;
    use crate::infra::error::ApiError;
    use crate::infra::testing::{ApiCall, Endpoint, TestApiService};
    use orderdesk_model::prelude::DEFAULT_ORDER_LIST_URL;
    use serde_json::json;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    fn synced_ok() -> Arc<MockScheduleSync> {
        let mut sync = MockScheduleSync::new();
        sync.expect_sync().returning(|| Ok(()));
        Arc::new(sync)
    }

    fn setup(
        schedules: Arc<dyn ScheduleSync>,
    ) -> (TestApiService, ConfigSynchronizer, NotificationBus) {
        let api = TestApiService::new();
        let bus = NotificationBus::new(Duration::from_secs(4));
        let sync = ConfigSynchronizer::new(
            Arc::new(api.clone()),
            CredentialContext::new(Some("key")),
            bus.clone(),
            EventBus::default(),
            schedules,
            DEBOUNCE,
        );
        (api, sync, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_persists_once_with_the_last_value() {
        let (api, sync, _) = setup(synced_ok());

        sync.on_local_edit("https://a.example/list");
        tokio::time::advance(Duration::from_millis(200)).await;
        sync.on_local_edit("https://ab.example/list");
        tokio::time::advance(Duration::from_millis(200)).await;
        sync.on_local_edit("https://abc.example/list");
        assert_eq!(sync.draft(), "https://abc.example/list");

        sync.settled().await;

        assert_eq!(
            api.calls_to(Endpoint::PutScrapeConfig),
            vec![ApiCall::PutScrapeConfig {
                custom_order_list_url: Some("https://abc.example/list".into()),
            }]
        );
        assert!(!sync.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_persisted_before_the_window_closes() {
        let (api, sync, _) = setup(synced_ok());

        sync.on_local_edit("https://a.example/list");
        tokio::time::advance(Duration::from_millis(999)).await;
        tokio::task::yield_now().await;

        assert_eq!(api.count(Endpoint::PutScrapeConfig), 0);
        assert!(sync.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn default_url_is_stored_as_no_override() {
        let (api, sync, bus) = setup(synced_ok());

        sync.on_local_edit(DEFAULT_ORDER_LIST_URL);
        sync.settled().await;
        sync.on_local_edit("   ");
        sync.settled().await;

        assert_eq!(
            api.calls_to(Endpoint::PutScrapeConfig),
            vec![
                ApiCall::PutScrapeConfig {
                    custom_order_list_url: None
                },
                ApiCall::PutScrapeConfig {
                    custom_order_list_url: None
                },
            ]
        );
        assert_eq!(bus.snapshot()[0].message, "Scrape URL reset to default");
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_sync_happens_after_the_put() {
        let api = TestApiService::new();
        let journal = api.clone();
        let mut schedules = MockScheduleSync::new();
        schedules.expect_sync().times(1).returning(move || {
            assert_eq!(journal.count(Endpoint::PutScrapeConfig), 1);
            Ok(())
        });
        let sync = ConfigSynchronizer::new(
            Arc::new(api.clone()),
            CredentialContext::new(Some("key")),
            NotificationBus::new(Duration::from_secs(4)),
            EventBus::default(),
            Arc::new(schedules),
            DEBOUNCE,
        );

        sync.on_local_edit("https://a.example/list");
        sync.settled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_persist_keeps_the_draft_and_skips_sync() {
        let mut schedules = MockScheduleSync::new();
        schedules.expect_sync().never();
        let (api, sync, bus) = setup(Arc::new(schedules));
        api.enqueue_error(
            Endpoint::PutScrapeConfig,
            ApiError::Network("connection refused".into()),
        );

        sync.on_local_edit("https://a.example/list");
        sync.settled().await;

        assert_eq!(sync.draft(), "https://a.example/list");
        assert_eq!(sync.status(), OpStatus::Error);
        assert!(sync.is_dirty());
        assert!(bus.snapshot()[0].message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn credential_change_mid_persist_settles_the_status() {
        let mut schedules = MockScheduleSync::new();
        schedules.expect_sync().never();
        let api = TestApiService::new();
        let credentials = CredentialContext::new(Some("key"));
        let sync = ConfigSynchronizer::new(
            Arc::new(api.clone()),
            credentials.clone(),
            NotificationBus::new(Duration::from_secs(4)),
            EventBus::default(),
            Arc::new(schedules),
            DEBOUNCE,
        );
        let gate = api.enqueue_gated(
            Endpoint::PutScrapeConfig,
            &json!({"custom_order_list_url": "https://a.example/list"}),
        );

        let pending = tokio::spawn({
            let sync = sync.clone();
            async move { sync.persist("https://a.example/list".into()).await }
        });
        while api.count(Endpoint::PutScrapeConfig) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(sync.status(), OpStatus::Loading);
        credentials.set("other");
        gate.release();
        pending.await.unwrap().unwrap();

        assert_eq!(sync.status(), OpStatus::Idle);
        assert!(sync.persisted().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_sync_queues_behind_a_schedule_edit() {
        let api = TestApiService::new();
        let credentials = CredentialContext::new(Some("key"));
        let bus = NotificationBus::new(Duration::from_secs(4));
        let coordinator = ScheduleCoordinator::new(
            Arc::new(api.clone()),
            credentials.clone(),
            bus.clone(),
            EventBus::default(),
        );
        let sync = ConfigSynchronizer::new(
            Arc::new(api.clone()),
            credentials,
            bus.clone(),
            EventBus::default(),
            Arc::new(coordinator.clone()),
            DEBOUNCE,
        );
        let gate = api.enqueue_gated(
            Endpoint::CreateSchedule,
            &json!({
                "id": 1,
                "hour": 6,
                "minute": 0,
                "enabled": true,
                "created_at": "2024-01-01T00:00:00Z",
                "time_display": "06:00"
            }),
        );
        let add = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.add(6, 0).await }
        });
        while api.count(Endpoint::CreateSchedule) == 0 {
            tokio::task::yield_now().await;
        }

        sync.on_local_edit("https://a.example/list");
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(api.count(Endpoint::PutScrapeConfig), 1);
        assert_eq!(api.count(Endpoint::SyncSchedules), 0);

        gate.release();
        sync.settled().await;
        add.await.unwrap().unwrap();

        assert_eq!(api.count(Endpoint::SyncSchedules), 1);
        assert!(
            bus.snapshot()
                .iter()
                .all(|toast| !toast.message.contains("busy"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn initial_load_never_overwrites_an_edit() {
        let (api, sync, _) = setup(synced_ok());
        api.enqueue_json(
            Endpoint::GetScrapeConfig,
            json!({"custom_order_list_url": "https://stored.example/list"}),
        );
        api.enqueue_json(
            Endpoint::GetScrapeConfig,
            json!({"custom_order_list_url": "https://other.example/list"}),
        );

        sync.load_initial().await.unwrap();
        assert_eq!(sync.draft(), "https://stored.example/list");

        sync.on_local_edit("https://typed.example/list");
        sync.load_initial().await.unwrap();
        sync.reload().await.unwrap();

        assert_eq!(sync.draft(), "https://typed.example/list");
        assert_eq!(api.count(Endpoint::GetScrapeConfig), 2);
    }

    #[tokio::test]
    async fn unset_override_seeds_the_default_url() {
        let (_, sync, _) = setup(synced_ok());
        sync.load_initial().await.unwrap();
        assert_eq!(sync.draft(), DEFAULT_ORDER_LIST_URL);
        assert!(!sync.is_dirty());
    }
}
