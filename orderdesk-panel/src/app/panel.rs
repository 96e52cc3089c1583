//! Composition root: owns the credential and every component, and turns
//! component events into the refreshes that depend on them.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use orderdesk_config::PanelConfig;
use orderdesk_model::prelude::HealthStatus;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::common::{EventBus, PanelEvent};
use crate::domains::exports::ExportActions;
use crate::domains::notifications::NotificationBus;
use crate::domains::resources::{CallsStore, OrdersStore};
use crate::domains::schedules::{ScheduleCoordinator, ScheduleSync};
use crate::domains::scrape_config::ConfigSynchronizer;
use crate::domains::workflow::{
    JobKind, OrchestratorSettings, WorkflowError, WorkflowJob,
    WorkflowOrchestrator, WorkflowReport, WorkflowTicket,
};
use crate::infra::credential::{CredentialContext, CredentialEpoch};
use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;

/// The components a refresh can touch, cloned into the router task.
#[derive(Debug, Clone)]
struct Dependents {
    orders: OrdersStore,
    calls: CallsStore,
    schedules: ScheduleCoordinator,
    scrape_config: ConfigSynchronizer,
    exports: ExportActions,
    refresh_delay: Duration,
}

impl Dependents {
    async fn on_event(&self, event: PanelEvent) {
        match event {
            PanelEvent::WorkflowSucceeded(JobKind::Scrape) => {
                let _ = self.orders.go_to_page(0).await;
                let _ = self.exports.refresh_counters().await;
            }
            PanelEvent::WorkflowSucceeded(_) => {
                let _ = self.orders.refresh().await;
                let _ = self.exports.refresh_counters().await;
            }
            PanelEvent::ExportsTriggered(kind) => {
                // Batches run server-side; give them a moment to move
                // items before re-reading.
                debug!(
                    "[Panel] {:?} batch triggered, refreshing in {:?}",
                    kind, self.refresh_delay
                );
                tokio::time::sleep(self.refresh_delay).await;
                let _ = self.exports.refresh_counters().await;
                let _ = self.orders.go_to_page(0).await;
            }
            PanelEvent::ScrapeConfigPersisted
            | PanelEvent::SchedulesChanged => {}
        }
    }

    async fn on_credential_change(
        &self,
        epoch: CredentialEpoch,
        has_key: bool,
    ) {
        info!(
            "[Panel] Credential changed (epoch {}), reloading",
            epoch.value()
        );
        self.orders.clear();
        self.calls.clear();
        self.exports.reset();
        if !has_key {
            return;
        }

        // Each component surfaces its own failures.
        let _ = tokio::join!(
            self.orders.fetch_page(0),
            self.calls.fetch_page(0),
            self.schedules.refresh(),
            self.scrape_config.reload(),
            self.exports.refresh_counters(),
        );
    }
}

/// Everything one panel session needs, wired together.
///
/// Cheap to clone; clones share all state.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    credentials: CredentialContext,
    events: EventBus,
    notifications: NotificationBus,
    api: Arc<dyn ApiService>,
    workflows: WorkflowOrchestrator,
    dependents: Dependents,
    router: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ControlPanel {
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        config: &PanelConfig,
    ) -> Self {
        let timings = config.timings;
        let events = EventBus::default();
        let notifications = NotificationBus::new(timings.toast_ttl);

        let orders = OrdersStore::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            config.page_size,
        );
        let calls = CallsStore::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            config.page_size,
        );
        let schedules = ScheduleCoordinator::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            events.clone(),
        );
        let scrape_config = ConfigSynchronizer::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            events.clone(),
            Arc::new(schedules.clone()) as Arc<dyn ScheduleSync>,
            timings.config_debounce,
        );
        let workflows = WorkflowOrchestrator::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            events.clone(),
            OrchestratorSettings {
                poll_interval: timings.poll_interval,
                max_attempts: timings.max_poll_attempts,
            },
        );
        let exports = ExportActions::new(
            Arc::clone(&api),
            credentials.clone(),
            notifications.clone(),
            events.clone(),
        );

        Self {
            credentials,
            events,
            notifications,
            api,
            workflows,
            dependents: Dependents {
                orders,
                calls,
                schedules,
                scrape_config,
                exports,
                refresh_delay: timings.refresh_delay,
            },
            router: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the event router. Idempotent.
    pub fn start(&self) {
        let mut router = self.router.lock();
        if router.is_some() {
            return;
        }

        let dependents = self.dependents.clone();
        let mut credential_changes = self.credentials.subscribe();
        let mut events = self.events.subscribe();

        *router = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = credential_changes.changed() => match change {
                        Some((epoch, has_key)) => {
                            dependents
                                .on_credential_change(epoch, has_key)
                                .await;
                        }
                        None => break,
                    },
                    event = events.recv() => match event {
                        Ok(event) => {
                            let dependents = dependents.clone();
                            tokio::spawn(async move {
                                dependents.on_event(event).await;
                            });
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("[Panel] Router skipped {} events", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("[Panel] Router stopped");
        }));
    }

    pub fn shutdown(&self) {
        if let Some(router) = self.router.lock().take() {
            router.abort();
        }
    }

    /// Replace the API key. Dependent views reload through the router.
    pub fn set_credential(&self, raw: &str) -> CredentialEpoch {
        self.credentials.set(raw)
    }

    pub fn clear_credential(&self) -> CredentialEpoch {
        self.credentials.clear()
    }

    /// First load of every view. The scrape config is seeded here once.
    pub async fn load_all(&self) {
        let d = &self.dependents;
        let _ = tokio::join!(
            d.orders.fetch_page(0),
            d.calls.fetch_page(0),
            d.schedules.refresh(),
            d.scrape_config.load_initial(),
            d.exports.refresh_counters(),
        );
    }

    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.api.health().await.map_err(|err| {
            self.notifications
                .error(format!("Health check failed: {}", err));
            err
        })
    }

    /// Start a scrape of `order_list_url`. Without one, the stored
    /// override is used, then the default list.
    pub async fn scrape(
        &self,
        order_list_url: Option<String>,
    ) -> Result<WorkflowTicket, WorkflowError> {
        let order_list_url = match order_list_url {
            Some(url) => Some(url),
            None => self.stored_scrape_target().await,
        };
        self.workflows
            .start(WorkflowJob::Scrape { order_list_url })
            .await
    }

    async fn stored_scrape_target(&self) -> Option<String> {
        let sync = &self.dependents.scrape_config;
        if sync.persisted().is_none() {
            if let Err(err) = sync.load_initial().await {
                debug!(
                    "[Panel] Scrape config unavailable, using default: {}",
                    err
                );
            }
        }
        sync.persisted()
            .and_then(|config| config.custom_order_list_url)
    }

    pub async fn convert_export(
        &self,
        export_id: i64,
    ) -> Result<WorkflowReport, WorkflowError> {
        self.workflows
            .run(WorkflowJob::ConvertExport { export_id })
            .await
    }

    pub async fn upload_order(
        &self,
        order_id: i64,
    ) -> Result<WorkflowReport, WorkflowError> {
        self.workflows
            .run(WorkflowJob::UploadOrder { order_id })
            .await
    }

    pub fn credentials(&self) -> &CredentialContext {
        &self.credentials
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    pub fn orders(&self) -> &OrdersStore {
        &self.dependents.orders
    }

    pub fn calls(&self) -> &CallsStore {
        &self.dependents.calls
    }

    pub fn schedules(&self) -> &ScheduleCoordinator {
        &self.dependents.schedules
    }

    pub fn scrape_config(&self) -> &ConfigSynchronizer {
        &self.dependents.scrape_config
    }

    pub fn workflows(&self) -> &WorkflowOrchestrator {
        &self.workflows
    }

    pub fn exports(&self) -> &ExportActions {
        &self.dependents.exports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::testing::{ApiCall, Endpoint, TestApiService};
    use orderdesk_model::prelude::DEFAULT_ORDER_LIST_URL;

    fn panel(key: Option<&str>) -> (TestApiService, ControlPanel) {
        let api = TestApiService::new();
        let panel = ControlPanel::new(
            Arc::new(api.clone()),
            CredentialContext::new(key),
            &PanelConfig::default(),
        );
        panel.start();
        (api, panel)
    }

    #[tokio::test(start_paused = true)]
    async fn credential_change_reloads_every_view() {
        let (api, panel) = panel(None);

        panel.set_credential("fresh");
        tokio::time::sleep(Duration::from_millis(10)).await;

        for endpoint in [
            Endpoint::ListOrders,
            Endpoint::ListCalls,
            Endpoint::ListSchedules,
            Endpoint::GetScrapeConfig,
            Endpoint::PendingConversions,
            Endpoint::PendingUploads,
        ] {
            assert_eq!(api.count(endpoint), 1, "{endpoint:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_credential_clears_views_without_requests() {
        let (api, panel) = panel(Some("key"));

        panel.clear_credential();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(api.calls().is_empty());
        assert_eq!(panel.orders().cursor(), 0);
        assert!(panel.notifications().snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_sync_follows_a_persisted_config_edit() {
        let (api, panel) = panel(Some("key"));

        panel.scrape_config().on_local_edit("https://list.example/orders");
        panel.scrape_config().settled().await;

        let calls = api.calls();
        let put = calls
            .iter()
            .position(|c| c.endpoint() == Endpoint::PutScrapeConfig);
        let sync = calls
            .iter()
            .position(|c| c.endpoint() == Endpoint::SyncSchedules);
        assert!(put.is_some());
        assert!(put < sync);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_scrape_targets_the_stored_override() {
        let (api, panel) = panel(Some("key"));
        api.enqueue_json(
            Endpoint::GetScrapeConfig,
            serde_json::json!({
                "custom_order_list_url": "https://stored.example/list",
                "updated_at": null
            }),
        );

        panel.scrape(None).await.unwrap();

        assert_eq!(
            api.calls_to(Endpoint::StartScrape),
            vec![ApiCall::StartScrape {
                order_list_url: "https://stored.example/list".into(),
            }]
        );
        assert_eq!(api.count(Endpoint::GetScrapeConfig), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_scrape_without_override_uses_the_default_list() {
        let (api, panel) = panel(Some("key"));

        panel.scrape(None).await.unwrap();

        assert_eq!(
            api.calls_to(Endpoint::StartScrape),
            vec![ApiCall::StartScrape {
                order_list_url: DEFAULT_ORDER_LIST_URL.into(),
            }]
        );
    }
}
