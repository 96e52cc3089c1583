use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use orderdesk_model::prelude::{ScrapeRequest, WorkflowStatus};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::outcome::{
    Classification, JobKind, WorkflowError, WorkflowJob, WorkflowOutcome,
    WorkflowReport, classify, success_message,
};
use crate::common::{EventBus, OpStatus, PanelEvent};
use crate::domains::notifications::NotificationBus;
use crate::infra::credential::{CredentialContext, CredentialEpoch};
use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// The workflow currently being polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowHandle {
    pub id: String,
    pub job: WorkflowJob,
    pub status: WorkflowStatus,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    handle: Option<WorkflowHandle>,
    status: OpStatus,
}

#[derive(Debug)]
struct OrchestratorInner {
    api: Arc<dyn ApiService>,
    credentials: CredentialContext,
    notifications: NotificationBus,
    events: EventBus,
    settings: OrchestratorSettings,
    state: Mutex<OrchestratorState>,
}

/// A started workflow whose poll loop runs in the background.
#[derive(Debug)]
pub struct WorkflowTicket {
    workflow_id: String,
    task: JoinHandle<Result<WorkflowReport, WorkflowError>>,
}

impl WorkflowTicket {
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub async fn wait(self) -> Result<WorkflowReport, WorkflowError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(WorkflowError::Abandoned {
                workflow_id: self.workflow_id,
                reason: err.to_string(),
            }),
        }
    }
}

/// Starts one workflow at a time and polls it until it settles.
///
/// Every settlement produces exactly one toast. Only successful ones
/// (partial scrapes included) publish [`PanelEvent::WorkflowSucceeded`].
#[derive(Debug, Clone)]
pub struct WorkflowOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl WorkflowOrchestrator {
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        notifications: NotificationBus,
        events: EventBus,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                api,
                credentials,
                notifications,
                events,
                settings,
                state: Mutex::new(OrchestratorState::default()),
            }),
        }
    }

    pub fn status(&self) -> OpStatus {
        self.inner.state.lock().status
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn current_handle(&self) -> Option<WorkflowHandle> {
        self.inner.state.lock().handle.clone()
    }

    /// Start `job` and wait for it to settle.
    pub async fn run(
        &self,
        job: WorkflowJob,
    ) -> Result<WorkflowReport, WorkflowError> {
        self.start(job).await?.wait().await
    }

    /// Issue the start request and hand back a ticket for the poll loop.
    ///
    /// Fails without any request when the input is invalid, the credential
    /// is missing, or another workflow is still in flight.
    pub async fn start(
        &self,
        job: WorkflowJob,
    ) -> Result<WorkflowTicket, WorkflowError> {
        let kind = job.kind();
        if let Err(err) = job.validate() {
            return Err(self.reject(err.into()));
        }
        let epoch = match self.inner.credentials.require() {
            Ok((_, epoch)) => epoch,
            Err(err) => return Err(self.reject(err.into())),
        };

        {
            let mut state = self.inner.state.lock();
            if state.status.is_busy() {
                let current = state
                    .handle
                    .as_ref()
                    .map(|handle| handle.id.clone())
                    .unwrap_or_else(|| "starting".to_string());
                drop(state);
                return Err(self.reject(WorkflowError::Busy(current)));
            }
            state.status = OpStatus::Loading;
            state.handle = None;
        }

        let triggered = match self.trigger(&job).await {
            Ok(triggered) => triggered,
            Err(err) => {
                warn!("[Orchestrator] Failed to start {}: {}", kind, err);
                self.inner.state.lock().status = OpStatus::Error;
                self.inner
                    .notifications
                    .error(format!("Failed to start {}: {}", kind, err));
                return Err(WorkflowError::Start(err));
            }
        };

        let workflow_id = triggered.workflow_id;
        info!("[Orchestrator] {} started as {}", kind, workflow_id);
        self.inner.state.lock().handle = Some(WorkflowHandle {
            id: workflow_id.clone(),
            job,
            status: WorkflowStatus::Running,
            attempts: 0,
            started_at: Utc::now(),
        });

        let this = self.clone();
        let id = workflow_id.clone();
        let task =
            tokio::spawn(async move { this.poll(id, kind, epoch).await });

        Ok(WorkflowTicket { workflow_id, task })
    }

    async fn trigger(
        &self,
        job: &WorkflowJob,
    ) -> ApiResult<orderdesk_model::prelude::WorkflowTriggered> {
        let api = &self.inner.api;
        match job {
            WorkflowJob::Scrape { order_list_url } => {
                let request = ScrapeRequest::new(order_list_url.as_deref())?;
                api.start_scrape(&request).await
            }
            WorkflowJob::ConvertExport { export_id } => {
                api.convert_export(*export_id).await
            }
            WorkflowJob::UploadOrder { order_id } => {
                api.upload_order(*order_id).await
            }
        }
    }

    async fn poll(
        &self,
        workflow_id: String,
        kind: JobKind,
        epoch: CredentialEpoch,
    ) -> Result<WorkflowReport, WorkflowError> {
        let settings = self.inner.settings;

        for attempt in 1..=settings.max_attempts {
            tokio::time::sleep(settings.poll_interval).await;
            if !self.inner.credentials.is_current(epoch) {
                return Err(self.abandon(&workflow_id));
            }

            let response = self.inner.api.workflow_status(&workflow_id).await;
            if !self.inner.credentials.is_current(epoch) {
                return Err(self.abandon(&workflow_id));
            }

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    debug!(
                        "[Orchestrator] Poll {}/{} for {} failed: {}",
                        attempt, settings.max_attempts, workflow_id, err
                    );
                    self.record(attempt, None);
                    continue;
                }
            };
            self.record(attempt, Some(response.status));

            match classify(kind, &response) {
                Classification::Pending => continue,
                Classification::Succeeded(outcome) => {
                    return Ok(
                        self.succeed(workflow_id, kind, outcome, attempt)
                    );
                }
                Classification::Failed { status, message } => {
                    return Err(
                        self.fail(WorkflowError::Failed { status, message })
                    );
                }
            }
        }

        Err(self.fail(WorkflowError::TimedOut {
            workflow_id,
            attempts: settings.max_attempts,
        }))
    }

    fn record(&self, attempt: u32, status: Option<WorkflowStatus>) {
        let mut state = self.inner.state.lock();
        if let Some(handle) = state.handle.as_mut() {
            handle.attempts = attempt;
            if let Some(status) = status {
                handle.status = status;
            }
        }
    }

    fn succeed(
        &self,
        workflow_id: String,
        kind: JobKind,
        outcome: WorkflowOutcome,
        attempts: u32,
    ) -> WorkflowReport {
        let message = success_message(kind, &outcome);
        info!("[Orchestrator] {} completed: {}", workflow_id, message);
        {
            let mut state = self.inner.state.lock();
            state.handle = None;
            state.status = OpStatus::Success;
        }
        self.inner.notifications.success(message.clone());
        self.inner.events.publish(PanelEvent::WorkflowSucceeded(kind));

        WorkflowReport {
            workflow_id,
            kind,
            outcome,
            message,
            attempts,
        }
    }

    fn fail(&self, err: WorkflowError) -> WorkflowError {
        warn!("[Orchestrator] {}", err);
        {
            let mut state = self.inner.state.lock();
            state.handle = None;
            state.status = OpStatus::Error;
        }
        self.inner.notifications.error(err.to_string());
        err
    }

    /// The credential changed under the poll loop; stop without a toast.
    fn abandon(&self, workflow_id: &str) -> WorkflowError {
        info!(
            "[Orchestrator] Abandoning {} after credential change",
            workflow_id
        );
        {
            let mut state = self.inner.state.lock();
            state.handle = None;
            state.status = OpStatus::Idle;
        }
        WorkflowError::Abandoned {
            workflow_id: workflow_id.to_string(),
            reason: "credential changed".to_string(),
        }
    }

    fn reject(&self, err: WorkflowError) -> WorkflowError {
        self.inner.notifications.error(err.to_string());
        err
    }
}
