use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use orderdesk_model::prelude::{ScheduleCreate, ScheduleEntry, ScheduleList};
use parking_lot::Mutex;

use crate::common::{EventBus, OpStatus, PanelEvent};
use crate::domains::notifications::NotificationBus;
use crate::infra::credential::{ApiKey, CredentialContext, CredentialEpoch};
use crate::infra::error::{ApiError, ApiResult};
use crate::infra::services::ApiService;

/// Anything that can push the cached schedules into the external
/// scheduler. The config synchronizer depends on this rather than on the
/// coordinator itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleSync: Send + Sync {
    async fn sync(&self) -> ApiResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleSnapshot {
    pub entries: Vec<ScheduleEntry>,
    /// Whether the server reports the entries as installed.
    pub active: bool,
    pub status: OpStatus,
}

impl ScheduleSnapshot {
    /// Entries exist but the scheduler has not been told about them yet.
    /// A normal state, shown as "configured, not installed".
    pub fn needs_sync(&self) -> bool {
        !self.entries.is_empty() && !self.active
    }
}

#[derive(Debug)]
struct CoordinatorInner {
    api: Arc<dyn ApiService>,
    credentials: CredentialContext,
    notifications: NotificationBus,
    events: EventBus,
    state: Mutex<ScheduleSnapshot>,
    /// Held for the duration of each mutating call.
    serial: tokio::sync::Mutex<()>,
}

/// What a mutation does when another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// User actions are refused with [`ApiError::Busy`].
    Reject,
    /// Follow-up syncs wait their turn.
    Queue,
}

/// Read-only cache of schedule entries plus the server's active flag.
///
/// Every mutation is followed by a full reload; nothing is patched locally,
/// so `enabled` and `active` always come from the server.
#[derive(Debug, Clone)]
pub struct ScheduleCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ScheduleCoordinator {
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        notifications: NotificationBus,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                credentials,
                notifications,
                events,
                state: Mutex::new(ScheduleSnapshot::default()),
                serial: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.inner.state.lock().clone()
    }

    /// Reload entries and the active flag.
    pub async fn refresh(&self) -> ApiResult<()> {
        let (_, epoch) = self.guard_credential()?;
        let result = self.inner.api.list_schedules().await;

        if !self.inner.credentials.is_current(epoch) {
            return Ok(());
        }
        match result {
            Ok(list) => {
                self.apply(list);
                Ok(())
            }
            Err(err) => {
                warn!("[Schedules] Failed to load schedules: {}", err);
                self.set_status(OpStatus::Error);
                self.inner
                    .notifications
                    .error(format!("Failed to load schedules: {}", err));
                Err(err)
            }
        }
    }

    pub async fn add(&self, hour: u8, minute: u8) -> ApiResult<ScheduleEntry> {
        let schedule = match ScheduleCreate::new(hour, minute) {
            Ok(schedule) => schedule,
            Err(err) => return Err(self.reject(err.into())),
        };
        let entry = self
            .mutate(Admission::Reject, |api| async move {
                api.create_schedule(schedule).await
            })
            .await?;
        self.inner
            .notifications
            .success(format!("Schedule {} added", entry.display_text()));
        self.after_mutation().await;
        Ok(entry)
    }

    pub async fn remove(&self, id: i64) -> ApiResult<()> {
        let response = self
            .mutate(Admission::Reject, |api| async move {
                api.delete_schedule(id).await
            })
            .await?;
        self.inner.notifications.success(response.message);
        self.after_mutation().await;
        Ok(())
    }

    pub async fn toggle(&self, id: i64) -> ApiResult<ScheduleEntry> {
        let entry = self
            .mutate(Admission::Reject, |api| async move {
                api.toggle_schedule(id).await
            })
            .await?;
        self.inner.notifications.success(format!(
            "Schedule {} {}",
            entry.display_text(),
            if entry.enabled { "enabled" } else { "disabled" }
        ));
        self.after_mutation().await;
        Ok(entry)
    }

    /// Install the cached entries in the external scheduler. The only
    /// operation that can turn the active flag on.
    pub async fn sync(&self) -> ApiResult<()> {
        self.sync_with(Admission::Reject).await
    }

    async fn sync_with(&self, admission: Admission) -> ApiResult<()> {
        let response = self
            .mutate(admission, |api| async move {
                api.sync_schedules().await
            })
            .await?;
        self.inner.notifications.success(response.message);
        self.after_mutation().await;
        Ok(())
    }

    fn guard_credential(&self) -> ApiResult<(Arc<ApiKey>, CredentialEpoch)> {
        self.inner
            .credentials
            .require()
            .map_err(|err| self.reject(err))
    }

    /// Runs one mutating call, at most one at a time.
    async fn mutate<T, F, Fut>(
        &self,
        admission: Admission,
        call: F,
    ) -> ApiResult<T>
    where
        F: FnOnce(Arc<dyn ApiService>) -> Fut,
        Fut: std::future::Future<Output = ApiResult<T>>,
    {
        self.guard_credential()?;
        let _serial = match admission {
            Admission::Reject => match self.inner.serial.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    return Err(self.reject(ApiError::Busy {
                        component: "Schedules",
                    }));
                }
            },
            Admission::Queue => {
                let guard = self.inner.serial.lock().await;
                // The key may have been cleared while waiting.
                self.guard_credential()?;
                guard
            }
        };
        self.set_status(OpStatus::Loading);

        match call(Arc::clone(&self.inner.api)).await {
            Ok(value) => {
                self.set_status(OpStatus::Success);
                Ok(value)
            }
            Err(err) => {
                warn!("[Schedules] Operation failed: {}", err);
                self.set_status(OpStatus::Error);
                self.inner.notifications.error(err.to_string());
                Err(err)
            }
        }
    }

    async fn after_mutation(&self) {
        self.inner.events.publish(PanelEvent::SchedulesChanged);
        if let Err(err) = self.refresh().await {
            debug!("[Schedules] Reload after mutation failed: {}", err);
        }
    }

    fn apply(&self, list: ScheduleList) {
        let mut state = self.inner.state.lock();
        info!(
            "[Schedules] {} entries, active: {}",
            list.schedules.len(),
            list.schedule_active
        );
        state.entries = list.schedules;
        state.active = list.schedule_active;
        if !state.status.is_busy() {
            state.status = OpStatus::Success;
        }
    }

    fn set_status(&self, status: OpStatus) {
        self.inner.state.lock().status = status;
    }

    fn reject(&self, err: ApiError) -> ApiError {
        self.inner.notifications.error(err.to_string());
        err
    }
}

#[async_trait]
impl ScheduleSync for ScheduleCoordinator {
    /// Waits behind any add, remove or toggle in flight instead of being
    /// refused.
    async fn sync(&self) -> ApiResult<()> {
        self.sync_with(Admission::Queue).await
    }
}
