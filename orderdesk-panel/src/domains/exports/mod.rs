//! Pending-work counters, batch triggers and read-only export lookups.

use std::sync::Arc;

use futures::future::try_join;
use log::{info, warn};
use orderdesk_model::prelude::{
    BatchStatus, BatchTriggered, CallExport, ExportXml, OrderExport,
};
use parking_lot::Mutex;

use crate::common::{EventBus, OpStatus, PanelEvent};
use crate::domains::notifications::NotificationBus;
use crate::infra::credential::{ApiKey, CredentialContext, CredentialEpoch};
use crate::infra::error::{ApiError, ApiResult};
use crate::infra::services::ApiService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Convert,
    Upload,
}

impl BatchKind {
    fn noun(&self) -> &'static str {
        match self {
            BatchKind::Convert => "conversions",
            BatchKind::Upload => "uploads",
        }
    }
}

/// Server-wide pending counts from the dedicated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportCounters {
    pub pending_conversions: u64,
    pub pending_uploads: u64,
    pub status: OpStatus,
    /// Status of the last batch trigger.
    pub batch_status: OpStatus,
}

#[derive(Debug)]
struct ExportsInner {
    api: Arc<dyn ApiService>,
    credentials: CredentialContext,
    notifications: NotificationBus,
    events: EventBus,
    counters: Mutex<ExportCounters>,
}

#[derive(Debug, Clone)]
pub struct ExportActions {
    inner: Arc<ExportsInner>,
}

impl ExportActions {
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        notifications: NotificationBus,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ExportsInner {
                api,
                credentials,
                notifications,
                events,
                counters: Mutex::new(ExportCounters::default()),
            }),
        }
    }

    pub fn counters(&self) -> ExportCounters {
        *self.inner.counters.lock()
    }

    pub fn reset(&self) {
        *self.inner.counters.lock() = ExportCounters::default();
    }

    pub async fn refresh_counters(&self) -> ApiResult<ExportCounters> {
        let (_, epoch) = self.require()?;
        self.inner.counters.lock().status = OpStatus::Loading;

        let result = try_join(
            self.inner.api.pending_conversions(),
            self.inner.api.pending_uploads(),
        )
        .await;
        if !self.inner.credentials.is_current(epoch) {
            return Ok(self.counters());
        }

        match result {
            Ok((conversions, uploads)) => {
                let mut counters = self.inner.counters.lock();
                counters.pending_conversions = conversions.pending_count;
                counters.pending_uploads = uploads.pending_count;
                counters.status = OpStatus::Success;
                Ok(*counters)
            }
            Err(err) => {
                warn!("[Exports] Failed to load pending counts: {}", err);
                self.inner.counters.lock().status = OpStatus::Error;
                self.inner
                    .notifications
                    .error(format!("Failed to load pending counts: {}", err));
                Err(err)
            }
        }
    }

    pub async fn convert_all(&self) -> ApiResult<BatchTriggered> {
        self.trigger(BatchKind::Convert).await
    }

    pub async fn upload_all(&self) -> ApiResult<BatchTriggered> {
        self.trigger(BatchKind::Upload).await
    }

    async fn trigger(&self, kind: BatchKind) -> ApiResult<BatchTriggered> {
        self.require()?;
        {
            let mut counters = self.inner.counters.lock();
            if counters.batch_status.is_busy() {
                drop(counters);
                return Err(self.reject(ApiError::Busy {
                    component: "Exports",
                }));
            }
            counters.batch_status = OpStatus::Loading;
        }

        let result = match kind {
            BatchKind::Convert => self.inner.api.convert_all().await,
            BatchKind::Upload => self.inner.api.upload_all().await,
        };

        match result {
            Ok(batch) => {
                self.inner.counters.lock().batch_status = OpStatus::Success;
                info!(
                    "[Exports] Batch {}: {:?}, {} workflow(s)",
                    kind.noun(),
                    batch.status,
                    batch.triggered_count
                );
                self.inner.notifications.success(batch.message.clone());
                if batch.status == BatchStatus::Triggered {
                    self.inner
                        .events
                        .publish(PanelEvent::ExportsTriggered(kind));
                }
                Ok(batch)
            }
            Err(err) => {
                warn!("[Exports] Batch {} failed: {}", kind.noun(), err);
                self.inner.counters.lock().batch_status = OpStatus::Error;
                self.inner.notifications.error(format!(
                    "Failed to trigger {}: {}",
                    kind.noun(),
                    err
                ));
                Err(err)
            }
        }
    }

    pub async fn order_exports(
        &self,
        order_id: i64,
    ) -> ApiResult<Vec<OrderExport>> {
        self.require_id(order_id, "Order ID")?;
        self.surface(self.inner.api.order_exports(order_id).await)
    }

    pub async fn call_exports(
        &self,
        call_id: i64,
    ) -> ApiResult<Vec<CallExport>> {
        self.require_id(call_id, "Call ID")?;
        self.surface(self.inner.api.call_exports(call_id).await)
    }

    pub async fn export_xml(&self, export_id: i64) -> ApiResult<ExportXml> {
        self.require_id(export_id, "Export ID")?;
        self.surface(self.inner.api.export_xml(export_id).await)
    }

    fn require(&self) -> ApiResult<(Arc<ApiKey>, CredentialEpoch)> {
        self.inner
            .credentials
            .require()
            .map_err(|err| self.reject(err))
    }

    fn require_id(&self, id: i64, field: &'static str) -> ApiResult<()> {
        if id <= 0 {
            return Err(self.reject(ApiError::MissingInput(field)));
        }
        self.require().map(|_| ())
    }

    fn surface<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        result.map_err(|err| self.reject(err))
    }

    fn reject(&self, err: ApiError) -> ApiError {
        self.inner.notifications.error(err.to_string());
        err
    }
}
