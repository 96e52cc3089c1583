use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orderdesk_model::prelude::*;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::infra::error::{ApiError, ApiResult};
use crate::infra::services::ApiService;

/// Backend operation a scripted response is queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    ListOrders,
    DeleteOrder,
    OrderExports,
    ListCalls,
    DeleteCall,
    CallExports,
    StartScrape,
    WorkflowStatus,
    GetScrapeConfig,
    PutScrapeConfig,
    ListSchedules,
    CreateSchedule,
    DeleteSchedule,
    ToggleSchedule,
    SyncSchedules,
    PendingConversions,
    PendingUploads,
    ConvertExport,
    ConvertAll,
    UploadOrder,
    UploadAll,
    ExportXml,
}

/// Journal entry recorded for every call, with the arguments that matter
/// for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Health,
    ListOrders { skip: u64, limit: u32 },
    DeleteOrder(i64),
    OrderExports(i64),
    ListCalls { skip: u64, limit: u32 },
    DeleteCall(i64),
    CallExports(i64),
    StartScrape { order_list_url: String },
    WorkflowStatus(String),
    GetScrapeConfig,
    PutScrapeConfig { custom_order_list_url: Option<String> },
    ListSchedules,
    CreateSchedule { hour: u8, minute: u8 },
    DeleteSchedule(i64),
    ToggleSchedule(i64),
    SyncSchedules,
    PendingConversions,
    PendingUploads,
    ConvertExport(i64),
    ConvertAll,
    UploadOrder(i64),
    UploadAll,
    ExportXml(i64),
}

impl ApiCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiCall::Health => Endpoint::Health,
            ApiCall::ListOrders { .. } => Endpoint::ListOrders,
            ApiCall::DeleteOrder(_) => Endpoint::DeleteOrder,
            ApiCall::OrderExports(_) => Endpoint::OrderExports,
            ApiCall::ListCalls { .. } => Endpoint::ListCalls,
            ApiCall::DeleteCall(_) => Endpoint::DeleteCall,
            ApiCall::CallExports(_) => Endpoint::CallExports,
            ApiCall::StartScrape { .. } => Endpoint::StartScrape,
            ApiCall::WorkflowStatus(_) => Endpoint::WorkflowStatus,
            ApiCall::GetScrapeConfig => Endpoint::GetScrapeConfig,
            ApiCall::PutScrapeConfig { .. } => Endpoint::PutScrapeConfig,
            ApiCall::ListSchedules => Endpoint::ListSchedules,
            ApiCall::CreateSchedule { .. } => Endpoint::CreateSchedule,
            ApiCall::DeleteSchedule(_) => Endpoint::DeleteSchedule,
            ApiCall::ToggleSchedule(_) => Endpoint::ToggleSchedule,
            ApiCall::SyncSchedules => Endpoint::SyncSchedules,
            ApiCall::PendingConversions => Endpoint::PendingConversions,
            ApiCall::PendingUploads => Endpoint::PendingUploads,
            ApiCall::ConvertExport(_) => Endpoint::ConvertExport,
            ApiCall::ConvertAll => Endpoint::ConvertAll,
            ApiCall::UploadOrder(_) => Endpoint::UploadOrder,
            ApiCall::UploadAll => Endpoint::UploadAll,
            ApiCall::ExportXml(_) => Endpoint::ExportXml,
        }
    }
}

/// Holds a scripted response in flight until released (or dropped).
#[derive(Debug)]
pub struct ResponseGate {
    tx: oneshot::Sender<()>,
}

impl ResponseGate {
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

#[derive(Debug)]
struct Scripted {
    result: ApiResult<Value>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Debug, Default)]
struct StubState {
    queues: HashMap<Endpoint, VecDeque<Scripted>>,
    journal: Vec<ApiCall>,
}

/// Scriptable in-memory [`ApiService`].
///
/// Responses are queued per endpoint and consumed in order. When a queue
/// is empty the stub answers with a neutral default: empty lists, zero
/// counters, `RUNNING` for workflow polls and a plain acknowledgement for
/// mutations.
#[derive(Debug, Clone, Default)]
pub struct TestApiService {
    state: Arc<Mutex<StubState>>,
}

impl TestApiService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<T: Serialize>(&self, endpoint: Endpoint, body: &T) {
        self.push(endpoint, Self::to_value(body), None);
    }

    pub fn enqueue_json(&self, endpoint: Endpoint, body: Value) {
        self.push(endpoint, Ok(body), None);
    }

    pub fn enqueue_error(&self, endpoint: Endpoint, error: ApiError) {
        self.push(endpoint, Err(error), None);
    }

    /// Queue a response that is only delivered after the returned gate is
    /// released.
    pub fn enqueue_gated<T: Serialize>(
        &self,
        endpoint: Endpoint,
        body: &T,
    ) -> ResponseGate {
        let (tx, rx) = oneshot::channel();
        self.push(endpoint, Self::to_value(body), Some(rx));
        ResponseGate { tx }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().journal.clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<ApiCall> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    fn to_value<T: Serialize>(body: &T) -> ApiResult<Value> {
        serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn push(
        &self,
        endpoint: Endpoint,
        result: ApiResult<Value>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.state
            .lock()
            .queues
            .entry(endpoint)
            .or_default()
            .push_back(Scripted { result, gate });
    }

    async fn respond<T: DeserializeOwned>(&self, call: ApiCall) -> ApiResult<T> {
        let endpoint = call.endpoint();
        let scripted = {
            let mut state = self.state.lock();
            state.journal.push(call);
            state.queues.get_mut(&endpoint).and_then(VecDeque::pop_front)
        };

        let result = match scripted {
            Some(Scripted { result, gate }) => {
                if let Some(gate) = gate {
                    // A dropped gate releases the response as well.
                    let _ = gate.await;
                }
                result
            }
            None => Ok(default_response(endpoint)),
        };

        let value = result?;
        serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

fn default_response(endpoint: Endpoint) -> Value {
    let now = Utc::now().to_rfc3339();
    match endpoint {
        Endpoint::Health => json!({
            "status": "healthy",
            "version": "test",
            "database": "connected"
        }),
        Endpoint::ListOrders => json!({ "orders": [], "total": 0 }),
        Endpoint::ListCalls => json!({ "calls": [], "total": 0 }),
        Endpoint::OrderExports | Endpoint::CallExports => json!([]),
        Endpoint::DeleteOrder
        | Endpoint::DeleteCall
        | Endpoint::DeleteSchedule
        | Endpoint::SyncSchedules => json!({ "message": "ok" }),
        Endpoint::StartScrape
        | Endpoint::ConvertExport
        | Endpoint::UploadOrder => json!({
            "status": "triggered",
            "workflow_id": "wf-test"
        }),
        Endpoint::WorkflowStatus => json!({
            "workflow_id": "wf-test",
            "status": "RUNNING"
        }),
        Endpoint::GetScrapeConfig | Endpoint::PutScrapeConfig => json!({
            "custom_order_list_url": null,
            "updated_at": null
        }),
        Endpoint::ListSchedules => json!({
            "schedules": [],
            "total": 0,
            "schedule_active": false
        }),
        Endpoint::CreateSchedule | Endpoint::ToggleSchedule => json!({
            "id": 1,
            "hour": 6,
            "minute": 0,
            "enabled": true,
            "created_at": now,
            "time_display": "06:00"
        }),
        Endpoint::PendingConversions => json!({
            "pending_count": 0,
            "exports": []
        }),
        Endpoint::PendingUploads => json!({ "pending_count": 0, "orders": [] }),
        Endpoint::ConvertAll | Endpoint::UploadAll => json!({
            "status": "no_pending",
            "message": "Nothing pending",
            "triggered_count": 0,
            "workflow_ids": []
        }),
        Endpoint::ExportXml => json!({
            "id": 1,
            "belnr": "0",
            "external_order_id": "0",
            "xml_content": "<xml/>",
            "export_type": "hapodu"
        }),
    }
}

#[async_trait]
impl ApiService for TestApiService {
    async fn health(&self) -> ApiResult<HealthStatus> {
        self.respond(ApiCall::Health).await
    }

    async fn list_orders(
        &self,
        page: PageRequest,
    ) -> ApiResult<OrderListResponse> {
        self.respond(ApiCall::ListOrders {
            skip: page.skip(),
            limit: page.limit(),
        })
        .await
    }

    async fn delete_order(&self, id: i64) -> ApiResult<MessageResponse> {
        self.respond(ApiCall::DeleteOrder(id)).await
    }

    async fn order_exports(&self, id: i64) -> ApiResult<Vec<OrderExport>> {
        self.respond(ApiCall::OrderExports(id)).await
    }

    async fn list_calls(&self, page: PageRequest) -> ApiResult<CallListResponse> {
        self.respond(ApiCall::ListCalls {
            skip: page.skip(),
            limit: page.limit(),
        })
        .await
    }

    async fn delete_call(&self, id: i64) -> ApiResult<MessageResponse> {
        self.respond(ApiCall::DeleteCall(id)).await
    }

    async fn call_exports(&self, id: i64) -> ApiResult<Vec<CallExport>> {
        self.respond(ApiCall::CallExports(id)).await
    }

    async fn start_scrape(
        &self,
        request: &ScrapeRequest,
    ) -> ApiResult<WorkflowTriggered> {
        self.respond(ApiCall::StartScrape {
            order_list_url: request.order_list_url.clone(),
        })
        .await
    }

    async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> ApiResult<WorkflowStatusResponse> {
        self.respond(ApiCall::WorkflowStatus(workflow_id.to_string()))
            .await
    }

    async fn scrape_config(&self) -> ApiResult<ScrapeConfig> {
        self.respond(ApiCall::GetScrapeConfig).await
    }

    async fn update_scrape_config(
        &self,
        update: &ScrapeConfigUpdate,
    ) -> ApiResult<ScrapeConfig> {
        let stored: ScrapeConfig = self
            .respond(ApiCall::PutScrapeConfig {
                custom_order_list_url: update.custom_order_list_url.clone(),
            })
            .await?;
        // Unscripted puts echo the submitted override back.
        if stored.updated_at.is_none() && stored.custom_order_list_url.is_none()
        {
            return Ok(ScrapeConfig {
                custom_order_list_url: update.custom_order_list_url.clone(),
                updated_at: Some(Utc::now()),
            });
        }
        Ok(stored)
    }

    async fn list_schedules(&self) -> ApiResult<ScheduleList> {
        self.respond(ApiCall::ListSchedules).await
    }

    async fn create_schedule(
        &self,
        schedule: ScheduleCreate,
    ) -> ApiResult<ScheduleEntry> {
        self.respond(ApiCall::CreateSchedule {
            hour: schedule.hour(),
            minute: schedule.minute(),
        })
        .await
    }

    async fn delete_schedule(&self, id: i64) -> ApiResult<MessageResponse> {
        self.respond(ApiCall::DeleteSchedule(id)).await
    }

    async fn toggle_schedule(&self, id: i64) -> ApiResult<ScheduleEntry> {
        self.respond(ApiCall::ToggleSchedule(id)).await
    }

    async fn sync_schedules(&self) -> ApiResult<MessageResponse> {
        self.respond(ApiCall::SyncSchedules).await
    }

    async fn pending_conversions(&self) -> ApiResult<PendingConversions> {
        self.respond(ApiCall::PendingConversions).await
    }

    async fn pending_uploads(&self) -> ApiResult<PendingUploads> {
        self.respond(ApiCall::PendingUploads).await
    }

    async fn convert_export(
        &self,
        export_id: i64,
    ) -> ApiResult<WorkflowTriggered> {
        self.respond(ApiCall::ConvertExport(export_id)).await
    }

    async fn convert_all(&self) -> ApiResult<BatchTriggered> {
        self.respond(ApiCall::ConvertAll).await
    }

    async fn upload_order(&self, order_id: i64) -> ApiResult<WorkflowTriggered> {
        self.respond(ApiCall::UploadOrder(order_id)).await
    }

    async fn upload_all(&self) -> ApiResult<BatchTriggered> {
        self.respond(ApiCall::UploadAll).await
    }

    async fn export_xml(&self, export_id: i64) -> ApiResult<ExportXml> {
        self.respond(ApiCall::ExportXml(export_id)).await
    }
}
