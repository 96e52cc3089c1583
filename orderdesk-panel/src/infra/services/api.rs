//! API service trait
//!
//! Components talk to the backend through this trait only, so tests can
//! swap in [`crate::infra::testing::stubs::TestApiService`].

use async_trait::async_trait;
use orderdesk_model::prelude::*;
use std::fmt::Debug;

use crate::infra::error::ApiResult;

/// Typed operations of the order pipeline backend
#[async_trait]
pub trait ApiService: Send + Sync + Debug {
    /// Unauthenticated liveness probe
    async fn health(&self) -> ApiResult<HealthStatus>;

    // === Orders ===

    async fn list_orders(&self, page: PageRequest)
    -> ApiResult<OrderListResponse>;

    async fn delete_order(&self, id: i64) -> ApiResult<MessageResponse>;

    /// Hapodu and Taifun exports stored for one order
    async fn order_exports(&self, id: i64) -> ApiResult<Vec<OrderExport>>;

    // === Calls ===

    async fn list_calls(&self, page: PageRequest)
    -> ApiResult<CallListResponse>;

    async fn delete_call(&self, id: i64) -> ApiResult<MessageResponse>;

    async fn call_exports(&self, id: i64) -> ApiResult<Vec<CallExport>>;

    // === Scraping and workflows ===

    /// Start the scrape-and-process workflow
    async fn start_scrape(
        &self,
        request: &ScrapeRequest,
    ) -> ApiResult<WorkflowTriggered>;

    async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> ApiResult<WorkflowStatusResponse>;

    async fn scrape_config(&self) -> ApiResult<ScrapeConfig>;

    async fn update_scrape_config(
        &self,
        update: &ScrapeConfigUpdate,
    ) -> ApiResult<ScrapeConfig>;

    // === Schedules ===

    async fn list_schedules(&self) -> ApiResult<ScheduleList>;

    async fn create_schedule(
        &self,
        schedule: ScheduleCreate,
    ) -> ApiResult<ScheduleEntry>;

    async fn delete_schedule(&self, id: i64) -> ApiResult<MessageResponse>;

    async fn toggle_schedule(&self, id: i64) -> ApiResult<ScheduleEntry>;

    /// Install the cached entries in the external scheduler
    async fn sync_schedules(&self) -> ApiResult<MessageResponse>;

    // === Exports ===

    async fn pending_conversions(&self) -> ApiResult<PendingConversions>;

    async fn pending_uploads(&self) -> ApiResult<PendingUploads>;

    async fn convert_export(&self, export_id: i64)
    -> ApiResult<WorkflowTriggered>;

    async fn convert_all(&self) -> ApiResult<BatchTriggered>;

    async fn upload_order(&self, order_id: i64) -> ApiResult<WorkflowTriggered>;

    async fn upload_all(&self) -> ApiResult<BatchTriggered>;

    async fn export_xml(&self, export_id: i64) -> ApiResult<ExportXml>;
}
