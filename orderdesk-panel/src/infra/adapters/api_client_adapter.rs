use std::sync::Arc;

use async_trait::async_trait;
use orderdesk_model::prelude::*;
use orderdesk_model::routes::{HEALTH, utils::with_id};

use crate::infra::api_client::ApiClient;
use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;

/// [`ApiService`] over HTTP.
#[derive(Debug, Clone)]
pub struct ApiClientAdapter {
    client: Arc<ApiClient>,
}

impl ApiClientAdapter {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

fn page_query(page: PageRequest) -> [(&'static str, u64); 2] {
    [("skip", page.skip()), ("limit", u64::from(page.limit()))]
}

#[async_trait]
impl ApiService for ApiClientAdapter {
    async fn health(&self) -> ApiResult<HealthStatus> {
        self.client.get_public(HEALTH).await
    }

    async fn list_orders(
        &self,
        page: PageRequest,
    ) -> ApiResult<OrderListResponse> {
        self.client
            .get_with_query(v1::orders::COLLECTION, &page_query(page))
            .await
    }

    async fn delete_order(&self, id: i64) -> ApiResult<MessageResponse> {
        self.client.delete(&with_id(v1::orders::ITEM, id)).await
    }

    async fn order_exports(&self, id: i64) -> ApiResult<Vec<OrderExport>> {
        self.client.get(&with_id(v1::orders::EXPORTS, id)).await
    }

    async fn list_calls(&self, page: PageRequest) -> ApiResult<CallListResponse> {
        self.client
            .get_with_query(v1::calls::COLLECTION, &page_query(page))
            .await
    }

    async fn delete_call(&self, id: i64) -> ApiResult<MessageResponse> {
        self.client.delete(&with_id(v1::calls::ITEM, id)).await
    }

    async fn call_exports(&self, id: i64) -> ApiResult<Vec<CallExport>> {
        self.client.get(&with_id(v1::calls::EXPORTS, id)).await
    }

    async fn start_scrape(
        &self,
        request: &ScrapeRequest,
    ) -> ApiResult<WorkflowTriggered> {
        self.client.post(v1::scrape::ORDERS, request).await
    }

    async fn workflow_status(
        &self,
        workflow_id: &str,
    ) -> ApiResult<WorkflowStatusResponse> {
        self.client
            .get(&with_id(v1::workflows::STATUS, workflow_id))
            .await
    }

    async fn scrape_config(&self) -> ApiResult<ScrapeConfig> {
        self.client.get(v1::scrape::CONFIG).await
    }

    async fn update_scrape_config(
        &self,
        update: &ScrapeConfigUpdate,
    ) -> ApiResult<ScrapeConfig> {
        self.client.put(v1::scrape::CONFIG, update).await
    }

    async fn list_schedules(&self) -> ApiResult<ScheduleList> {
        self.client.get(v1::schedules::COLLECTION).await
    }

    async fn create_schedule(
        &self,
        schedule: ScheduleCreate,
    ) -> ApiResult<ScheduleEntry> {
        self.client.post(v1::schedules::COLLECTION, &schedule).await
    }

    async fn delete_schedule(&self, id: i64) -> ApiResult<MessageResponse> {
        self.client.delete(&with_id(v1::schedules::ITEM, id)).await
    }

    async fn toggle_schedule(&self, id: i64) -> ApiResult<ScheduleEntry> {
        self.client
            .put_empty(&with_id(v1::schedules::TOGGLE, id))
            .await
    }

    async fn sync_schedules(&self) -> ApiResult<MessageResponse> {
        self.client.post_empty(v1::schedules::SYNC).await
    }

    async fn pending_conversions(&self) -> ApiResult<PendingConversions> {
        self.client.get(v1::exports::PENDING).await
    }

    async fn pending_uploads(&self) -> ApiResult<PendingUploads> {
        self.client.get(v1::exports::PENDING_UPLOAD).await
    }

    async fn convert_export(
        &self,
        export_id: i64,
    ) -> ApiResult<WorkflowTriggered> {
        self.client
            .post_empty(&with_id(v1::exports::CONVERT, export_id))
            .await
    }

    async fn convert_all(&self) -> ApiResult<BatchTriggered> {
        self.client.post_empty(v1::exports::CONVERT_ALL).await
    }

    async fn upload_order(&self, order_id: i64) -> ApiResult<WorkflowTriggered> {
        self.client
            .post_empty(&with_id(v1::exports::UPLOAD, order_id))
            .await
    }

    async fn upload_all(&self) -> ApiResult<BatchTriggered> {
        self.client.post_empty(v1::exports::UPLOAD_ALL).await
    }

    async fn export_xml(&self, export_id: i64) -> ApiResult<ExportXml> {
        self.client.get(&with_id(v1::exports::XML, export_id)).await
    }
}
