//! Common imports for crates that consume the wire models.

pub use crate::MessageResponse;
pub use crate::calls::{Call, CallExport, CallListResponse, CallState, CallStatus};
pub use crate::error::{ModelError, ModelResult};
pub use crate::exports::{
    BatchStatus, BatchTriggered, ExportXml, PendingConversions, PendingExport,
    PendingUpload, PendingUploads,
};
pub use crate::health::HealthStatus;
pub use crate::orders::{Order, OrderExport, OrderListResponse, OrderStatus};
pub use crate::page::{DEFAULT_PAGE_SIZE, ListPage, MAX_PAGE_SIZE, PageRequest};
pub use crate::routes::{self, utils::with_id, v1};
pub use crate::schedules::{
    ALLOWED_MINUTES, ScheduleCreate, ScheduleEntry, ScheduleList,
};
pub use crate::scrape_config::{
    DEFAULT_ORDER_LIST_URL, ScrapeConfig, ScrapeConfigUpdate, ScrapeRequest,
    normalize_override, validate_order_list_url,
};
pub use crate::workflow::{
    FailedOrder, JobOutcome, ProcessedOrder, ScrapeSummary, WorkflowStatus,
    WorkflowStatusResponse, WorkflowTriggered,
};
