use std::fmt;

use serde_json::Value;

/// Status names reported by `GET /workflows/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
    TimedOut,
    NotFound,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Canceled => "CANCELED",
            WorkflowStatus::Terminated => "TERMINATED",
            WorkflowStatus::TimedOut => "TIMED_OUT",
            WorkflowStatus::NotFound => "NOT_FOUND",
            WorkflowStatus::Unknown => "UNKNOWN",
        }
    }

    /// No further progress happens from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed) || self.is_failure()
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Failed
                | WorkflowStatus::Canceled
                | WorkflowStatus::Terminated
                | WorkflowStatus::TimedOut
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a workflow handle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkflowStatusResponse {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub result: Option<Value>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub error: Option<String>,
}

/// Acknowledgement returned by every endpoint that starts a workflow.
///
/// Scrapes carry a `message`, conversions an `export_id` and uploads an
/// `order_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkflowTriggered {
    pub status: String,
    pub workflow_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub export_id: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub order_id: Option<i64>,
}

/// An order the scrape workflow pushed all the way through.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessedOrder {
    pub external_order_id: String,
    pub belnr: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub remote_path: Option<String>,
}

/// An order the scrape workflow gave up on, with the failing step if known.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailedOrder {
    pub external_order_id: String,
    pub belnr: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub error: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub step: Option<String>,
}

/// Result payload of a completed scrape-and-process workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScrapeSummary {
    pub success: bool,
    pub error: Option<String>,
    pub total_found: u64,
    pub new_orders: u64,
    pub skipped_orders: u64,
    pub processed_count: u64,
    pub failed_count: u64,
    pub processed: Vec<ProcessedOrder>,
    pub failed: Vec<FailedOrder>,
}

impl ScrapeSummary {
    /// Processed count, falling back to the detail array when the count is
    /// absent (the "no new orders" payload omits it).
    pub fn processed_total(&self) -> u64 {
        self.processed_count.max(self.processed.len() as u64)
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_count.max(self.failed.len() as u64)
    }

    /// Some items failed alongside successes.
    pub fn is_partial(&self) -> bool {
        self.processed_total() > 0 && self.failed_total() > 0
    }
}

/// Minimal result shape shared by the convert and upload workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobOutcome {
    #[cfg_attr(feature = "serde", serde(default = "default_success"))]
    pub success: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub error: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<String>,
}

#[cfg(feature = "serde")]
fn default_success() -> bool {
    true
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip_screaming_case() {
        let status: WorkflowStatus =
            serde_json::from_str(r#""TIMED_OUT""#).unwrap();
        assert_eq!(status, WorkflowStatus::TimedOut);
        assert!(status.is_terminal());

        let other: WorkflowStatus =
            serde_json::from_str(r#""PAUSED""#).unwrap();
        assert_eq!(other, WorkflowStatus::Unknown);
        assert!(!other.is_terminal());
    }

    #[test]
    fn not_found_is_not_terminal() {
        assert!(!WorkflowStatus::NotFound.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
    }

    #[test]
    fn summary_without_counts_uses_detail_arrays() {
        let raw = serde_json::json!({
            "success": true,
            "total_found": 5,
            "new_orders": 0,
            "skipped_orders": 5,
            "processed": [],
            "failed": []
        });
        let summary: ScrapeSummary = serde_json::from_value(raw).unwrap();
        assert_eq!(summary.processed_total(), 0);
        assert!(!summary.is_partial());
    }

    #[test]
    fn partial_summary_is_detected() {
        let raw = serde_json::json!({
            "success": true,
            "processed_count": 3,
            "failed_count": 2,
            "failed": [
                {"external_order_id": "E1", "belnr": "1", "error": "boom",
                 "step": "scrape"}
            ]
        });
        let summary: ScrapeSummary = serde_json::from_value(raw).unwrap();
        assert!(summary.is_partial());
        assert_eq!(summary.failed[0].step.as_deref(), Some("scrape"));
    }
}
