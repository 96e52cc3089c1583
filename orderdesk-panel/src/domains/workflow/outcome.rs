use std::fmt;

use orderdesk_model::prelude::{
    JobOutcome, ScrapeSummary, WorkflowStatus, WorkflowStatusResponse,
    validate_order_list_url,
};
use serde_json::Value;
use thiserror::Error;

use crate::infra::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Scrape,
    Convert,
    Upload,
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Scrape => "Scrape",
            JobKind::Convert => "Conversion",
            JobKind::Upload => "Upload",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input of one orchestrated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowJob {
    /// `None` or a blank URL scrapes the backend's default list.
    Scrape { order_list_url: Option<String> },
    ConvertExport { export_id: i64 },
    UploadOrder { order_id: i64 },
}

impl WorkflowJob {
    pub fn kind(&self) -> JobKind {
        match self {
            WorkflowJob::Scrape { .. } => JobKind::Scrape,
            WorkflowJob::ConvertExport { .. } => JobKind::Convert,
            WorkflowJob::UploadOrder { .. } => JobKind::Upload,
        }
    }

    /// Checks done before any request is issued.
    pub fn validate(&self) -> ApiResult<()> {
        match self {
            WorkflowJob::Scrape { order_list_url } => {
                match order_list_url.as_deref().map(str::trim) {
                    Some(url) if !url.is_empty() => {
                        validate_order_list_url(url)?;
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
            WorkflowJob::ConvertExport { export_id } if *export_id <= 0 => {
                Err(ApiError::MissingInput("Export ID"))
            }
            WorkflowJob::UploadOrder { order_id } if *order_id <= 0 => {
                Err(ApiError::MissingInput("Order ID"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Scrape(ScrapeSummary),
    Job(JobOutcome),
}

/// Successful settlement of a workflow, partial successes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub workflow_id: String,
    pub kind: JobKind,
    pub outcome: WorkflowOutcome,
    pub message: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Start(#[from] ApiError),

    #[error("{message}")]
    Failed {
        status: WorkflowStatus,
        message: String,
    },

    #[error(
        "Workflow {workflow_id} did not finish after {attempts} status checks"
    )]
    TimedOut { workflow_id: String, attempts: u32 },

    #[error("Another workflow is still running ({0})")]
    Busy(String),

    #[error("Workflow {workflow_id} abandoned: {reason}")]
    Abandoned { workflow_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classification {
    Pending,
    Succeeded(WorkflowOutcome),
    Failed {
        status: WorkflowStatus,
        message: String,
    },
}

/// Sort one status observation into keep-polling, success or failure.
pub(crate) fn classify(
    kind: JobKind,
    response: &WorkflowStatusResponse,
) -> Classification {
    match response.status {
        WorkflowStatus::Completed => classify_completed(kind, response),
        status if status.is_failure() => Classification::Failed {
            status,
            message: response
                .error
                .clone()
                .filter(|error| !error.trim().is_empty())
                .unwrap_or_else(|| generic_failure(status).to_string()),
        },
        _ => Classification::Pending,
    }
}

fn classify_completed(
    kind: JobKind,
    response: &WorkflowStatusResponse,
) -> Classification {
    let failed = |message: String| Classification::Failed {
        status: WorkflowStatus::Completed,
        message,
    };

    let result = match &response.result {
        Some(Value::Null) | None => {
            if let Some(error) = &response.error {
                return failed(error.clone());
            }
            Value::Object(Default::default())
        }
        Some(result) => result.clone(),
    };

    if result.get("success").and_then(Value::as_bool) == Some(false) {
        let message = result
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| response.error.clone())
            .unwrap_or_else(|| generic_failure(WorkflowStatus::Failed).into());
        return failed(message);
    }

    let decoded = match kind {
        JobKind::Scrape => {
            serde_json::from_value::<ScrapeSummary>(result)
                .map(WorkflowOutcome::Scrape)
        }
        JobKind::Convert | JobKind::Upload => {
            serde_json::from_value::<JobOutcome>(result)
                .map(WorkflowOutcome::Job)
        }
    };
    match decoded {
        Ok(outcome) => Classification::Succeeded(outcome),
        Err(err) => failed(format!("Unexpected workflow result: {}", err)),
    }
}

fn generic_failure(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Canceled => "Workflow was canceled",
        WorkflowStatus::Terminated => "Workflow was terminated",
        WorkflowStatus::TimedOut => "Workflow timed out on the server",
        _ => "Workflow failed",
    }
}

/// Notification text for a successful settlement.
pub fn success_message(kind: JobKind, outcome: &WorkflowOutcome) -> String {
    match outcome {
        WorkflowOutcome::Scrape(summary) => {
            let processed = summary.processed_total();
            let failed = summary.failed_total();
            if failed > 0 {
                format!(
                    "Scrape finished with errors: {} processed, {} failed",
                    processed, failed
                )
            } else if processed == 0 && summary.new_orders == 0 {
                format!(
                    "Scrape finished: no new orders ({} found, {} skipped)",
                    summary.total_found, summary.skipped_orders
                )
            } else {
                format!("Scrape finished: {} processed", processed)
            }
        }
        WorkflowOutcome::Job(job) => match &job.status {
            Some(status) => format!("{} finished ({})", kind.label(), status),
            None => format!("{} finished", kind.label()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(
        status: WorkflowStatus,
        result: Option<Value>,
    ) -> WorkflowStatusResponse {
        WorkflowStatusResponse {
            workflow_id: "wf-1".into(),
            status,
            result,
            error: None,
        }
    }

    #[test]
    fn running_and_not_found_keep_polling() {
        for status in [
            WorkflowStatus::Running,
            WorkflowStatus::NotFound,
            WorkflowStatus::Unknown,
        ] {
            assert_eq!(
                classify(JobKind::Scrape, &response(status, None)),
                Classification::Pending
            );
        }
    }

    #[test]
    fn failure_statuses_fall_back_to_generic_messages() {
        let cases = [
            (WorkflowStatus::Failed, "Workflow failed"),
            (WorkflowStatus::Canceled, "Workflow was canceled"),
            (WorkflowStatus::Terminated, "Workflow was terminated"),
            (WorkflowStatus::TimedOut, "Workflow timed out on the server"),
        ];
        for (status, expected) in cases {
            assert_eq!(
                classify(JobKind::Upload, &response(status, None)),
                Classification::Failed {
                    status,
                    message: expected.into()
                }
            );
        }
    }

    #[test]
    fn server_error_text_wins_over_generic_message() {
        let mut failed = response(WorkflowStatus::Failed, None);
        failed.error = Some("SFTP login rejected".into());
        assert_eq!(
            classify(JobKind::Upload, &failed),
            Classification::Failed {
                status: WorkflowStatus::Failed,
                message: "SFTP login rejected".into()
            }
        );
    }

    #[test]
    fn completed_with_unsuccessful_result_is_a_failure() {
        let completed = response(
            WorkflowStatus::Completed,
            Some(json!({"success": false, "error": "login page changed"})),
        );
        assert_eq!(
            classify(JobKind::Scrape, &completed),
            Classification::Failed {
                status: WorkflowStatus::Completed,
                message: "login page changed".into()
            }
        );

        let mut errored = response(WorkflowStatus::Completed, None);
        errored.error = Some("result lost".into());
        assert!(matches!(
            classify(JobKind::Convert, &errored),
            Classification::Failed { .. }
        ));
    }

    #[test]
    fn partial_scrape_is_a_qualified_success() {
        let completed = response(
            WorkflowStatus::Completed,
            Some(json!({
                "success": true,
                "processed_count": 3,
                "failed_count": 2
            })),
        );
        let Classification::Succeeded(outcome) =
            classify(JobKind::Scrape, &completed)
        else {
            panic!("expected success");
        };
        assert_eq!(
            success_message(JobKind::Scrape, &outcome),
            "Scrape finished with errors: 3 processed, 2 failed"
        );
    }

    #[test]
    fn scrape_messages_follow_the_summary() {
        let none_new = WorkflowOutcome::Scrape(ScrapeSummary {
            success: true,
            total_found: 7,
            skipped_orders: 7,
            ..Default::default()
        });
        assert_eq!(
            success_message(JobKind::Scrape, &none_new),
            "Scrape finished: no new orders (7 found, 7 skipped)"
        );

        let processed = WorkflowOutcome::Scrape(ScrapeSummary {
            success: true,
            new_orders: 2,
            processed_count: 2,
            ..Default::default()
        });
        assert_eq!(
            success_message(JobKind::Scrape, &processed),
            "Scrape finished: 2 processed"
        );
    }

    #[test]
    fn job_inputs_are_validated_locally() {
        assert!(
            WorkflowJob::ConvertExport { export_id: 0 }
                .validate()
                .is_err()
        );
        assert!(WorkflowJob::UploadOrder { order_id: -4 }.validate().is_err());
        assert!(
            WorkflowJob::Scrape {
                order_list_url: Some("ftp://example.com".into())
            }
            .validate()
            .is_err()
        );
        assert!(
            WorkflowJob::Scrape {
                order_list_url: Some("  ".into())
            }
            .validate()
            .is_ok()
        );
    }
}
