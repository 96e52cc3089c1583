/// Hapodu export still waiting for its Taifun conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingExport {
    pub id: i64,
    pub order_id: i64,
    pub belnr: String,
    pub external_order_id: String,
}

/// `GET /exports/pending`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingConversions {
    pub pending_count: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exports: Vec<PendingExport>,
}

/// Converted order whose XML has not reached the SFTP drop yet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingUpload {
    pub id: i64,
    pub order_id: String,
    pub status: String,
}

/// `GET /exports/pending-upload`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingUploads {
    pub pending_count: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orders: Vec<PendingUpload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BatchStatus {
    Triggered,
    NoPending,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

/// Response of `convert-all` and `upload-all`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchTriggered {
    pub status: BatchStatus,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggered_count: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub workflow_ids: Vec<String>,
}

/// `GET /exports/{id}/xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportXml {
    pub id: i64,
    pub belnr: String,
    pub external_order_id: String,
    pub xml_content: String,
    pub export_type: String,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn no_pending_batch_decodes() {
        let raw = r#"{"status": "no_pending",
            "message": "No pending uploads found",
            "triggered_count": 0, "workflow_ids": []}"#;
        let batch: BatchTriggered = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.status, BatchStatus::NoPending);
        assert!(batch.workflow_ids.is_empty());
    }
}
