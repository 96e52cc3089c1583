use std::fmt;

use chrono::{DateTime, Utc};

/// Telephony state reported by the PBX when the call event arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CallState {
    Ringing,
    Answered,
    Ended,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

/// Processing status of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CallStatus {
    Received,
    Converted,
    Sent,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Received => "received",
            CallStatus::Converted => "converted",
            CallStatus::Sent => "sent",
            CallStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Call {
    pub id: i64,
    pub call_id: String,
    pub state: CallState,
    pub from_number: String,
    pub to_number: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub extension: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub caller_name: Option<String>,
    pub call_timestamp: DateTime<Utc>,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallListResponse {
    pub calls: Vec<Call>,
    pub total: u64,
}

/// Export generated for a call: the raw PBX JSON or the converted XML.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallExport {
    pub id: i64,
    pub call_id: i64,
    pub content: String,
    pub export_type: String,
    pub created_at: DateTime<Utc>,
}
