use chrono::{DateTime, Utc};

use crate::error::{ModelError, ModelResult};

/// Minutes the panel offers when creating a recurring trigger.
pub const ALLOWED_MINUTES: &[u8] = &[0, 15, 30, 45];

/// A daily scrape trigger as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleEntry {
    pub id: i64,
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_display: String,
}

impl ScheduleEntry {
    /// `HH:MM`, preferring the server's rendering when present.
    pub fn display_text(&self) -> String {
        if self.time_display.is_empty() {
            format!("{:02}:{:02}", self.hour, self.minute)
        } else {
            self.time_display.clone()
        }
    }
}

/// `GET /schedules`: the entry cache plus whether it is installed in the
/// external scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleList {
    pub schedules: Vec<ScheduleEntry>,
    pub total: u64,
    pub schedule_active: bool,
}

/// Validated body for `POST /schedules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScheduleCreate {
    hour: u8,
    minute: u8,
}

impl ScheduleCreate {
    pub fn new(hour: u8, minute: u8) -> ModelResult<Self> {
        if hour > 23 {
            return Err(ModelError::HourOutOfRange(hour));
        }
        if !ALLOWED_MINUTES.contains(&minute) {
            return Err(ModelError::MinuteNotAllowed {
                minute,
                allowed: ALLOWED_MINUTES,
            });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}
