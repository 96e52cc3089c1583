use thiserror::Error;

/// Validation failures raised while constructing request values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Hour must be between 0 and 23, got {0}")]
    HourOutOfRange(u8),

    #[error("Minute must be one of {allowed:?}, got {minute}")]
    MinuteNotAllowed { minute: u8, allowed: &'static [u8] },

    #[error("Page size must be between 1 and {max}, got {size}")]
    PageSizeOutOfRange { size: u32, max: u32 },

    #[error("Invalid order list URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
