use thiserror::Error;

/// Failures of a single backend interaction.
///
/// `Network` and `Decode` are transport problems, `MissingCredential`,
/// `MissingInput`, `InvalidInput` and `Busy` are raised before any request is
/// issued, and `Server` carries the backend's `detail` for non-2xx replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API key is required")]
    MissingCredential,

    #[error("{0} is required")]
    MissingInput(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{component} is busy, wait for the current operation to finish")]
    Busy { component: &'static str },

    #[error("{detail}")]
    Server { status: u16, detail: String },

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// Raised locally before any request went out.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::MissingCredential
                | ApiError::MissingInput(_)
                | ApiError::InvalidInput(_)
                | ApiError::Busy { .. }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<orderdesk_model::ModelError> for ApiError {
    fn from(err: orderdesk_model::ModelError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
