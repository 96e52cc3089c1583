pub mod adapters;
pub mod api_client;
pub mod credential;
pub mod error;
pub mod services;
pub mod testing;

pub use api_client::ApiClient;
pub use credential::{ApiKey, CredentialContext, CredentialEpoch};
pub use error::{ApiError, ApiResult};
