//! Environment keys and built-in defaults.

use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "ORDERDESK_CONFIG_PATH";
pub const ENV_SERVER_URL: &str = "ORDERDESK_SERVER_URL";
pub const ENV_API_KEY: &str = "ORDERDESK_API_KEY";
pub const ENV_PAGE_SIZE: &str = "ORDERDESK_PAGE_SIZE";
pub const ENV_POLL_INTERVAL: &str = "ORDERDESK_POLL_INTERVAL";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "ORDERDESK_MAX_POLL_ATTEMPTS";
pub const ENV_DEBOUNCE: &str = "ORDERDESK_DEBOUNCE";
pub const ENV_TOAST_TTL: &str = "ORDERDESK_TOAST_TTL";
pub const ENV_REFRESH_DELAY: &str = "ORDERDESK_REFRESH_DELAY";
pub const ENV_REQUEST_TIMEOUT: &str = "ORDERDESK_REQUEST_TIMEOUT";

/// Directory under the platform config dir that holds `panel.toml`.
pub const CONFIG_DIR_NAME: &str = "orderdesk";
pub const CONFIG_FILE_NAME: &str = "panel.toml";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Matches the backend's `MAX_PAGE_SIZE`.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// 120 polls at 5s is roughly ten minutes.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
pub const DEFAULT_CONFIG_DEBOUNCE: Duration = Duration::from_secs(1);
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(4);
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
