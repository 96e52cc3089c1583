use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_CONFIG_DEBOUNCE, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL, DEFAULT_REFRESH_DELAY, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SERVER_URL, DEFAULT_TOAST_TTL, MAX_PAGE_SIZE,
};
use crate::error::ConfigLoadError;

/// Effective panel configuration after every layer has been applied.
#[derive(Clone, PartialEq, Eq)]
pub struct PanelConfig {
    /// Backend base URL without a trailing slash, e.g.
    /// `http://localhost:8000`.
    pub server_url: String,
    /// Value sent in the `X-API-Key` header. Absent until the operator
    /// provides one; authenticated calls fail fast without it.
    pub api_key: Option<String>,
    /// Rows per page for the orders and calls views.
    pub page_size: u32,
    pub timings: TimingConfig,
}

impl fmt::Debug for PanelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelConfig")
            .field("server_url", &self.server_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("page_size", &self.page_size)
            .field("timings", &self.timings)
            .finish()
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            timings: TimingConfig::default(),
        }
    }
}

/// Clock settings for polling, debouncing and notification expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Delay between two workflow status polls.
    pub poll_interval: Duration,
    /// Poll budget before a running workflow is reported as timed out.
    pub max_poll_attempts: u32,
    /// Quiet period after the last edit before the scrape target is saved.
    pub config_debounce: Duration,
    /// Lifetime of a notification.
    pub toast_ttl: Duration,
    /// Wait before re-reading counters after a batch convert/upload so the
    /// server-side status transitions are visible.
    pub refresh_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            config_debounce: DEFAULT_CONFIG_DEBOUNCE,
            toast_ttl: DEFAULT_TOAST_TTL,
            refresh_delay: DEFAULT_REFRESH_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        normalize_server_url(&self.server_url)?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigLoadError::Invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.timings.max_poll_attempts == 0 {
            return Err(ConfigLoadError::Invalid(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }

        let durations = [
            ("poll_interval", self.timings.poll_interval),
            ("config_debounce", self.timings.config_debounce),
            ("toast_ttl", self.timings.toast_ttl),
            ("refresh_delay", self.timings.refresh_delay),
            ("request_timeout", self.timings.request_timeout),
        ];
        if let Some((name, _)) =
            durations.iter().find(|(_, value)| value.is_zero())
        {
            return Err(ConfigLoadError::Invalid(format!(
                "{name} must be greater than zero"
            )));
        }

        Ok(())
    }

    /// Builder-style override used by the CLI flags.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.trim().is_empty()).then_some(key);
        self
    }
}

/// Adds `http://` when the scheme is missing, trims trailing slashes and
/// checks the result parses as an http(s) URL.
pub fn normalize_server_url(raw: &str) -> Result<String, ConfigLoadError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigLoadError::InvalidServerUrl {
            url: raw.to_string(),
            reason: "empty".to_string(),
        });
    }

    let with_scheme =
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

    let parsed = Url::parse(&with_scheme).map_err(|err| {
        ConfigLoadError::InvalidServerUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        }
    })?;
    if parsed.host_str().is_none() {
        return Err(ConfigLoadError::InvalidServerUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(with_scheme)
}

/// Partial overlay read from `panel.toml` (or JSON). Every field is
/// optional; absent fields keep the value from the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfigFile {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub page_size: Option<u32>,
    pub timings: TimingConfigFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfigFile {
    #[serde(with = "humantime_opt")]
    pub poll_interval: Option<Duration>,
    pub max_poll_attempts: Option<u32>,
    #[serde(with = "humantime_opt")]
    pub config_debounce: Option<Duration>,
    #[serde(with = "humantime_opt")]
    pub toast_ttl: Option<Duration>,
    #[serde(with = "humantime_opt")]
    pub refresh_delay: Option<Duration>,
    #[serde(with = "humantime_opt")]
    pub request_timeout: Option<Duration>,
}

impl PanelConfigFile {
    pub fn apply_to(self, config: &mut PanelConfig) {
        if let Some(url) = self.server_url {
            config.server_url = url;
        }
        if let Some(key) = self.api_key.filter(|key| !key.trim().is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(size) = self.page_size {
            config.page_size = size;
        }

        let timings = self.timings;
        let target = &mut config.timings;
        if let Some(value) = timings.poll_interval {
            target.poll_interval = value;
        }
        if let Some(value) = timings.max_poll_attempts {
            target.max_poll_attempts = value;
        }
        if let Some(value) = timings.config_debounce {
            target.config_debounce = value;
        }
        if let Some(value) = timings.toast_ttl {
            target.toast_ttl = value;
        }
        if let Some(value) = timings.refresh_delay {
            target.refresh_delay = value;
        }
        if let Some(value) = timings.request_timeout {
            target.request_timeout = value;
        }
    }
}

mod humantime_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(
                &humantime::format_duration(*duration).to_string(),
            ),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|value| {
            humantime::parse_duration(value.trim())
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
