use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{ModelError, ModelResult};

/// Order list the backend scrapes when no override is stored.
pub const DEFAULT_ORDER_LIST_URL: &str = "https://hapodu.duisburg.de/risource/do/order/list/editable?initSearch=true&reset=false";

/// Persisted scrape target override. `None` means "use the default".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrapeConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub custom_order_list_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScrapeConfig {
    /// URL the next scrape will actually hit.
    pub fn effective_url(&self) -> &str {
        self.custom_order_list_url
            .as_deref()
            .unwrap_or(DEFAULT_ORDER_LIST_URL)
    }
}

/// Body for `PUT /scrape/config`. Always serializes the field, so clearing
/// the override sends an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrapeConfigUpdate {
    pub custom_order_list_url: Option<String>,
}

impl ScrapeConfigUpdate {
    /// Build the update for a locally edited draft.
    pub fn from_draft(draft: &str) -> Self {
        Self {
            custom_order_list_url: normalize_override(draft),
        }
    }
}

/// Body for `POST /scrape/orders`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrapeRequest {
    pub order_list_url: String,
}

impl ScrapeRequest {
    /// Validates an explicit target; blank input falls back to the default.
    pub fn new(order_list_url: Option<&str>) -> ModelResult<Self> {
        match order_list_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => {
                validate_order_list_url(url)?;
                Ok(Self {
                    order_list_url: url.to_string(),
                })
            }
            None => Ok(Self {
                order_list_url: DEFAULT_ORDER_LIST_URL.to_string(),
            }),
        }
    }
}

/// Maps a draft to the stored override: blank or default means none.
pub fn normalize_override(draft: &str) -> Option<String> {
    let trimmed = draft.trim();
    if trimmed.is_empty() || trimmed == DEFAULT_ORDER_LIST_URL {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn validate_order_list_url(raw: &str) -> ModelResult<()> {
    let parsed = Url::parse(raw).map_err(|err| ModelError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ModelError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_blank_drafts_become_no_override() {
        assert_eq!(normalize_override(DEFAULT_ORDER_LIST_URL), None);
        assert_eq!(
            normalize_override(&format!("  {DEFAULT_ORDER_LIST_URL} ")),
            None
        );
        assert_eq!(normalize_override("   "), None);
        assert_eq!(
            normalize_override("https://example.org/list"),
            Some("https://example.org/list".to_string())
        );
    }

    #[test]
    fn scrape_request_rejects_non_http_targets() {
        assert!(ScrapeRequest::new(Some("ftp://example.org")).is_err());
        assert!(ScrapeRequest::new(Some("not a url")).is_err());
        assert_eq!(
            ScrapeRequest::new(None).unwrap().order_list_url,
            DEFAULT_ORDER_LIST_URL
        );
        assert_eq!(
            ScrapeRequest::new(Some("  ")).unwrap().order_list_url,
            DEFAULT_ORDER_LIST_URL
        );
    }

    #[test]
    fn effective_url_prefers_override() {
        let mut config = ScrapeConfig::default();
        assert_eq!(config.effective_url(), DEFAULT_ORDER_LIST_URL);
        config.custom_order_list_url = Some("https://example.org".into());
        assert_eq!(config.effective_url(), "https://example.org");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn clearing_the_override_sends_explicit_null() {
        let body = ScrapeConfigUpdate::from_draft(DEFAULT_ORDER_LIST_URL);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"custom_order_list_url":null}"#
        );
    }
}
