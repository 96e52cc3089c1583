use std::sync::Arc;

use orderdesk_config::{ConfigLoadError, PanelConfig, PanelConfigLoader};

use crate::app::panel::ControlPanel;
use crate::infra::adapters::ApiClientAdapter;
use crate::infra::credential::CredentialContext;
use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;
use crate::infra::testing::TestApiService;
use crate::infra::ApiClient;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub panel: PanelConfig,
    pub use_test_stubs: bool,
}

impl AppConfig {
    pub fn new(panel: PanelConfig) -> Self {
        Self {
            panel,
            use_test_stubs: false,
        }
    }

    /// Defaults, config file, `.env` and environment, in that order.
    pub fn from_environment() -> Result<Self, ConfigLoadError> {
        let load = PanelConfigLoader::new().load()?;
        log::debug!("[Panel] Configuration loaded from {:?}", load.source);
        Ok(Self::new(load.config))
    }

    pub fn server_url(&self) -> &str {
        &self.panel.server_url
    }

    pub fn use_test_stubs(&self) -> bool {
        self.use_test_stubs
    }

    pub fn with_test_stubs(mut self, enabled: bool) -> Self {
        self.use_test_stubs = enabled;
        self
    }

    /// Wire every component against the configured backend, or against an
    /// in-memory stub when test stubs are enabled.
    pub fn build_panel(&self) -> ApiResult<ControlPanel> {
        let credentials = CredentialContext::new(self.panel.api_key.as_deref());

        let api: Arc<dyn ApiService> = if self.use_test_stubs {
            log::info!("[Panel] Using in-memory test API");
            Arc::new(TestApiService::new())
        } else {
            let client = ApiClient::new(
                &self.panel.server_url,
                self.panel.timings.request_timeout,
                credentials.clone(),
            )?;
            Arc::new(ApiClientAdapter::new(Arc::new(client)))
        };

        Ok(ControlPanel::new(api, credentials, &self.panel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_server_url_fails_to_build() {
        let config = AppConfig::new(
            PanelConfig::default().with_server_url("   "),
        );
        assert!(config.build_panel().is_err());
    }

    #[tokio::test]
    async fn stubbed_panel_starts_without_a_server() {
        let config = AppConfig::new(PanelConfig::default().with_api_key("k"))
            .with_test_stubs(true);
        let panel = config.build_panel().unwrap();
        assert!(panel.credentials().is_set());
        assert!(panel.health().await.unwrap().is_healthy());
    }
}
