use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_API_KEY, ENV_CONFIG_PATH,
    ENV_DEBOUNCE, ENV_MAX_POLL_ATTEMPTS, ENV_PAGE_SIZE, ENV_POLL_INTERVAL,
    ENV_REFRESH_DELAY, ENV_REQUEST_TIMEOUT, ENV_SERVER_URL, ENV_TOAST_TTL,
};
use crate::error::ConfigLoadError;
use crate::models::{PanelConfig, PanelConfigFile, normalize_server_url};

/// Layer that supplied the file values of a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelConfigSource {
    #[default]
    Default,
    /// `$ORDERDESK_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// `<config dir>/orderdesk/panel.toml`.
    File(PathBuf),
}

/// Result of [`PanelConfigLoader::load`].
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: PanelConfig,
    pub source: PanelConfigSource,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Composes defaults, the optional config file and environment overrides.
pub struct PanelConfigLoader {
    env: EnvLookup,
    default_path: Option<PathBuf>,
    read_dotenv: bool,
}

impl fmt::Debug for PanelConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelConfigLoader")
            .field("default_path", &self.default_path)
            .field("read_dotenv", &self.read_dotenv)
            .finish()
    }
}

impl Default for PanelConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelConfigLoader {
    /// Loader over the process environment and the platform config dir.
    pub fn new() -> Self {
        Self {
            env: Box::new(|key| std::env::var(key).ok()),
            default_path: dirs::config_dir()
                .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
            read_dotenv: true,
        }
    }

    /// Replace the environment lookup. Disables `.env` loading, since the
    /// injected lookup would not observe it.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self.read_dotenv = false;
        self
    }

    pub fn with_default_path(mut self, path: Option<PathBuf>) -> Self {
        self.default_path = path;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        if self.read_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!("loaded environment from {}", path.display()),
                Err(err) if err.not_found() => {}
                Err(err) => warn!("ignoring unreadable .env file: {err}"),
            }
        }

        let mut config = PanelConfig::default();
        let source = self.apply_file_layer(&mut config)?;
        self.apply_env_layer(&mut config)?;

        config.server_url = normalize_server_url(&config.server_url)?;
        config.validate()?;

        info!(
            server_url = %config.server_url,
            page_size = config.page_size,
            source = ?source,
            "panel configuration loaded"
        );

        Ok(ConfigLoad { config, source })
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|value| !value.trim().is_empty())
    }

    fn apply_file_layer(
        &self,
        config: &mut PanelConfig,
    ) -> Result<PanelConfigSource, ConfigLoadError> {
        if let Some(raw) = self.var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(raw);
            load_file(&path)?.apply_to(config);
            return Ok(PanelConfigSource::EnvPath(path));
        }

        if let Some(path) = self.default_path.as_ref()
            && path.is_file()
        {
            load_file(path)?.apply_to(config);
            return Ok(PanelConfigSource::File(path.clone()));
        }

        Ok(PanelConfigSource::Default)
    }

    fn apply_env_layer(
        &self,
        config: &mut PanelConfig,
    ) -> Result<(), ConfigLoadError> {
        if let Some(url) = self.var(ENV_SERVER_URL) {
            config.server_url = url;
        }
        if let Some(key) = self.var(ENV_API_KEY) {
            config.api_key = Some(key);
        }
        if let Some(raw) = self.var(ENV_PAGE_SIZE) {
            config.page_size = parse_number(ENV_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = self.var(ENV_MAX_POLL_ATTEMPTS) {
            config.timings.max_poll_attempts =
                parse_number(ENV_MAX_POLL_ATTEMPTS, &raw)?;
        }

        let timings = &mut config.timings;
        let durations: [(&'static str, &mut Duration); 5] = [
            (ENV_POLL_INTERVAL, &mut timings.poll_interval),
            (ENV_DEBOUNCE, &mut timings.config_debounce),
            (ENV_TOAST_TTL, &mut timings.toast_ttl),
            (ENV_REFRESH_DELAY, &mut timings.refresh_delay),
            (ENV_REQUEST_TIMEOUT, &mut timings.request_timeout),
        ];
        for (key, slot) in durations {
            if let Some(raw) = self.var(key) {
                *slot = parse_duration(key, &raw)?;
            }
        }

        Ok(())
    }
}

pub fn load_file(path: &Path) -> Result<PanelConfigFile, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let origin = path.display().to_string();

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents).map_err(|err| {
            ConfigLoadError::Parse {
                origin,
                message: err.to_string(),
            }
        }),
        Some("toml") => {
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                origin,
                message: err.to_string(),
            })
        }
        _ => parse_from_str(&contents, &origin),
    }
}

pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> Result<PanelConfigFile, ConfigLoadError> {
    // Try TOML first, then JSON for convenience.
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            ConfigLoadError::Parse {
                origin: origin.to_string(),
                message: format!(
                    "toml error: {toml_err}; json error: {json_err}"
                ),
            }
        })
    })
}

fn parse_number(key: &'static str, raw: &str) -> Result<u32, ConfigLoadError> {
    raw.trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigLoadError::InvalidEnv {
            key,
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

fn parse_duration(
    key: &'static str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigLoadError::InvalidEnv {
            key,
            value: raw.to_string(),
            reason: err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn loader_with(vars: &[(&str, &str)]) -> PanelConfigLoader {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PanelConfigLoader::new()
            .with_default_path(None)
            .with_env(move |key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_any_layer() {
        let load = loader_with(&[]).load().unwrap();
        assert_eq!(load.source, PanelConfigSource::Default);
        assert_eq!(load.config, PanelConfig::default());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "server_url = \"files.example:9000\"\npage_size = 20\n\
             [timings]\nrefresh_delay = \"3s\""
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let load = loader_with(&[
            (ENV_CONFIG_PATH, path.as_str()),
            (ENV_PAGE_SIZE, "50"),
            (ENV_POLL_INTERVAL, "250ms"),
            (ENV_API_KEY, "k-123"),
        ])
        .load()
        .unwrap();

        assert_eq!(
            load.source,
            PanelConfigSource::EnvPath(file.path().to_path_buf())
        );
        assert_eq!(load.config.server_url, "http://files.example:9000");
        assert_eq!(load.config.page_size, 50);
        assert_eq!(load.config.api_key.as_deref(), Some("k-123"));
        assert_eq!(
            load.config.timings.poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(load.config.timings.refresh_delay, Duration::from_secs(3));
    }

    #[test]
    fn json_files_are_accepted() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        write!(file, r#"{{"timings": {{"max_poll_attempts": 12}}}}"#).unwrap();

        let overlay = load_file(file.path()).unwrap();
        assert_eq!(overlay.timings.max_poll_attempts, Some(12));
    }

    #[test]
    fn malformed_env_values_name_the_key() {
        let err = loader_with(&[(ENV_TOAST_TTL, "soon")]).load().unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv {
                key: ENV_TOAST_TTL,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_page_size_is_rejected() {
        let err = loader_with(&[(ENV_PAGE_SIZE, "500")]).load().unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(_)));
    }
}
