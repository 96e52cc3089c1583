//! Configuration library for the Orderdesk control panel.
//!
//! Settings are layered: built-in defaults, then an optional TOML/JSON file,
//! then `.env` and process environment overrides. The binary applies its own
//! command-line flags on top of the loaded [`PanelConfig`].

pub mod constants;
pub mod error;
pub mod loader;
pub mod models;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, PanelConfigLoader, PanelConfigSource};
pub use models::{PanelConfig, TimingConfig, normalize_server_url};
