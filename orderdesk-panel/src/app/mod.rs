pub mod bootstrap;
pub mod panel;

pub use bootstrap::AppConfig;
pub use panel::ControlPanel;
