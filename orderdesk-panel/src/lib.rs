//! Headless control panel for the order pipeline backend.
//!
//! The panel keeps a page of orders and calls, the schedule cache, the scrape
//! target and the pending-work counters consistent with the server, and
//! drives long-running scrape/convert/upload workflows to completion. A
//! renderer (or the bundled CLI) reads the component snapshots and listens
//! to the notification bus.

pub mod app;
pub mod common;
pub mod domains;
pub mod infra;

pub use app::bootstrap::AppConfig;
pub use app::panel::ControlPanel;
