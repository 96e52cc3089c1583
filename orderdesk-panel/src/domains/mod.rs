pub mod exports;
pub mod notifications;
pub mod resources;
pub mod schedules;
pub mod scrape_config;
pub mod workflow;
