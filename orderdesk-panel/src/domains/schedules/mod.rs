//! Recurring scrape triggers and their installation state.

pub mod coordinator;

pub use coordinator::{ScheduleCoordinator, ScheduleSnapshot, ScheduleSync};
