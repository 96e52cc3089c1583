//! The scrape target override, edited locally and persisted after the user
//! stops typing.

pub mod synchronizer;

pub use synchronizer::{ConfigSnapshot, ConfigSynchronizer};
