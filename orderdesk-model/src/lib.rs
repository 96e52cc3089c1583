//! Wire data models shared by the Orderdesk panel crates.
//!
//! Every type here mirrors a JSON document exchanged with the order-pipeline
//! backend. Serialization is opt-in through the `serde` feature so contract
//! crates can depend on the plain shapes without pulling in serde.
#![allow(missing_docs)]

pub mod calls;
pub mod error;
pub mod exports;
pub mod health;
pub mod orders;
pub mod page;
pub mod prelude;
pub mod routes;
pub mod schedules;
pub mod scrape_config;
pub mod workflow;

pub use error::{ModelError, ModelResult};
pub use page::{DEFAULT_PAGE_SIZE, ListPage, MAX_PAGE_SIZE, PageRequest};

/// Plain `{ "message": ... }` acknowledgement returned by delete and sync
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageResponse {
    pub message: String,
}
