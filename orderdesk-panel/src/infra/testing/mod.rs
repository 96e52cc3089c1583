//! In-memory collaborators for tests and demos.

pub mod stubs;

pub use stubs::{ApiCall, Endpoint, ResponseGate, TestApiService};
