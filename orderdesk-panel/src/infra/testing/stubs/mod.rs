pub mod api;

pub use api::{ApiCall, Endpoint, ResponseGate, TestApiService};
