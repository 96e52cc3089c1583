pub mod api;

pub use api::ApiService;
