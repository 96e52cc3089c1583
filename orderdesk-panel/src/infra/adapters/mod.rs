pub mod api_client_adapter;

pub use api_client_adapter::ApiClientAdapter;
