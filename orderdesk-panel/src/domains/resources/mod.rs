//! Paginated views over server-owned collections (orders and calls).

pub mod kinds;
pub mod store;

pub use kinds::{Calls, Orders, ResourceKind};
pub use store::{FetchOutcome, ResourceSnapshot, ResourceStore, ViewState};

pub type OrdersStore = ResourceStore<Orders>;
pub type CallsStore = ResourceStore<Calls>;
