pub mod messages;
pub mod status;

pub use messages::{EventBus, PanelEvent};
pub use status::OpStatus;
