use chrono::{DateTime, Utc};
use orderdesk_model::calls::Call;
use orderdesk_model::orders::Order;

/// A server-owned row addressable by its numeric primary key.
pub trait RecordLike {
    /// Database id used in item routes such as `/orders/{id}`.
    fn record_id(&self) -> i64;

    /// Business key shown to operators (order number, call id).
    fn display_key(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

impl RecordLike for Order {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn display_key(&self) -> &str {
        &self.order_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl RecordLike for Call {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn display_key(&self) -> &str {
        &self.call_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
