use std::fmt;

use chrono::{DateTime, Utc};

/// Lifecycle of an order as it moves through scrape, convert and upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OrderStatus {
    Pending,
    Scraped,
    Converted,
    Sent,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Scraped => "scraped",
            OrderStatus::Converted => "converted",
            OrderStatus::Sent => "sent",
            OrderStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of `GET /orders`, carrying the BELNR of its first export if any.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub id: i64,
    pub order_id: String,
    pub status: OrderStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub belnr: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Stored XML export attached to an order (Hapodu source or Taifun target).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderExport {
    pub id: i64,
    pub order_id: i64,
    pub belnr: String,
    pub external_order_id: String,
    pub xml_content: String,
    #[cfg_attr(feature = "serde", serde(default = "default_export_type"))]
    pub export_type: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "serde")]
fn default_export_type() -> String {
    "hapodu".to_string()
}
