macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Unversioned liveness probe; the only route served without an API key.
pub const HEALTH: &str = "/health";

/// Versioned API route definitions of the order-pipeline backend
pub mod v1 {
    pub mod orders {
        pub const COLLECTION: &str = v1_path!("/orders");
        pub const ITEM: &str = v1_path!("/orders/{id}");
        pub const EXPORTS: &str = v1_path!("/orders/{id}/exports");
    }

    pub mod calls {
        pub const COLLECTION: &str = v1_path!("/calls");
        pub const ITEM: &str = v1_path!("/calls/{id}");
        pub const EXPORTS: &str = v1_path!("/calls/{id}/exports");
    }

    pub mod scrape {
        pub const ORDERS: &str = v1_path!("/scrape/orders");
        pub const CONFIG: &str = v1_path!("/scrape/config");
    }

    pub mod workflows {
        pub const STATUS: &str = v1_path!("/workflows/{id}/status");
    }

    pub mod schedules {
        pub const COLLECTION: &str = v1_path!("/schedules");
        pub const ITEM: &str = v1_path!("/schedules/{id}");
        pub const TOGGLE: &str = v1_path!("/schedules/{id}/toggle");
        pub const SYNC: &str = v1_path!("/schedules/sync");
    }

    pub mod exports {
        pub const PENDING: &str = v1_path!("/exports/pending");
        pub const PENDING_UPLOAD: &str = v1_path!("/exports/pending-upload");
        pub const CONVERT: &str = v1_path!("/exports/{id}/convert");
        pub const CONVERT_ALL: &str = v1_path!("/exports/convert-all");
        pub const UPLOAD: &str = v1_path!("/exports/{id}/upload");
        pub const UPLOAD_ALL: &str = v1_path!("/exports/upload-all");
        pub const XML: &str = v1_path!("/exports/{id}/xml");
    }
}

/// Helpers for building concrete paths from the route templates.
pub mod utils {
    /// Replace a single path parameter (e.g. `"{id}"`) with the provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }

    /// Shorthand for the `{id}` parameter every item route uses.
    pub fn with_id(route: &str, id: impl std::fmt::Display) -> String {
        replace_param(route, "{id}", id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_routes_are_versioned_and_filled() {
        assert_eq!(
            utils::with_id(v1::schedules::TOGGLE, 9),
            "/api/v1/schedules/9/toggle"
        );
        assert_eq!(
            utils::with_id(v1::workflows::STATUS, "wf-1"),
            "/api/v1/workflows/wf-1/status"
        );
        assert_eq!(HEALTH, "/health");
    }
}
