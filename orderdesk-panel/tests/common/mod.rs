#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use orderdesk_config::PanelConfig;
use orderdesk_panel::ControlPanel;
use orderdesk_panel::infra::CredentialContext;
use orderdesk_panel::infra::testing::TestApiService;
use serde_json::{Value, json};

/// Panel wired to a scriptable stub, with its router running.
pub fn stub_panel(api_key: Option<&str>) -> (TestApiService, ControlPanel) {
    let api = TestApiService::new();
    let panel = ControlPanel::new(
        Arc::new(api.clone()),
        CredentialContext::new(api_key),
        &PanelConfig::default(),
    );
    panel.start();
    (api, panel)
}

/// Let spawned router and refresh tasks run to their next suspension.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn status(status: &str) -> Value {
    json!({ "workflow_id": "wf-1", "status": status })
}

pub fn order(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "order_id": format!("A-{id}"),
        "status": status,
        "belnr": null,
        "created_at": "2026-10-01T08:00:00Z",
        "updated_at": "2026-10-01T08:00:00Z"
    })
}
