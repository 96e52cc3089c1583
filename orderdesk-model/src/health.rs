/// Body of the unauthenticated `GET /health` probe.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub temporal: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sftp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
