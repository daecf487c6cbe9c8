use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a successful query matched anyone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Found,
    NoTargets,
}

/// Response for the target query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub status: TargetStatus,
    pub submitters: Vec<String>,
    pub count: usize,
}

/// Response for the compile dry-run endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResponse {
    pub query: Value,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
