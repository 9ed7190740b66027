//! Wire types shared by the bulletin server and its clients.
//!
//! Content collections are served as free-form JSON documents; only the probe
//! responses and the content envelope have a fixed shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Body of the liveness probe (`/healthz`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
}

/// Body of the readiness probe (`/readyz`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

impl ReadinessStatus {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Individual readiness checks.
///
/// `blob_storage` is only reported when content is served from remote blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessChecks {
    pub service_initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_storage: Option<bool>,
}

impl ReadinessChecks {
    /// True when every reported check passed.
    pub fn all_passed(&self) -> bool {
        self.service_initialized && self.blob_storage.unwrap_or(true)
    }
}

/// Minimal status body used by the container health alias (`/health`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Typed view over a content collection response.
///
/// Records are kept as raw JSON because the server passes them through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEnvelope {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContentEnvelope {
    /// Empty collection carrying an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(message.into()),
        }
    }
}
