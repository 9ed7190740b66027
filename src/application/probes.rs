//! Liveness and readiness reporting.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bulletin_api_types::{
    HealthResponse, HealthStatus, ReadinessChecks, ReadinessResponse, ReadinessStatus,
};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::application::{content::ContentService, store::StoreKind};

#[derive(Clone)]
pub struct ProbeService {
    content: Arc<ContentService>,
    started: Instant,
    initialized: Arc<AtomicBool>,
}

impl ProbeService {
    /// Probe service for a content service that is ready to take traffic.
    pub fn new(content: Arc<ContentService>) -> Self {
        let probes = Self::pending(content);
        probes.mark_initialized();
        probes
    }

    /// Probe service that reports `not_ready` until [`mark_initialized`](Self::mark_initialized).
    pub fn pending(content: Arc<ContentService>) -> Self {
        Self {
            content,
            started: Instant::now(),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Never fails and performs no I/O.
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: OffsetDateTime::now_utc(),
            uptime_seconds: self.started.elapsed().as_secs_f64(),
        }
    }

    /// Reports the backing store check only for remote storage.
    pub async fn readiness(&self) -> ReadinessResponse {
        let blob_storage = match self.content.store_kind() {
            StoreKind::Remote => Some(self.content.is_backing_store_available().await),
            StoreKind::Local => None,
        };
        let checks = ReadinessChecks {
            service_initialized: self.is_initialized(),
            blob_storage,
        };
        let status = if checks.all_passed() {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };

        ReadinessResponse {
            status,
            timestamp: OffsetDateTime::now_utc(),
            checks,
        }
    }
}
