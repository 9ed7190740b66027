//! Wiring of settings into the shared services and HTTP state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::{content::ContentService, probes::ProbeService},
    cache::CacheConfig,
    config::Settings,
    infra::{
        http::{AdminState, HttpState},
        store::build_store,
    },
};

/// Services shared by both listeners and the CLI.
#[derive(Clone)]
pub struct AppContext {
    pub content: Arc<ContentService>,
    pub probes: ProbeService,
}

impl AppContext {
    /// Build the backing store and content service. Readiness stays pending until
    /// [`AppContext::start`] runs.
    pub fn from_settings(settings: &Settings) -> Self {
        let store = build_store(&settings.store);
        let content = Arc::new(ContentService::new(
            store,
            settings.content.clone(),
            CacheConfig::from(&settings.cache),
        ));
        let probes = ProbeService::pending(content.clone());

        info!(
            target = "bulletin::bootstrap",
            profile = settings.profile.as_str(),
            store = content.store_kind().as_str(),
            ttl_seconds = settings.cache.ttl.as_secs(),
            capacity = settings.cache.capacity.get(),
            "Content service initialised"
        );

        Self { content, probes }
    }

    /// Optionally warm the cache, then report the service as initialised.
    /// Warm-up failures are logged and never abort startup.
    pub async fn start(&self, warm_on_startup: bool) {
        if warm_on_startup {
            let loaded = self.content.warm().await;
            if loaded < crate::domain::content::ContentKey::ALL.len() {
                warn!(
                    target = "bulletin::bootstrap",
                    loaded,
                    "Some collections failed to load during warm-up"
                );
            }
        }
        self.probes.mark_initialized();
    }

    pub fn http_state(&self) -> HttpState {
        HttpState {
            content: self.content.clone(),
            probes: self.probes.clone(),
        }
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState {
            content: self.content.clone(),
        }
    }
}
