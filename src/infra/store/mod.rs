//! Backing store adapters.

mod connection;
mod local;
mod remote;

use std::sync::Arc;

use tracing::{info, warn};

use crate::{application::store::BackingStore, config::StoreBackend, config::StoreSettings};

pub use connection::{BlobAccount, ConnectionError, Credential};
pub use local::LocalStore;
pub use remote::{RemoteBlobStore, RemoteOptions};

/// Construct the configured store. Never fails; a remote store that cannot be
/// initialised reports itself unavailable instead.
pub fn build_store(settings: &StoreSettings) -> Arc<dyn BackingStore> {
    match &settings.backend {
        StoreBackend::Local { root } => {
            if !root.is_dir() {
                warn!(
                    target = "bulletin::store",
                    root = %root.display(),
                    "Local content root does not exist or is not a directory"
                );
            }
            info!(
                target = "bulletin::store",
                root = %root.display(),
                "Serving content from local files"
            );
            Arc::new(LocalStore::new(root.clone()))
        }
        StoreBackend::Remote {
            connection_string,
            container,
        } => {
            let store = RemoteBlobStore::connect(
                connection_string,
                container.clone(),
                RemoteOptions {
                    request_timeout: settings.request_timeout,
                    probe_timeout: settings.probe_timeout,
                },
            );
            info!(
                target = "bulletin::store",
                container = %container,
                configured = store.is_configured(),
                "Serving content from blob storage"
            );
            Arc::new(store)
        }
    }
}
