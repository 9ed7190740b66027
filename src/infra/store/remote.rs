//! Azure Blob Storage content store over the Blob REST API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use url::Url;

use crate::application::store::{BackingStore, StoreError, StoreKind};

use super::connection::{
    API_VERSION, BlobAccount, Credential, ms_date, shared_key_signature, string_to_sign,
};

const BLOB_NOT_FOUND: &str = "BlobNotFound";

#[derive(Debug, Clone, Copy)]
pub struct RemoteOptions {
    /// Upper bound for a single blob download.
    pub request_timeout: Duration,
    /// Upper bound for the availability probe.
    pub probe_timeout: Duration,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Blob container reader.
///
/// Construction never fails: a connection string that cannot be parsed, or an
/// HTTP client that cannot be built, leaves the store permanently unavailable.
pub struct RemoteBlobStore {
    container: String,
    client: Option<BlobClient>,
    options: RemoteOptions,
}

struct BlobClient {
    http: Client,
    account: BlobAccount,
}

impl RemoteBlobStore {
    pub fn connect(
        connection_string: &str,
        container: impl Into<String>,
        options: RemoteOptions,
    ) -> Self {
        let container = container.into();
        let client = match BlobClient::new(connection_string, options) {
            Ok(client) => {
                info!(
                    target = "bulletin::store::remote",
                    container = %container,
                    endpoint = %client.account.endpoint,
                    "Blob storage client initialised"
                );
                Some(client)
            }
            Err(reason) => {
                error!(
                    target = "bulletin::store::remote",
                    container = %container,
                    error = %reason,
                    "Failed to initialise blob storage client; store will report unavailable"
                );
                None
            }
        };

        Self {
            container,
            client,
            options,
        }
    }

    /// Whether a client was constructed. A store without one never becomes available.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn probe(&self, client: &BlobClient) -> Result<StatusCode, String> {
        let mut url = client.container_url(&self.container)?;
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "list")
            .append_pair("maxresults", "1");

        let response = client.get(url, self.options.probe_timeout).await?;
        Ok(response.status())
    }
}

impl BlobClient {
    fn new(connection_string: &str, options: RemoteOptions) -> Result<Self, String> {
        let account = BlobAccount::parse(connection_string).map_err(|err| err.to_string())?;
        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|err| format!("failed to build HTTP client: {err}"))?;
        Ok(Self { http, account })
    }

    fn container_url(&self, container: &str) -> Result<Url, String> {
        let mut url = self.account.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| "blob endpoint cannot be a base URL".to_string())?
            .pop_if_empty()
            .push(container);
        Ok(url)
    }

    fn blob_url(&self, container: &str, name: &str) -> Result<Url, String> {
        let parts: Vec<&str> = name.split('/').collect();
        if name.is_empty()
            || parts
                .iter()
                .any(|part| part.is_empty() || *part == "." || *part == "..")
        {
            return Err("invalid blob name".to_string());
        }

        let mut url = self.container_url(container)?;
        url.path_segments_mut()
            .map_err(|_| "blob endpoint cannot be a base URL".to_string())?
            .extend(parts);
        Ok(url)
    }

    async fn get(&self, mut url: Url, timeout: Duration) -> Result<Response, String> {
        if let Credential::Sas(token) = &self.account.credential {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{token}"),
                _ => token.clone(),
            };
            url.set_query(Some(&query));
        }

        let request = self.authorize(self.http.get(url.clone()), &url)?;
        request
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| format!("request to blob service failed: {err}"))
    }

    fn authorize(&self, request: RequestBuilder, url: &Url) -> Result<RequestBuilder, String> {
        let request = request.header("x-ms-version", API_VERSION);
        let Credential::SharedKey { account, key } = &self.account.credential else {
            return Ok(request);
        };

        let date = ms_date(OffsetDateTime::now_utc())
            .map_err(|err| format!("failed to format request date: {err}"))?;
        let headers = BTreeMap::from([
            ("x-ms-date".to_string(), date.clone()),
            ("x-ms-version".to_string(), API_VERSION.to_string()),
        ]);
        let signature = shared_key_signature(key, &string_to_sign("GET", url, account, &headers))
            .map_err(|err| format!("failed to sign request: {err}"))?;

        Ok(request
            .header("x-ms-date", date)
            .header("Authorization", format!("SharedKey {account}:{signature}")))
    }
}

#[async_trait]
impl BackingStore for RemoteBlobStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    async fn fetch(&self, name: &str) -> Result<Bytes, StoreError> {
        let Some(client) = &self.client else {
            return Err(StoreError::io(name, "blob storage client is not initialised"));
        };

        let url = client
            .blob_url(&self.container, name)
            .map_err(|reason| StoreError::io(name, reason))?;
        let response = client
            .get(url, self.options.request_timeout)
            .await
            .map_err(|reason| StoreError::io(name, reason))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let code = response
                .headers()
                .get("x-ms-error-code")
                .and_then(|value| value.to_str().ok())
                .unwrap_or(BLOB_NOT_FOUND)
                .to_string();
            if code == BLOB_NOT_FOUND {
                return Err(StoreError::not_found(name));
            }
            return Err(StoreError::io(
                name,
                format!("blob service returned 404 ({code})"),
            ));
        }
        if !status.is_success() {
            return Err(StoreError::io(
                name,
                format!("blob service returned {status}"),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|err| StoreError::io(name, format!("failed to read blob body: {err}")))
    }

    async fn is_available(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        match tokio::time::timeout(self.options.probe_timeout, self.probe(client)).await {
            Ok(Ok(status)) if status.is_success() => true,
            Ok(Ok(status)) => {
                warn!(
                    target = "bulletin::store::remote",
                    container = %self.container,
                    status = status.as_u16(),
                    "Blob storage probe rejected"
                );
                false
            }
            Ok(Err(reason)) => {
                warn!(
                    target = "bulletin::store::remote",
                    container = %self.container,
                    error = %reason,
                    "Blob storage probe failed"
                );
                false
            }
            Err(_) => {
                warn!(
                    target = "bulletin::store::remote",
                    container = %self.container,
                    timeout_ms = self.options.probe_timeout.as_millis() as u64,
                    "Blob storage probe timed out"
                );
                false
            }
        }
    }
}
