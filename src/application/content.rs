//! Content retrieval with short-lived caching.
//!
//! Each collection is read from the backing store, parsed according to its
//! filename suffix and kept for the configured TTL. Failures are never cached
//! and never escape [`ContentService::get`]; callers receive an empty document
//! carrying an `error` message instead.

use std::sync::Arc;

use metrics::{counter, gauge, histogram};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::application::store::{BackingStore, StoreError, StoreKind};
use crate::cache::{CacheConfig, InsertOutcome, TtlStore};
use crate::domain::content::{ContentFiles, ContentFormat, ContentKey, Document, failure_document};

const SOURCE: &str = "application::content::ContentService";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid {format} in `{name}`: {detail}")]
    Parse {
        name: String,
        format: ContentFormat,
        detail: String,
    },
}

impl ContentError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentError::Store(StoreError::NotFound { .. }) => "not_found",
            ContentError::Store(StoreError::Io { .. }) => "io",
            ContentError::Parse { .. } => "parse",
        }
    }

    /// Message exposed to API consumers in the `error` field.
    pub fn public_message(&self) -> String {
        match self {
            ContentError::Store(StoreError::NotFound { name }) => format!("File not found: {name}"),
            ContentError::Store(StoreError::Io { name, .. }) => format!("Unable to load {name}"),
            ContentError::Parse { name, format, .. } => format!("Invalid {format} in {name}"),
        }
    }
}

pub struct ContentService {
    store: Arc<dyn BackingStore>,
    files: ContentFiles,
    cache: TtlStore<ContentKey, Arc<Document>>,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn BackingStore>,
        files: ContentFiles,
        cache: CacheConfig<ContentKey>,
    ) -> Self {
        Self {
            store,
            files,
            cache: TtlStore::new(cache),
        }
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Return the document for `key`, or an empty document describing the failure.
    pub async fn get(&self, key: ContentKey) -> Arc<Document> {
        match self.try_get(key).await {
            Ok(document) => document,
            Err(err) => Arc::new(failure_document(err.public_message())),
        }
    }

    pub async fn events(&self) -> Arc<Document> {
        self.get(ContentKey::Events).await
    }

    pub async fn news(&self) -> Arc<Document> {
        self.get(ContentKey::News).await
    }

    pub async fn faq(&self) -> Arc<Document> {
        self.get(ContentKey::Faq).await
    }

    /// Cached lookup that surfaces the failure instead of a fallback document.
    pub async fn try_get(&self, key: ContentKey) -> Result<Arc<Document>, ContentError> {
        if let Some(document) = self.cache.get(&key) {
            debug!(target = "bulletin::content", key = %key, "Cache hit");
            return Ok(document);
        }

        let generation = self.cache.generation();
        let name = self.files.filename(key);
        debug!(target = "bulletin::content", key = %key, name, "Cache miss, fetching");

        let started = Instant::now();
        let result = self.load(name).await;
        histogram!("bulletin_content_fetch_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(document) => {
                let document = Arc::new(document);
                if self.cache.insert(key, document.clone(), generation) == InsertOutcome::Superseded
                {
                    debug!(
                        target = "bulletin::content",
                        key = %key,
                        "Cache cleared during fetch; result not stored"
                    );
                }
                Ok(document)
            }
            Err(err) => {
                counter!("bulletin_content_fetch_error_total", "kind" => err.kind()).increment(1);
                match &err {
                    ContentError::Store(StoreError::NotFound { .. }) => warn!(
                        target = "bulletin::content",
                        source = SOURCE,
                        key = %key,
                        name,
                        error = %err,
                        "Content resource missing"
                    ),
                    _ => error!(
                        target = "bulletin::content",
                        source = SOURCE,
                        key = %key,
                        name,
                        kind = err.kind(),
                        error = %err,
                        "Failed to load content"
                    ),
                }
                Err(err)
            }
        }
    }

    /// Availability of the backing store, as reported to readiness checks.
    pub async fn is_backing_store_available(&self) -> bool {
        let available = self.store.is_available().await;
        gauge!("bulletin_store_available").set(if available { 1.0 } else { 0.0 });
        available
    }

    /// Drop every cached document. Fetches already in flight will not be stored.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!(target = "bulletin::content", "Content cache cleared");
    }

    /// Load every collection once, returning how many loaded successfully.
    pub async fn warm(&self) -> usize {
        let mut loaded = 0;
        for key in ContentKey::ALL {
            if self.try_get(key).await.is_ok() {
                loaded += 1;
            }
        }
        info!(
            target = "bulletin::content",
            loaded,
            total = ContentKey::ALL.len(),
            "Content cache warmed"
        );
        loaded
    }

    async fn load(&self, name: &str) -> Result<Document, ContentError> {
        let bytes = self.store.fetch(name).await?;
        parse_document(name, &bytes)
    }
}

/// Parse raw resource bytes according to the resource name's suffix.
pub fn parse_document(name: &str, bytes: &[u8]) -> Result<Document, ContentError> {
    let format = ContentFormat::from_name(name);
    let parse_error = |detail: String| ContentError::Parse {
        name: name.to_string(),
        format,
        detail,
    };

    let value: Value = match format {
        ContentFormat::Json => {
            serde_json::from_slice(bytes).map_err(|err| parse_error(err.to_string()))?
        }
        ContentFormat::Yaml => {
            serde_yaml::from_slice(bytes).map_err(|err| parse_error(err.to_string()))?
        }
    };

    if value.is_null() {
        return Err(parse_error("document is empty".to_string()));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        files: Mutex<HashMap<String, Result<Bytes, StoreError>>>,
        fetches: Mutex<HashMap<String, usize>>,
        total_fetches: AtomicUsize,
        unavailable: AtomicBool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeStore {
        fn with_gate(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
            Self {
                gate: Some((entered, release)),
                ..Default::default()
            }
        }

        fn put(&self, name: &str, body: &str) {
            self.files
                .lock()
                .expect("files lock")
                .insert(name.to_string(), Ok(Bytes::from(body.to_string())));
        }

        fn fail(&self, name: &str, error: StoreError) {
            self.files
                .lock()
                .expect("files lock")
                .insert(name.to_string(), Err(error));
        }

        fn fetches_of(&self, name: &str) -> usize {
            self.fetches
                .lock()
                .expect("fetches lock")
                .get(name)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl BackingStore for FakeStore {
        fn kind(&self) -> StoreKind {
            StoreKind::Remote
        }

        async fn fetch(&self, name: &str) -> Result<Bytes, StoreError> {
            self.total_fetches.fetch_add(1, Ordering::SeqCst);
            *self
                .fetches
                .lock()
                .expect("fetches lock")
                .entry(name.to_string())
                .or_default() += 1;

            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }

            self.files
                .lock()
                .expect("files lock")
                .get(name)
                .cloned()
                .unwrap_or_else(|| Err(StoreError::not_found(name)))
        }

        async fn is_available(&self) -> bool {
            !self.unavailable.load(Ordering::SeqCst)
        }
    }

    const EVENTS: &str = r#"{"items":[{"id":1,"title":"Launch","date":"2024-01-01"}]}"#;

    fn service(store: Arc<FakeStore>, ttl: Duration) -> ContentService {
        ContentService::new(store, ContentFiles::default(), CacheConfig::with_ttl(ttl))
    }

    #[tokio::test]
    async fn returns_parsed_document_and_serves_repeat_from_cache() {
        let store = Arc::new(FakeStore::default());
        store.put("events.json", EVENTS);
        let service = service(store.clone(), Duration::from_secs(60));

        let first = service.events().await;
        assert_eq!(
            *first,
            json!({"items": [{"id": 1, "title": "Launch", "date": "2024-01-01"}]})
        );

        store.put("events.json", r#"{"items":[]}"#);
        let second = service.events().await;

        assert_eq!(first, second);
        assert_eq!(store.fetches_of("events.json"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_triggers_single_refetch() {
        let store = Arc::new(FakeStore::default());
        store.put("news.json", r#"{"items":[{"id":1}]}"#);
        let service = service(store.clone(), Duration::from_secs(60));

        service.news().await;
        store.put("news.json", r#"{"items":[{"id":2}]}"#);

        tokio::time::advance(Duration::from_secs(61)).await;
        let refreshed = service.news().await;
        let again = service.news().await;

        assert_eq!(refreshed["items"][0]["id"], 2);
        assert_eq!(refreshed, again);
        assert_eq!(store.fetches_of("news.json"), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let store = Arc::new(FakeStore::default());
        let service = service(store.clone(), Duration::from_secs(60));

        let missing = service.news().await;
        assert_eq!(*missing, json!({"items": [], "error": "File not found: news.json"}));

        store.put("news.json", r#"{"items":[{"id":9}]}"#);
        let recovered = service.news().await;

        assert_eq!(recovered["items"][0]["id"], 9);
        assert_eq!(store.fetches_of("news.json"), 2);
    }

    #[tokio::test]
    async fn failure_for_one_key_leaves_others_cached() {
        let store = Arc::new(FakeStore::default());
        store.put("events.json", EVENTS);
        let service = service(store.clone(), Duration::from_secs(60));

        service.events().await;
        store.fail("news.json", StoreError::io("news.json", "connection reset"));

        let news = service.news().await;
        assert_eq!(news["error"], "Unable to load news.json");

        let events = service.events().await;
        assert_eq!(events["items"][0]["title"], "Launch");
        assert_eq!(store.fetches_of("events.json"), 1);
    }

    #[tokio::test]
    async fn malformed_content_reports_format() {
        let store = Arc::new(FakeStore::default());
        store.put("events.json", "{\"items\": [");
        store.put("faq.yaml", "items: [unclosed");
        let files = ContentFiles {
            faq: "faq.yaml".to_string(),
            ..ContentFiles::default()
        };
        let service = ContentService::new(store.clone(), files, CacheConfig::default());

        assert_eq!(service.events().await["error"], "Invalid JSON in events.json");
        assert_eq!(service.faq().await["error"], "Invalid YAML in faq.yaml");

        assert!(service.try_get(ContentKey::Events).await.is_err());
        assert_eq!(store.fetches_of("events.json"), 2);
    }

    #[tokio::test]
    async fn yaml_and_json_yield_same_structure() {
        let store = Arc::new(FakeStore::default());
        store.put(
            "faq.json",
            r#"{"items":[{"id":1,"question":"Where?","answer":"Here."}]}"#,
        );
        store.put(
            "faq.yml",
            "items:\n  - id: 1\n    question: Where?\n    answer: Here.\n",
        );

        let json_service = service(store.clone(), Duration::from_secs(60));
        let yaml_service = ContentService::new(
            store.clone(),
            ContentFiles {
                faq: "faq.yml".to_string(),
                ..ContentFiles::default()
            },
            CacheConfig::default(),
        );

        assert_eq!(json_service.faq().await, yaml_service.faq().await);
    }

    #[test]
    fn any_non_empty_document_passes_through() {
        let array = parse_document("events.json", b"[1, 2, 3]").expect("array is served");
        assert_eq!(array, json!([1, 2, 3]));

        let err = parse_document("events.json", b"null").expect_err("null is rejected");
        assert_eq!(err.public_message(), "Invalid JSON in events.json");

        let err = parse_document("faq.yaml", b"").expect_err("empty yaml is rejected");
        assert_eq!(err.kind(), "parse");
        assert_eq!(err.public_message(), "Invalid YAML in faq.yaml");
    }

    #[tokio::test]
    async fn clear_forces_fresh_fetch() {
        let store = Arc::new(FakeStore::default());
        store.put("news.json", r#"{"items":[{"id":1}]}"#);
        let service = service(store.clone(), Duration::from_secs(60));

        service.news().await;
        service.clear_cache();
        store.put("news.json", r#"{"items":[{"id":2}]}"#);

        let after = service.news().await;
        assert_eq!(after["items"][0]["id"], 2);
        assert_eq!(store.fetches_of("news.json"), 2);
    }

    #[tokio::test]
    async fn fetch_started_before_clear_is_not_cached() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(FakeStore::with_gate(entered.clone(), release.clone()));
        store.put("news.json", r#"{"items":[{"id":1}]}"#);
        let service = Arc::new(service(store.clone(), Duration::from_secs(60)));

        let in_flight = {
            let service = service.clone();
            tokio::spawn(async move { service.news().await })
        };

        entered.notified().await;
        service.clear_cache();
        release.notify_one();

        let stale = in_flight.await.expect("in-flight get completes");
        assert_eq!(stale["items"][0]["id"], 1);

        // The next lookup must go back to the store.
        let next = {
            let service = service.clone();
            tokio::spawn(async move { service.news().await })
        };
        entered.notified().await;
        release.notify_one();
        next.await.expect("second get completes");

        assert_eq!(store.fetches_of("news.json"), 2);
    }

    #[tokio::test]
    async fn warm_loads_every_collection() {
        let store = Arc::new(FakeStore::default());
        store.put("events.json", EVENTS);
        store.put("news.json", r#"{"items":[]}"#);
        let service = service(store.clone(), Duration::from_secs(60));

        assert_eq!(service.warm().await, 2);

        service.events().await;
        service.news().await;
        assert_eq!(store.total_fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn availability_delegates_to_store() {
        let store = Arc::new(FakeStore::default());
        let service = service(store.clone(), Duration::from_secs(60));

        assert!(service.is_backing_store_available().await);
        store.unavailable.store(true, Ordering::SeqCst);
        assert!(!service.is_backing_store_available().await);
        assert_eq!(service.store_kind(), StoreKind::Remote);
    }
}
