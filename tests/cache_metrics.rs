use std::collections::HashSet;
use std::sync::Arc;

use bulletin::application::content::ContentService;
use bulletin::cache::CacheConfig;
use bulletin::domain::content::{ContentFiles, ContentKey};
use bulletin::infra::store::LocalStore;
use bulletin::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;

#[tokio::test]
async fn content_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("events.json"), br#"{"items":[{"id":1}]}"#).expect("events");
    std::fs::write(dir.path().join("news.json"), br#"{"items":[]}"#).expect("news");

    // Capacity of one forces an eviction once a second collection is cached.
    let config = CacheConfig {
        capacity: 1,
        ..Default::default()
    };
    let service = ContentService::new(
        Arc::new(LocalStore::new(dir.path())),
        ContentFiles::default(),
        config,
    );

    service.get(ContentKey::Events).await;
    service.get(ContentKey::Events).await;
    service.get(ContentKey::News).await;
    let faq = service.get(ContentKey::Faq).await;
    assert_eq!(faq["error"], "File not found: faq.json");

    assert!(service.is_backing_store_available().await);
    service.clear_cache();

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "bulletin_content_cache_hit_total",
        "bulletin_content_cache_miss_total",
        "bulletin_content_cache_evict_total",
        "bulletin_content_cache_clear_total",
        "bulletin_content_fetch_error_total",
        "bulletin_content_fetch_ms",
        "bulletin_store_available",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
