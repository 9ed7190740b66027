use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG` directives take precedence over the configured level. Logs are
/// written to stderr; stdout is reserved for `fetch` output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with whichever recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "bulletin_content_cache_hit_total",
            Unit::Count,
            "Total number of content lookups served from cache."
        );
        describe_counter!(
            "bulletin_content_cache_miss_total",
            Unit::Count,
            "Total number of content lookups that required a fetch."
        );
        describe_counter!(
            "bulletin_content_cache_evict_total",
            Unit::Count,
            "Total number of cached documents evicted due to capacity."
        );
        describe_counter!(
            "bulletin_content_cache_clear_total",
            Unit::Count,
            "Total number of explicit cache clears."
        );
        describe_counter!(
            "bulletin_content_fetch_error_total",
            Unit::Count,
            "Total number of failed content loads, labelled by failure kind."
        );
        describe_histogram!(
            "bulletin_content_fetch_ms",
            Unit::Milliseconds,
            "Backing store fetch and parse latency in milliseconds."
        );
        describe_gauge!(
            "bulletin_store_available",
            Unit::Count,
            "1 when the last backing store probe succeeded, 0 otherwise."
        );
    });
}
