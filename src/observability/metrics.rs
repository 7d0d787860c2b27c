//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the proxy metrics
//! - Emit them through an injected `StatsClient`
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `evp_proxy.request` (count): one per inbound request
//! - `evp_proxy.request_bytes` (count): inbound content length, -1 when unknown
//! - `evp_proxy.request_duration_ms` (timing): full fan-out duration
//! - `evp_proxy.request_error` (count): one per failed inbound request
//!
//! # Design Decisions
//! - Tags are `key:value` strings; exporters turn them into labels
//! - Emitted exactly once per inbound request, never per destination

use std::net::SocketAddr;
use std::time::Duration;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const REQUEST_METRIC: &str = "evp_proxy.request";
pub const REQUEST_BYTES_METRIC: &str = "evp_proxy.request_bytes";
pub const REQUEST_DURATION_METRIC: &str = "evp_proxy.request_duration_ms";
pub const REQUEST_ERROR_METRIC: &str = "evp_proxy.request_error";

/// Histogram buckets for request duration, in milliseconds.
const DURATION_BUCKETS_MS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// Metrics sink.
pub trait StatsClient: Send + Sync {
    fn count(&self, name: &str, value: i64, tags: &[String], rate: f64);
    fn timing(&self, name: &str, value: Duration, tags: &[String], rate: f64);
}

/// Emit the per-request metric set.
pub fn record_request(
    stats: &dyn StatsClient,
    tags: &[String],
    request_bytes: i64,
    duration: Duration,
    failed: bool,
) {
    stats.count(REQUEST_METRIC, 1, tags, 1.0);
    stats.count(REQUEST_BYTES_METRIC, request_bytes, tags, 1.0);
    stats.timing(REQUEST_DURATION_METRIC, duration, tags, 1.0);
    if failed {
        stats.count(REQUEST_ERROR_METRIC, 1, tags, 1.0);
    }
}

/// `StatsClient` on top of the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsStatsClient;

impl StatsClient for MetricsStatsClient {
    fn count(&self, name: &str, value: i64, tags: &[String], _rate: f64) {
        // Unknown sizes arrive as -1; counters only go up.
        let Ok(value) = u64::try_from(value) else {
            return;
        };
        metrics::counter!(name.to_string(), labels(tags)).increment(value);
    }

    fn timing(&self, name: &str, value: Duration, tags: &[String], _rate: f64) {
        metrics::histogram!(name.to_string(), labels(tags)).record(value.as_secs_f64() * 1000.0);
    }
}

fn labels(tags: &[String]) -> Vec<Label> {
    tags.iter()
        .map(|tag| match tag.split_once(':') {
            Some((key, value)) => Label::new(key.to_string(), value.to_string()),
            None => Label::new(tag.clone(), ""),
        })
        .collect()
}

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_ms".to_string()),
            DURATION_BUCKETS_MS,
        )?
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
