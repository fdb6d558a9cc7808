//! Prometheus-style metrics for a pipeline run.
//!
//! Recording goes through the `metrics` facade, so the helpers are no-ops
//! until [`init`] installs a recorder. A run is short-lived, so there is no
//! listener: the snapshot is rendered once at the end and either written to a
//! file or pushed to a Pushgateway.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Loader
    RowsLoaded,

    // Enricher
    EnrichLookupsSuccess,
    EnrichLookupsFailed,
    EnrichLookupDuration,

    // Persister
    RowsWritten,
    TableReplaceDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsLoaded => "movie_etl_rows_loaded_total",
            MetricName::EnrichLookupsSuccess => "movie_etl_enrich_lookups_success_total",
            MetricName::EnrichLookupsFailed => "movie_etl_enrich_lookups_failed_total",
            MetricName::EnrichLookupDuration => "movie_etl_enrich_lookup_duration_seconds",
            MetricName::RowsWritten => "movie_etl_rows_written_total",
            MetricName::TableReplaceDuration => "movie_etl_table_replace_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<(), String> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))?;
    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics recorder installed");
    Ok(())
}

/// Current snapshot in the Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|h| h.render())
}

pub fn write_snapshot(path: &Path) -> std::io::Result<bool> {
    match render() {
        Some(text) => {
            std::fs::write(path, text)?;
            info!("Wrote metrics snapshot to {}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Push the snapshot to a Pushgateway under job `movie_etl`. Failures are logged, not returned.
pub fn push_snapshot(pushgateway_url: &str, instance: &str) {
    let Some(body) = render() else {
        return;
    };
    let push_url = format!(
        "{}/metrics/job/movie_etl/instance/{}",
        pushgateway_url.trim_end_matches('/'),
        instance
    );
    let client = reqwest::blocking::Client::new();
    match client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
    {
        Ok(r) if r.status().is_success() => info!("Pushed metrics to Pushgateway"),
        Ok(r) => warn!("Pushgateway push responded with status {}", r.status().as_u16()),
        Err(e) => warn!("Failed to push metrics to Pushgateway: {}", e),
    }
}

pub mod loader {
    use super::MetricName;

    pub fn rows_loaded(file: &'static str, count: usize) {
        ::metrics::counter!(MetricName::RowsLoaded.as_str(), "file" => file).increment(count as u64);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn lookup_succeeded() {
        ::metrics::counter!(MetricName::EnrichLookupsSuccess.as_str()).increment(1);
    }

    pub fn lookup_failed(kind: &'static str) {
        ::metrics::counter!(MetricName::EnrichLookupsFailed.as_str(), "kind" => kind).increment(1);
    }

    pub fn lookup_duration(secs: f64) {
        ::metrics::histogram!(MetricName::EnrichLookupDuration.as_str()).record(secs);
    }
}

pub mod storage {
    use super::MetricName;

    pub fn rows_written(table: &str, count: usize) {
        ::metrics::counter!(MetricName::RowsWritten.as_str(), "table" => table.to_string())
            .increment(count as u64);
    }

    pub fn replace_duration(table: &str, secs: f64) {
        ::metrics::histogram!(MetricName::TableReplaceDuration.as_str(), "table" => table.to_string())
            .record(secs);
    }
}
