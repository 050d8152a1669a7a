//! Prometheus metrics

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Decoded instrument stream events
    StreamEvents,
    /// Universe tickers that passed the move and cooldown gates
    ScannerCandidates,
    /// Scanner signals emitted
    ScannerSignals,
    /// Enrichment calls that fell back to the neutral ratio
    EnrichmentFallbacks,
    /// Signals that failed to persist
    StoreFailures,
    /// Universe feed reconnects
    FeedReconnects,
    /// REST poll failures
    PollFailures,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Scanner candle fetch
    CandleFetch,
    /// Snapshot render for one push
    SnapshotRender,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Connected client sessions
    ActiveSessions,
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::StreamEvents => "flow_stream_events_total",
        CounterMetric::ScannerCandidates => "flow_scanner_candidates_total",
        CounterMetric::ScannerSignals => "flow_scanner_signals_total",
        CounterMetric::EnrichmentFallbacks => "flow_enrichment_fallbacks_total",
        CounterMetric::StoreFailures => "flow_store_failures_total",
        CounterMetric::FeedReconnects => "flow_feed_reconnects_total",
        CounterMetric::PollFailures => "flow_poll_failures_total",
    }
}

/// Increment a counter with a single `kind` label
pub fn increment(metric: CounterMetric, kind: &'static str) {
    counter!(counter_name(metric), "kind" => kind).increment(1);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::CandleFetch => "flow_candle_fetch_seconds",
        LatencyMetric::SnapshotRender => "flow_snapshot_render_seconds",
    };

    histogram!(metric_name).record(duration.as_secs_f64());
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::ActiveSessions => "flow_active_sessions",
    };

    gauge!(metric_name).set(value);
}

/// Install the Prometheus recorder with an HTTP listener on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!(addr = %addr, "Prometheus metrics exporter listening");
    Ok(())
}
