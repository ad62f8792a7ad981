//! Prometheus metrics for relayed chat requests.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::relay::chunk::Assembled;
use crate::relay::error::RelayError;

/// Metrics owned by the application state.
pub struct RelayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    chunks_skipped: IntCounter,
    upstream_seconds: HistogramVec,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("relay_requests_total", "Chat requests by outcome"),
            &["outcome"],
        )?;
        let chunks_skipped = IntCounter::new(
            "relay_chunks_skipped_total",
            "Upstream chunks skipped as malformed or without content",
        )?;
        let upstream_seconds = HistogramVec::new(
            HistogramOpts::new("relay_upstream_seconds", "Time spent waiting on the backend")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(chunks_skipped.clone()))?;
        registry.register(Box::new(upstream_seconds.clone()))?;

        Ok(Self {
            registry,
            requests,
            chunks_skipped,
            upstream_seconds,
        })
    }

    /// Count a request rejected before reaching the backend.
    pub fn record_bad_request(&self) {
        self.requests.with_label_values(&["bad_request"]).inc();
    }

    /// Record the result of one backend call.
    pub fn record_reply(&self, result: &Result<Assembled, RelayError>, elapsed_secs: f64) {
        let outcome = match result {
            Ok(assembled) => {
                self.chunks_skipped.inc_by(assembled.skipped as u64);
                "ok"
            }
            Err(e) => e.kind(),
        };
        self.requests.with_label_values(&[outcome]).inc();
        self.upstream_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
