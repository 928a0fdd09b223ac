//! # Prometheus Metrics
//!
//! Relay throughput and health. Everything lives in a dedicated registry
//! under the `crossmint` prefix and is rendered at `/metrics`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crossmint_protocol::ErrorKind;

/// Metric handles for the relayer. Cheap to clone.
#[derive(Clone)]
pub struct RelayerMetrics {
    registry: Registry,
    /// Authorizations minted on the target chain.
    pub mints_relayed_total: IntCounter,
    /// Burns released on the home chain.
    pub releases_relayed_total: IntCounter,
    /// Failed submissions, labelled by error kind and direction.
    pub relay_failures_total: IntCounterVec,
    /// Facts dropped as replays.
    pub replays_dropped_total: IntCounter,
    /// Facts given up on: never issued, or out of attempts.
    pub facts_abandoned_total: IntCounter,
    /// Header reports accepted by either verifier.
    pub headers_reported_total: IntCounter,
    /// Authorizations waiting to be minted.
    pub pending_mints: IntGauge,
    /// Burns waiting to be released.
    pub pending_releases: IntGauge,
    /// Latest sealed home block.
    pub home_height: IntGauge,
    /// Latest sealed target block.
    pub target_height: IntGauge,
}

impl RelayerMetrics {
    /// Create and register every metric.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("crossmint".into()), None)?;

        let mints_relayed_total = IntCounter::new(
            "mints_relayed_total",
            "Mint authorizations executed on the target chain",
        )?;
        registry.register(Box::new(mints_relayed_total.clone()))?;

        let releases_relayed_total = IntCounter::new(
            "releases_relayed_total",
            "Burn commitments released on the home chain",
        )?;
        registry.register(Box::new(releases_relayed_total.clone()))?;

        let relay_failures_total = IntCounterVec::new(
            Opts::new("relay_failures_total", "Failed relay submissions"),
            &["direction", "kind"],
        )?;
        registry.register(Box::new(relay_failures_total.clone()))?;

        let replays_dropped_total = IntCounter::new(
            "replays_dropped_total",
            "Facts dropped because they were already consumed",
        )?;
        registry.register(Box::new(replays_dropped_total.clone()))?;

        let facts_abandoned_total = IntCounter::new(
            "facts_abandoned_total",
            "Queued facts dropped because they can never be submitted successfully",
        )?;
        registry.register(Box::new(facts_abandoned_total.clone()))?;

        let headers_reported_total = IntCounter::new(
            "headers_reported_total",
            "Header reports accepted by a verifier",
        )?;
        registry.register(Box::new(headers_reported_total.clone()))?;

        let pending_mints = IntGauge::new("pending_mints", "Authorizations awaiting mint")?;
        registry.register(Box::new(pending_mints.clone()))?;

        let pending_releases = IntGauge::new("pending_releases", "Burns awaiting release")?;
        registry.register(Box::new(pending_releases.clone()))?;

        let home_height = IntGauge::new("home_height", "Latest sealed home block")?;
        registry.register(Box::new(home_height.clone()))?;

        let target_height = IntGauge::new("target_height", "Latest sealed target block")?;
        registry.register(Box::new(target_height.clone()))?;

        Ok(Self {
            registry,
            mints_relayed_total,
            releases_relayed_total,
            relay_failures_total,
            replays_dropped_total,
            facts_abandoned_total,
            headers_reported_total,
            pending_mints,
            pending_releases,
            home_height,
            target_height,
        })
    }

    /// Count one failed submission.
    pub fn record_failure(&self, direction: &str, kind: ErrorKind) {
        self.relay_failures_total
            .with_label_values(&[direction, kind.as_str()])
            .inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle for axum state.
pub type SharedMetrics = Arc<RelayerMetrics>;

/// Renders `/metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
