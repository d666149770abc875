//! # Prometheus Metrics
//!
//! Operational metrics for the ink miner, scraped at `/metrics` on the
//! metrics port. Registered in a dedicated registry so nothing collides
//! with other consumers of the default global one.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// All Prometheus metric handles for the node. Handles are internally
/// reference-counted, so this is cheap to clone and share.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Blocks this miner found itself.
    pub blocks_mined_total: IntCounter,
    /// Valid blocks accepted from peers.
    pub blocks_received_total: IntCounter,
    /// Current canonical chain height.
    pub chain_height: IntGauge,
    /// Operations waiting in the unmined bucket.
    pub ops_pending: IntGauge,
    /// Connected peer miners.
    pub connected_peers: IntGauge,
    /// This miner's current ink balance.
    pub ink_balance: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("blockart".into()), None)
            .expect("failed to create prometheus registry");

        fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
            let c = IntCounter::new(name, help).expect("metric creation");
            registry.register(Box::new(c.clone())).expect("metric registration");
            c
        }
        fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
            let g = IntGauge::new(name, help).expect("metric creation");
            registry.register(Box::new(g.clone())).expect("metric registration");
            g
        }

        Self {
            blocks_mined_total: counter(
                &registry,
                "blocks_mined_total",
                "Blocks mined locally",
            ),
            blocks_received_total: counter(
                &registry,
                "blocks_received_total",
                "Valid blocks accepted from peers",
            ),
            chain_height: gauge(&registry, "chain_height", "Canonical chain height"),
            ops_pending: gauge(&registry, "ops_pending", "Operations in the unmined bucket"),
            connected_peers: gauge(&registry, "connected_peers", "Connected peer miners"),
            ink_balance: gauge(&registry, "ink_balance", "This miner's ink balance"),
            registry,
        }
    }

    /// Encodes all registered metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle for axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler rendering `/metrics`.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
