//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the metrics
//! port. Everything lives in a dedicated [`prometheus::Registry`] with the
//! `qupi` prefix.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use qupi_protocol::TransactionService;

/// Handles for every metric the node records.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Successful `generate_key` calls.
    pub keys_generated_total: IntCounter,
    /// Transactions that finished `completed`.
    pub transactions_completed_total: IntCounter,
    /// Transactions that finished `failed`.
    pub transactions_failed_total: IntCounter,
    /// Requests answered with a 4xx or 5xx.
    pub requests_rejected_total: IntCounter,
    /// Live sessions, refreshed at scrape time.
    pub active_sessions: IntGauge,
    /// Sessions removed by eviction or expiry, refreshed at scrape time.
    pub sessions_evicted_total: IntGauge,
    /// Sifted key length per generation.
    pub sifted_key_length: Histogram,
    /// Wall time of `process_transaction`.
    pub transaction_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("qupi".into()), None)?;

        let keys_generated_total = register(
            &registry,
            IntCounter::new("keys_generated_total", "Total BB84 keys generated")?,
        )?;
        let transactions_completed_total = register(
            &registry,
            IntCounter::new(
                "transactions_completed_total",
                "Transactions whose encryption round-trip succeeded",
            )?,
        )?;
        let transactions_failed_total = register(
            &registry,
            IntCounter::new(
                "transactions_failed_total",
                "Transactions whose encryption round-trip failed",
            )?,
        )?;
        let requests_rejected_total = register(
            &registry,
            IntCounter::new(
                "requests_rejected_total",
                "API requests answered with an error status",
            )?,
        )?;
        let active_sessions = register(
            &registry,
            IntGauge::new("active_sessions", "Sessions currently held in memory")?,
        )?;
        let sessions_evicted_total = register(
            &registry,
            IntGauge::new(
                "sessions_evicted_total",
                "Sessions removed by capacity eviction or TTL expiry",
            )?,
        )?;
        let sifted_key_length = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new("sifted_key_length", "Sifted key length in bits")
                    .buckets(vec![8.0, 16.0, 24.0, 32.0, 40.0, 48.0, 64.0, 128.0, 512.0, 2048.0]),
            )?,
        )?;
        let transaction_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "transaction_latency_seconds",
                    "Transaction processing latency in seconds",
                )
                .buckets(vec![
                    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            keys_generated_total,
            transactions_completed_total,
            transactions_failed_total,
            requests_rejected_total,
            active_sessions,
            sessions_evicted_total,
            sifted_key_length,
            transaction_latency_seconds,
        })
    }

    /// Copies the store's gauges into the registry.
    pub fn observe_store(&self, service: &TransactionService) {
        self.active_sessions.set(service.session_count() as i64);
        self.sessions_evicted_total
            .set(service.store().evicted_total() as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn register<C>(registry: &Registry, collector: C) -> Result<C, prometheus::Error>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

/// State for the metrics router.
#[derive(Clone)]
pub struct MetricsState {
    pub metrics: Arc<NodeMetrics>,
    pub service: Arc<TransactionService>,
}

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    state.metrics.observe_store(&state.service);
    match state.metrics.encode() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use qupi_protocol::config::ServiceConfig;

    #[test]
    fn encodes_with_prefix() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.keys_generated_total.inc();
        metrics.sifted_key_length.observe(31.0);

        let body = metrics.encode().unwrap();
        assert!(body.contains("qupi_keys_generated_total 1"));
        assert!(body.contains("qupi_sifted_key_length_count 1"));
    }

    #[test]
    fn store_gauges_follow_the_service() {
        let metrics = NodeMetrics::new().unwrap();
        let service = TransactionService::with_os_entropy(ServiceConfig::default()).unwrap();
        service.generate_key("a", "b").unwrap();
        service.generate_key("c", "d").unwrap();

        metrics.observe_store(&service);
        assert_eq!(metrics.active_sessions.get(), 2);
        assert_eq!(metrics.sessions_evicted_total.get(), 0);
    }
}
