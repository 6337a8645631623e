//! # Prometheus Metrics
//!
//! Operational metrics for the ledger service, scraped at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (prometheus handles are `Arc` internally) so it can
/// be shared across request handlers.
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total accounts created via `/register`.
    pub accounts_created_total: IntCounter,
    /// Total accounts deleted via `DELETE /account/{id}`.
    pub accounts_deleted_total: IntCounter,
    /// Total successful logins.
    pub logins_total: IntCounter,
    /// Total rejected logins (unknown account or bad credential).
    pub login_failures_total: IntCounter,
    /// Total committed transfers.
    pub transfers_total: IntCounter,
    /// Total transfers rejected by the funds check.
    pub transfers_rejected_total: IntCounter,
    /// Histogram of transfer execution latency in seconds.
    pub transfer_duration_seconds: Histogram,
}

impl ServiceMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("meridian".into()), None)
            .expect("failed to create prometheus registry");

        let accounts_created_total = IntCounter::new(
            "accounts_created_total",
            "Total number of accounts created",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accounts_created_total.clone()))
            .expect("metric registration");

        let accounts_deleted_total = IntCounter::new(
            "accounts_deleted_total",
            "Total number of accounts deleted",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accounts_deleted_total.clone()))
            .expect("metric registration");

        let logins_total = IntCounter::new("logins_total", "Total number of successful logins")
            .expect("metric creation");
        registry
            .register(Box::new(logins_total.clone()))
            .expect("metric registration");

        let login_failures_total = IntCounter::new(
            "login_failures_total",
            "Total number of rejected login attempts",
        )
        .expect("metric creation");
        registry
            .register(Box::new(login_failures_total.clone()))
            .expect("metric registration");

        let transfers_total =
            IntCounter::new("transfers_total", "Total number of committed transfers")
                .expect("metric creation");
        registry
            .register(Box::new(transfers_total.clone()))
            .expect("metric registration");

        let transfers_rejected_total = IntCounter::new(
            "transfers_rejected_total",
            "Total number of transfers rejected by the funds check",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transfers_rejected_total.clone()))
            .expect("metric registration");

        let transfer_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "transfer_duration_seconds",
                "End-to-end transfer execution latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(transfer_duration_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            accounts_created_total,
            accounts_deleted_total,
            logins_total,
            login_failures_total,
            transfers_total,
            transfers_rejected_total,
            transfer_duration_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text
    /// exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServiceMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
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
