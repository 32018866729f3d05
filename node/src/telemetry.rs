// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_LOG_FILTER: &str = "platform_node=debug,platform_kernel=info";

/// Initialize telemetry (logs + metrics). Safe to call more than once.
pub fn init_telemetry() {
    // 1. Tracing
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    // 2. Prometheus recorder
    if PROM_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::warn!("failed to install Prometheus recorder: {}", e);
            return;
        }
    }

    metrics::describe_counter!("platform_transitions_applied_total", "State transitions accepted by the platform");
    metrics::describe_counter!("platform_transitions_rejected_total", "State transitions rejected by validation");
    metrics::describe_counter!("platform_reconcile_attempts", "Polls issued while reconciling remote state");
    metrics::describe_counter!("platform_proofs_built_total", "Asset lock proofs built from confirmed transactions");

    metrics::gauge!("platform_node_up", 1.0);
}

/// Prometheus text exposition of every recorded metric.
pub fn render_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
