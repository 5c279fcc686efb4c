//! Prometheus Metrics Module
//!
//! Provides hub-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active chat connections gauge
//! - Inbound frames by wire type
//! - Rejected inbound frames by reason
//! - Broadcast fan-outs by scope
//! - Connection evictions by reason

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active chat connections gauge
pub static CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("connections_active", "Number of registered chat connections")
            .namespace("social_hub"),
    )
    .expect("Failed to create CONNECTIONS_ACTIVE metric")
});

/// Inbound frames by type
pub static FRAMES_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("frames_received_total", "Inbound chat frames by type").namespace("social_hub"),
        &["type"],
    )
    .expect("Failed to create FRAMES_RECEIVED_TOTAL metric")
});

/// Inbound frames dropped without effect
pub static FRAMES_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("frames_rejected_total", "Inbound chat frames dropped by reason")
            .namespace("social_hub"),
        &["reason"],
    )
    .expect("Failed to create FRAMES_REJECTED_TOTAL metric")
});

/// Broadcast fan-outs
pub static BROADCASTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadcasts_total", "Broadcast fan-outs by scope").namespace("social_hub"),
        &["scope"], // "all", "room"
    )
    .expect("Failed to create BROADCASTS_TOTAL metric")
});

/// Connections removed by the hub rather than by their own reader
pub static EVICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("evictions_total", "Connections evicted by the hub").namespace("social_hub"),
        &["reason"], // "slow_consumer", "superseded"
    )
    .expect("Failed to create EVICTIONS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(FRAMES_RECEIVED_TOTAL.clone()))
        .expect("Failed to register FRAMES_RECEIVED_TOTAL");
    registry
        .register(Box::new(FRAMES_REJECTED_TOTAL.clone()))
        .expect("Failed to register FRAMES_REJECTED_TOTAL");
    registry
        .register(Box::new(BROADCASTS_TOTAL.clone()))
        .expect("Failed to register BROADCASTS_TOTAL");
    registry
        .register(Box::new(EVICTIONS_TOTAL.clone()))
        .expect("Failed to register EVICTIONS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn set_active_connections(count: usize) {
    CONNECTIONS_ACTIVE.set(count as i64);
}

pub fn record_frame_received(kind: &str) {
    FRAMES_RECEIVED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_frame_rejected(reason: &str) {
    FRAMES_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_broadcast(scope: &str) {
    BROADCASTS_TOTAL.with_label_values(&[scope]).inc();
}

pub fn record_eviction(reason: &str) {
    EVICTIONS_TOTAL.with_label_values(&[reason]).inc();
}
