//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `cnauth_reconciliations_total{kind, outcome}` - Completed reconciliations
//! - `cnauth_reconciliation_errors_total{kind, reason}` - Failed reconciliations
//! - `cnauth_reconciliation_duration_seconds{kind}` - Duration of reconcile invocations
//! - `cnauth_requeues_total{kind, reason}` - Requeues scheduled by the error policy
//! - `cnauth_keys_materialized_total` - JWTKey statuses written
//! - `cnauth_tokens_issued_total` - User tokens written
//! - `cnauth_deployments_created_total` - Workload Deployments created

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cnauth_reconciliations_total",
            "Total number of completed reconciliations by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cnauth_reconciliation_errors_total",
            "Total number of reconciliation errors by kind and reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "cnauth_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by kind",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cnauth_requeues_total",
            "Total number of requeues scheduled by kind and reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static KEYS_MATERIALIZED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cnauth_keys_materialized_total",
        "Total number of JWTKey status updates",
    )
    .expect("Failed to create KEYS_MATERIALIZED_TOTAL metric - this should never happen")
});

static TOKENS_ISSUED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cnauth_tokens_issued_total",
        "Total number of user tokens written to status",
    )
    .expect("Failed to create TOKENS_ISSUED_TOTAL metric - this should never happen")
});

static DEPLOYMENTS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cnauth_deployments_created_total",
        "Total number of workload Deployments created",
    )
    .expect("Failed to create DEPLOYMENTS_CREATED_TOTAL metric - this should never happen")
});

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<()> {
    register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_DURATION.clone()))?;
    register(Box::new(REQUEUES_TOTAL.clone()))?;
    register(Box::new(KEYS_MATERIALIZED_TOTAL.clone()))?;
    register(Box::new(TOKENS_ISSUED_TOTAL.clone()))?;
    register(Box::new(DEPLOYMENTS_CREATED_TOTAL.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn record_reconciliation(kind: &str, outcome: &str, duration: f64) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_reconciliation_errors(kind: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn increment_requeues_total(kind: &str, reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind, reason]).inc();
}

pub fn increment_keys_materialized() {
    KEYS_MATERIALIZED_TOTAL.inc();
}

pub fn increment_tokens_issued() {
    TOKENS_ISSUED_TOTAL.inc();
}

pub fn increment_deployments_created() {
    DEPLOYMENTS_CREATED_TOTAL.inc();
}
