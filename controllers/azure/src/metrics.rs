//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `azure_provider_reconciliations_total{kind}` - Reconciliations started
//! - `azure_provider_reconciliation_errors_total{kind}` - Reconciliations that failed
//! - `azure_provider_reconciliation_duration_seconds{kind}` - Reconciliation duration
//! - `azure_provider_azure_requests_total{method}` - Requests sent to Azure

use anyhow::Result;
use azure_client::metrics::AZURE_REQUESTS_TOTAL;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;
use std::time::Instant;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "azure_provider_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "azure_provider_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "azure_provider_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

/// Register all metrics with the registry served at `/metrics`
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(AZURE_REQUESTS_TOTAL.clone()))?;
    Ok(())
}

/// Times one reconciliation of a kind; the duration is recorded on drop
#[derive(Debug)]
pub struct ReconcileTimer {
    kind: String,
    started: Instant,
}

impl ReconcileTimer {
    /// Count a reconciliation of `kind` and start timing it
    pub fn start(kind: &str) -> Self {
        RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
        Self {
            kind: kind.to_string(),
            started: Instant::now(),
        }
    }

    /// Count the reconciliation as failed
    pub fn failed(&self) {
        RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&[self.kind.as_str()])
            .inc();
    }
}

impl Drop for ReconcileTimer {
    fn drop(&mut self) {
        RECONCILIATION_DURATION
            .with_label_values(&[self.kind.as_str()])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_reconciles_and_errors() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["TestKind"]).get();
        let errors_before = RECONCILIATION_ERRORS_TOTAL.with_label_values(&["TestKind"]).get();
        {
            let timer = ReconcileTimer::start("TestKind");
            timer.failed();
        }
        assert_eq!(RECONCILIATIONS_TOTAL.with_label_values(&["TestKind"]).get(), before + 1);
        assert_eq!(
            RECONCILIATION_ERRORS_TOTAL.with_label_values(&["TestKind"]).get(),
            errors_before + 1
        );
        assert!(
            RECONCILIATION_DURATION
                .with_label_values(&["TestKind"])
                .get_sample_count()
                >= 1
        );
    }
}
