//! Request counter for Azure API calls
//!
//! Registered into the controller's Prometheus registry at startup.

use prometheus::{IntCounterVec, Opts};
use std::sync::LazyLock;

/// Azure API requests by HTTP method
pub static AZURE_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "azure_provider_azure_requests_total",
            "Total number of requests sent to Azure",
        ),
        &["method"],
    )
    .expect("Failed to create AZURE_REQUESTS_TOTAL metric - this should never happen")
});

pub(crate) fn record_request(method: &str) {
    AZURE_REQUESTS_TOTAL.with_label_values(&[method]).inc();
}
