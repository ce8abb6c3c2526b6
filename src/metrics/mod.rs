//! Metrics module
//!
//! Prometheus counters for authorization decisions.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    pub static ref DECISIONS_TOTAL: CounterVec = register_counter_vec!(
        "komainu_decisions_total",
        "Authorization decisions",
        &["action", "decision"]  // "allow", "deny" or "skip"
    ).unwrap();

    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "komainu_errors_total",
        "Authorization errors other than denials",
        &["type"]
    ).unwrap();

    pub static ref POLICY_DURATION: HistogramVec = register_histogram_vec!(
        "komainu_policy_duration_seconds",
        "Policy evaluation duration in seconds",
        &["resource_type"],
        vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();
}

/// Record an allow or deny decision
pub fn record_decision(action: &str, allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    DECISIONS_TOTAL.with_label_values(&[action, decision]).inc();
}

/// Record an explicit skip
pub fn record_skip(action: &str) {
    DECISIONS_TOTAL.with_label_values(&[action, "skip"]).inc();
}

/// Record an error by kind
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Record how long a policy took to decide
pub fn record_policy_duration(resource_type: &str, duration_secs: f64) {
    POLICY_DURATION
        .with_label_values(&[resource_type])
        .observe(duration_secs);
}
