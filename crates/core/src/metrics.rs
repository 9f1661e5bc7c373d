//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Guarded conversions (outcomes, durations)
//! - Primary and fallback engine attempts
//! - Circuit breaker state and transitions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};

use crate::resilience::CircuitState;

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Guarded conversions by final outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfconvert_conversions_total", "Total guarded conversions"),
        &["pair", "outcome"], // "success", "engine_failure", "timed_out", "circuit_open"
    )
    .unwrap()
});

/// Guarded conversion duration in seconds, fallback included.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pdfconvert_conversion_duration_seconds",
            "Duration of guarded conversions",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["pair", "outcome"],
    )
    .unwrap()
});

/// Primary attempts by result.
pub static PRIMARY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfconvert_primary_attempts_total",
            "Primary engine attempts",
        ),
        &["pair", "result"],
    )
    .unwrap()
});

/// Fallback attempts by result.
pub static FALLBACK_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfconvert_fallback_attempts_total",
            "Fallback engine attempts with reduced options",
        ),
        &["pair", "result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Circuit Breaker Metrics
// =============================================================================

/// Current breaker state (0 = closed, 1 = open, 2 = half-open).
pub static CIRCUIT_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "pdfconvert_circuit_state",
            "Circuit breaker state (0 closed, 1 open, 2 half-open)",
        ),
        &["pair"],
    )
    .unwrap()
});

/// Breaker state transitions.
pub static CIRCUIT_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfconvert_circuit_transitions_total",
            "Circuit breaker state transitions",
        ),
        &["pair", "from_state", "to_state"],
    )
    .unwrap()
});

pub fn circuit_state_value(state: CircuitState) -> i64 {
    match state {
        CircuitState::Closed => 0,
        CircuitState::Open => 1,
        CircuitState::HalfOpen => 2,
    }
}

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(PRIMARY_ATTEMPTS.clone()),
        Box::new(FALLBACK_ATTEMPTS.clone()),
        Box::new(CIRCUIT_STATE.clone()),
        Box::new(CIRCUIT_TRANSITIONS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_state_values() {
        assert_eq!(circuit_state_value(CircuitState::Closed), 0);
        assert_eq!(circuit_state_value(CircuitState::Open), 1);
        assert_eq!(circuit_state_value(CircuitState::HalfOpen), 2);
    }

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
