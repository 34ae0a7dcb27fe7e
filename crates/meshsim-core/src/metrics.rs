//! Central metrics registry and metric definitions
//!
//! This module provides Prometheus metrics for the simulation engine.
//! Metrics are registered lazily on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Total number of simulation runs executed.
pub static SIMULATION_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "meshsim_simulation_runs_total",
        "Total number of simulation runs executed"
    )
    .expect("Failed to register simulation run counter")
});

/// Wall-clock duration of simulation runs.
pub static SIMULATION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "meshsim_simulation_duration_seconds",
        "Wall-clock duration of simulation runs in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register simulation duration histogram")
});

/// Combined-realtime-data records emitted, by status bucket.
pub static RECORDS_EMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "meshsim_records_emitted_total",
        "Total number of combined realtime data records emitted",
        &["status"]
    )
    .expect("Failed to register emitted record counter")
});

/// Fault occurrences applied to time slots, by fault kind.
pub static FAULTS_INJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "meshsim_faults_injected_total",
        "Total number of fault occurrences applied to time slots",
        &["kind"]
    )
    .expect("Failed to register injected fault counter")
});

/// Records skipped on defensive paths, by reason.
pub static RECORDS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "meshsim_records_skipped_total",
        "Total number of records skipped on defensive paths",
        &["reason"]
    )
    .expect("Failed to register skipped record counter")
});
