//! Overload-aware error-rate adjustment between the two propagation passes.
//!
//! The first pass estimates how many requests each service absorbs per
//! slot. When that load exceeds the service's capacity, every endpoint of
//! the service gets its error rate raised along an exponential saturation
//! curve before the final pass.

use std::collections::BTreeMap;

use tracing::debug;

use meshsim_core::{
    EndpointName, FaultAdjustedMetrics, OverloadAdjustedMetrics, ServiceName,
};

use crate::propagation::{PropagationBySlot, PropagationStats};

/// Seconds per hourly slot.
const SLOT_SECONDS: f64 = 3600.0;

/// Rewrites per-endpoint error rates using the load estimated by the first
/// propagation pass.
#[derive(Debug, Default)]
pub struct OverloadEstimator;

impl OverloadEstimator {
    /// Creates the estimator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Applies the overload model to every endpoint of every slot,
    /// consuming the fault-adjusted snapshot.
    ///
    /// `factor` is the steepness of the saturation curve
    /// (`overload_error_rate_increase_factor`).
    #[must_use]
    pub fn adjust(
        &self,
        factor: f64,
        pass_one: &PropagationBySlot,
        metrics: FaultAdjustedMetrics,
    ) -> OverloadAdjustedMetrics {
        let mut by_slot = metrics.0;

        for (slot, slot_metrics) in &mut by_slot {
            let service_requests = service_request_counts(pass_one.get(slot));
            let endpoints: Vec<EndpointName> = slot_metrics.endpoints().cloned().collect();
            for endpoint in endpoints {
                let service = endpoint.service_name();
                let requests = service_requests.get(&service).copied().unwrap_or(0);
                let base = slot_metrics.error_rate(&endpoint);
                let adjusted = adjusted_error_rate(
                    base,
                    requests,
                    slot_metrics.replicas(&service),
                    slot_metrics.capacity_per_replica(&service),
                    factor,
                );
                if adjusted != base {
                    debug!(
                        slot = %slot.slot_key(),
                        endpoint = %endpoint,
                        base,
                        adjusted,
                        "error rate raised by overload"
                    );
                    slot_metrics.set_error_rate(&endpoint, adjusted);
                }
            }
        }

        OverloadAdjustedMetrics(by_slot)
    }
}

/// Sums first-pass request counts per owning service.
fn service_request_counts(
    stats: Option<&BTreeMap<EndpointName, PropagationStats>>,
) -> BTreeMap<ServiceName, u64> {
    let mut counts = BTreeMap::new();
    if let Some(stats) = stats {
        for (endpoint, stat) in stats {
            *counts.entry(endpoint.service_name()).or_insert(0) += stat.request_count;
        }
    }
    counts
}

/// The overload model: unchanged below full utilization, exponential
/// saturation above it, certain failure with no capacity.
///
/// The `(1 - base)` headroom factor makes overload convert only
/// originally-successful requests into failures, never double-counting the
/// base rate.
fn adjusted_error_rate(
    base: f64,
    service_requests: u64,
    replicas: u32,
    capacity_per_replica: f64,
    factor: f64,
) -> f64 {
    let capacity = f64::from(replicas) * capacity_per_replica;
    if capacity <= 0.0 {
        return 1.0;
    }

    let rps = service_requests as f64 / SLOT_SECONDS;
    let utilization = rps / capacity;
    if utilization <= 1.0 {
        return base;
    }

    let additional = 1.0 - (-factor * (utilization - 1.0)).exp();
    (base + (1.0 - base) * additional).min(1.0)
}
