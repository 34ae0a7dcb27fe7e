//! Fault injection: turning fault declarations into per-slot metric
//! adjustments.
//!
//! Injection runs once, before propagation, so both passes observe the same
//! fault conditions. Each fault draws its occurrence once per covered slot
//! (after merging overlapping windows) and, when active, applies to all of
//! its targets in that slot.

use std::collections::BTreeMap;

use tracing::debug;

use meshsim_core::metrics::FAULTS_INJECTED;
use meshsim_core::{
    BaseMetrics, EndpointName, Fault, FaultAdjustedMetrics, FaultKind, ServiceName, TimePeriod,
    TimeSlot, TrafficAmount,
};

use crate::sampler::Sampler;

/// Pending endpoint-level adjustments for one slot.
///
/// Fields are overwritten, not summed, when several declarations target the
/// same endpoint in the same slot: the last declaration wins per field. The
/// surviving values are then applied onto the base metrics.
#[derive(Clone, Copy, Debug, Default)]
struct EndpointFault {
    latency_ms: Option<f64>,
    error_rate_percent: Option<f64>,
    traffic: Option<TrafficAmount>,
}

/// Pending service-level adjustments for one slot; same last-wins rule.
#[derive(Clone, Copy, Debug, Default)]
struct ServiceFault {
    reduce_replicas: Option<u32>,
}

/// Applies fault declarations onto base metrics, producing the snapshot
/// both propagation passes read.
///
/// Input is pre-validated upstream (probability sums, target resolution),
/// so injection has no error path; slots outside the simulated range are
/// ignored.
#[derive(Debug, Default)]
pub struct FaultInjector;

impl FaultInjector {
    /// Creates the injector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes the base snapshot and returns it with fault effects
    /// applied.
    #[must_use]
    pub fn inject<S: Sampler>(
        &self,
        faults: &[Fault],
        base: BaseMetrics,
        sampler: &mut S,
    ) -> FaultAdjustedMetrics {
        let mut by_slot = base.0;
        let mut endpoint_faults: BTreeMap<TimeSlot, BTreeMap<EndpointName, EndpointFault>> =
            BTreeMap::new();
        let mut service_faults: BTreeMap<TimeSlot, BTreeMap<ServiceName, ServiceFault>> =
            BTreeMap::new();

        for fault in faults {
            for (slot, probability) in merged_probability_by_slot(&fault.periods) {
                if !by_slot.contains_key(&slot) {
                    continue;
                }
                // one occurrence draw per fault per slot; all targets of the
                // fault share it
                if sampler.unit() > probability {
                    continue;
                }
                FAULTS_INJECTED.with_label_values(&[fault.kind.name()]).inc();
                debug!(
                    slot = %slot.slot_key(),
                    kind = fault.kind.name(),
                    "fault active in slot"
                );

                match fault.kind {
                    FaultKind::IncreaseLatency { ms } => {
                        for endpoint in &fault.endpoints {
                            pending_endpoint(&mut endpoint_faults, slot, endpoint).latency_ms =
                                Some(ms);
                        }
                    }
                    FaultKind::IncreaseErrorRate { percent } => {
                        for endpoint in &fault.endpoints {
                            pending_endpoint(&mut endpoint_faults, slot, endpoint)
                                .error_rate_percent = Some(percent);
                        }
                    }
                    FaultKind::InjectTraffic { amount } => {
                        for endpoint in &fault.endpoints {
                            pending_endpoint(&mut endpoint_faults, slot, endpoint).traffic =
                                Some(amount);
                        }
                    }
                    FaultKind::ReduceInstance { count } => {
                        for service in &fault.services {
                            service_faults
                                .entry(slot)
                                .or_default()
                                .entry(service.clone())
                                .or_default()
                                .reduce_replicas = Some(count);
                        }
                    }
                }
            }
        }

        for (slot, per_endpoint) in &endpoint_faults {
            let Some(metrics) = by_slot.get_mut(slot) else {
                continue;
            };
            for (endpoint, fault) in per_endpoint {
                if let Some(ms) = fault.latency_ms {
                    metrics.add_latency(endpoint, ms);
                }
                if let Some(percent) = fault.error_rate_percent {
                    metrics.add_error_rate(endpoint, percent / 100.0);
                }
                match fault.traffic {
                    Some(TrafficAmount::Extra(count)) => {
                        metrics.add_entry_requests(endpoint, count);
                    }
                    Some(TrafficAmount::Multiplier(factor)) => {
                        metrics.multiply_entry_requests(endpoint, factor);
                    }
                    None => {}
                }
            }
        }

        for (slot, per_service) in &service_faults {
            let Some(metrics) = by_slot.get_mut(slot) else {
                continue;
            };
            for (service, fault) in per_service {
                if let Some(count) = fault.reduce_replicas {
                    metrics.reduce_replicas(service, count);
                }
            }
        }

        FaultAdjustedMetrics(by_slot)
    }
}

fn pending_endpoint<'a>(
    faults: &'a mut BTreeMap<TimeSlot, BTreeMap<EndpointName, EndpointFault>>,
    slot: TimeSlot,
    endpoint: &EndpointName,
) -> &'a mut EndpointFault {
    faults
        .entry(slot)
        .or_default()
        .entry(endpoint.clone())
        .or_default()
}

/// Slots covered by the given periods with overlap-merged occurrence
/// probability.
///
/// Overlapping windows of one declaration merge under independence,
/// `1 - prod(1 - p_i)`, before the single occurrence draw, so overlap
/// raises the combined chance instead of being resampled per window.
fn merged_probability_by_slot(periods: &[TimePeriod]) -> BTreeMap<TimeSlot, f64> {
    let mut survival: BTreeMap<TimeSlot, f64> = BTreeMap::new();
    for period in periods {
        let p = (period.probability_percent / 100.0).clamp(0.0, 1.0);
        for slot in covered_slots(period) {
            *survival.entry(slot).or_insert(1.0) *= 1.0 - p;
        }
    }
    survival
        .into_iter()
        .map(|(slot, survival)| (slot, 1.0 - survival))
        .collect()
}

/// Hourly slots one period covers. Fault days are 1-based; a window may
/// wrap past midnight into the following day.
fn covered_slots(period: &TimePeriod) -> Vec<TimeSlot> {
    (0..period.duration_hours)
        .filter_map(|h| {
            let hour = (period.start_hour + h) % TimeSlot::HOURS_PER_DAY;
            let day_offset = (period.start_hour + h) / TimeSlot::HOURS_PER_DAY;
            let day = (period.day + day_offset).checked_sub(1)?;
            Some(TimeSlot::new(day, hour))
        })
        .collect()
}
