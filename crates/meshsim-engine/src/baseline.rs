//! Expansion of static configuration into per-slot working metrics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use meshsim_core::{
    BaseMetrics, DependencyGraph, EndpointMetric, EndpointName, MetricsBySlot, ReplicaCount,
    ServiceMetric, SimulationSettings, SlotMetrics, TimeSlot,
};

use crate::sampler::Sampler;

/// Relative spread of the random hourly weights (`1 ± 0.2`).
const HOURLY_WEIGHT_SPREAD: f64 = 0.2;

/// Builds the endpoint metric table: configured rows plus zeroed defaults
/// for every endpoint the dependency graph mentions without configuration,
/// so every defined endpoint has a row.
#[must_use]
pub fn endpoint_table(
    metrics: &[EndpointMetric],
    graph: &DependencyGraph,
) -> BTreeMap<EndpointName, EndpointMetric> {
    let mut table: BTreeMap<EndpointName, EndpointMetric> = metrics
        .iter()
        .map(|metric| (metric.endpoint.clone(), metric.clone()))
        .collect();
    for endpoint in graph.endpoints() {
        table
            .entry(endpoint.clone())
            .or_insert_with(|| EndpointMetric::zeroed(endpoint));
    }
    table
}

/// Expands static metrics into one [`SlotMetrics`] per simulated slot.
///
/// Each endpoint's daily request count is spread over the 24 hourly slots
/// of a day with random weights in `1 ± 0.2`; weighted shares are floored
/// and the remainder is handed to the highest-weight slots first, so every
/// day's slot total equals the configured daily count exactly.
#[must_use]
pub fn build_base_metrics<S: Sampler>(
    settings: &SimulationSettings,
    table: &BTreeMap<EndpointName, EndpointMetric>,
    service_metrics: &[ServiceMetric],
    replica_counts: &[ReplicaCount],
    sampler: &mut S,
) -> BaseMetrics {
    let days = settings.simulation_duration_in_days;
    let mut by_slot = MetricsBySlot::new();
    for slot in TimeSlot::iter_all(days) {
        by_slot.insert(slot, SlotMetrics::new());
    }

    // static rows are identical in every slot until faults touch them
    for slot_metrics in by_slot.values_mut() {
        for (endpoint, metric) in table {
            slot_metrics.set_delay(endpoint, metric.delay);
            slot_metrics.set_error_rate(endpoint, metric.error_rate_percent / 100.0);
        }
        for metric in service_metrics {
            slot_metrics.set_capacity_per_replica(&metric.service, metric.capacity_per_replica);
        }
        for count in replica_counts {
            slot_metrics.set_replicas(&count.service, count.replicas);
        }
    }

    for (endpoint, metric) in table {
        let daily = metric.expected_external_daily_request_count;
        if daily == 0 {
            continue;
        }
        for day in 0..days {
            let counts = distribute_daily(daily, sampler);
            for (hour, count) in counts.iter().enumerate() {
                if *count > 0 {
                    let slot = TimeSlot::new(day, hour as u32);
                    if let Some(slot_metrics) = by_slot.get_mut(&slot) {
                        slot_metrics.set_entry_request_count(endpoint, *count);
                    }
                }
            }
        }
    }

    BaseMetrics(by_slot)
}

/// Splits `daily` requests over 24 hourly buckets; the bucket total is
/// always exactly `daily`.
fn distribute_daily<S: Sampler>(daily: u64, sampler: &mut S) -> [u64; 24] {
    let mut weights = [0.0f64; 24];
    for weight in &mut weights {
        *weight = 1.0 - HOURLY_WEIGHT_SPREAD + sampler.unit() * 2.0 * HOURLY_WEIGHT_SPREAD;
    }
    let weight_sum: f64 = weights.iter().sum();

    let mut counts = [0u64; 24];
    for (count, weight) in counts.iter_mut().zip(&weights) {
        *count = (daily as f64 * weight / weight_sum).floor() as u64;
    }

    // flooring leaves a remainder below 24; heaviest slots absorb it first
    let assigned: u64 = counts.iter().sum();
    let leftover = daily.saturating_sub(assigned) as usize;
    let mut order: Vec<usize> = (0..24).collect();
    order.sort_by(|&a, &b| weights[b].partial_cmp(&weights[a]).unwrap_or(Ordering::Equal));
    for &hour in order.iter().cycle().take(leftover) {
        counts[hour] += 1;
    }

    counts
}
