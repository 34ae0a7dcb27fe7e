use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{EndpointName, ServiceName};
use crate::metric::Delay;
use crate::time::TimeSlot;

/// Mutable working metrics for one time slot.
///
/// Values start from the static configuration and are adjusted by fault
/// injection and overload estimation before each propagation pass reads
/// them. Getters return zeroed defaults for unknown keys; mutators clamp to
/// the documented value ranges.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SlotMetrics {
    entry_request_count: BTreeMap<EndpointName, u64>,
    endpoint_delay: BTreeMap<EndpointName, Delay>,
    endpoint_error_rate: BTreeMap<EndpointName, f64>,
    service_replicas: BTreeMap<ServiceName, u32>,
    service_capacity_per_replica: BTreeMap<ServiceName, f64>,
}

impl SlotMetrics {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests arriving at `endpoint` from outside the modeled system.
    #[must_use]
    pub fn entry_request_count(&self, endpoint: &EndpointName) -> u64 {
        self.entry_request_count.get(endpoint).copied().unwrap_or(0)
    }

    /// Base service time of `endpoint`.
    #[must_use]
    pub fn delay(&self, endpoint: &EndpointName) -> Delay {
        self.endpoint_delay
            .get(endpoint)
            .copied()
            .unwrap_or(Delay::ZERO)
    }

    /// Own error rate of `endpoint` as a fraction in `[0, 1]`.
    #[must_use]
    pub fn error_rate(&self, endpoint: &EndpointName) -> f64 {
        self.endpoint_error_rate
            .get(endpoint)
            .copied()
            .unwrap_or(0.0)
    }

    /// Replica count of `service` in this slot.
    #[must_use]
    pub fn replicas(&self, service: &ServiceName) -> u32 {
        self.service_replicas.get(service).copied().unwrap_or(0)
    }

    /// Per-replica capacity of `service` in requests per second.
    #[must_use]
    pub fn capacity_per_replica(&self, service: &ServiceName) -> f64 {
        self.service_capacity_per_replica
            .get(service)
            .copied()
            .unwrap_or(0.0)
    }

    /// Entry-point endpoints with their request counts.
    pub fn entry_points(&self) -> impl Iterator<Item = (&EndpointName, u64)> {
        self.entry_request_count.iter().map(|(e, c)| (e, *c))
    }

    /// Every endpoint holding a metric row in this slot.
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointName> {
        self.endpoint_error_rate.keys()
    }

    /// Sets the entry-point request count of `endpoint`.
    pub fn set_entry_request_count(&mut self, endpoint: &EndpointName, count: u64) {
        self.entry_request_count.insert(endpoint.clone(), count);
    }

    /// Sets the base service time of `endpoint`.
    pub fn set_delay(&mut self, endpoint: &EndpointName, delay: Delay) {
        self.endpoint_delay.insert(endpoint.clone(), delay);
    }

    /// Sets the error rate of `endpoint`, clamped to `[0, 1]`.
    pub fn set_error_rate(&mut self, endpoint: &EndpointName, rate: f64) {
        self.endpoint_error_rate
            .insert(endpoint.clone(), rate.clamp(0.0, 1.0));
    }

    /// Sets the replica count of `service`.
    pub fn set_replicas(&mut self, service: &ServiceName, replicas: u32) {
        self.service_replicas.insert(service.clone(), replicas);
    }

    /// Sets the per-replica capacity of `service`.
    pub fn set_capacity_per_replica(&mut self, service: &ServiceName, capacity: f64) {
        self.service_capacity_per_replica
            .insert(service.clone(), capacity);
    }

    /// Adds latency to `endpoint`'s base service time, floored at zero.
    pub fn add_latency(&mut self, endpoint: &EndpointName, ms: f64) {
        let delay = self.endpoint_delay.entry(endpoint.clone()).or_default();
        delay.latency_ms = (delay.latency_ms + ms).max(0.0);
    }

    /// Adds an error-rate fraction to `endpoint`, clamped to `[0, 1]`.
    pub fn add_error_rate(&mut self, endpoint: &EndpointName, fraction: f64) {
        let rate = self
            .endpoint_error_rate
            .entry(endpoint.clone())
            .or_insert(0.0);
        *rate = (*rate + fraction).clamp(0.0, 1.0);
    }

    /// Adds entry-point requests to `endpoint`.
    pub fn add_entry_requests(&mut self, endpoint: &EndpointName, count: u64) {
        *self
            .entry_request_count
            .entry(endpoint.clone())
            .or_insert(0) += count;
    }

    /// Multiplies `endpoint`'s entry-point request count by `factor`,
    /// rounding to the nearest whole request.
    pub fn multiply_entry_requests(&mut self, endpoint: &EndpointName, factor: f64) {
        if let Some(count) = self.entry_request_count.get_mut(endpoint) {
            *count = (*count as f64 * factor).round().max(0.0) as u64;
        }
    }

    /// Removes replicas from `service`, floored at zero.
    pub fn reduce_replicas(&mut self, service: &ServiceName, count: u32) {
        let replicas = self.service_replicas.entry(service.clone()).or_insert(0);
        *replicas = replicas.saturating_sub(count);
    }
}

/// Working metrics for every slot of a simulation, keyed chronologically.
pub type MetricsBySlot = BTreeMap<TimeSlot, SlotMetrics>;

/// Snapshot produced by the base-metrics builder, before fault injection.
#[derive(Clone, Debug, Default)]
pub struct BaseMetrics(pub MetricsBySlot);

impl BaseMetrics {
    /// Read access to the per-slot metrics.
    #[must_use]
    pub fn slots(&self) -> &MetricsBySlot {
        &self.0
    }
}

/// Snapshot with fault effects applied. Faults are injected before
/// propagation so both passes see identical fault conditions.
#[derive(Clone, Debug, Default)]
pub struct FaultAdjustedMetrics(pub MetricsBySlot);

impl FaultAdjustedMetrics {
    /// Read access to the per-slot metrics.
    #[must_use]
    pub fn slots(&self) -> &MetricsBySlot {
        &self.0
    }
}

/// Snapshot with overload-adjusted error rates, read by the final pass.
#[derive(Clone, Debug, Default)]
pub struct OverloadAdjustedMetrics(pub MetricsBySlot);

impl OverloadAdjustedMetrics {
    /// Read access to the per-slot metrics.
    #[must_use]
    pub fn slots(&self) -> &MetricsBySlot {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str) -> EndpointName {
        EndpointName::from(name)
    }

    fn service(name: &str) -> ServiceName {
        ServiceName::from(name)
    }

    #[test]
    fn test_getters_default_to_zero() {
        let metrics = SlotMetrics::new();
        assert_eq!(metrics.entry_request_count(&endpoint("a")), 0);
        assert_eq!(metrics.delay(&endpoint("a")), Delay::ZERO);
        assert_eq!(metrics.error_rate(&endpoint("a")), 0.0);
        assert_eq!(metrics.replicas(&service("s")), 0);
        assert_eq!(metrics.capacity_per_replica(&service("s")), 0.0);
    }

    #[test]
    fn test_error_rate_is_clamped() {
        let mut metrics = SlotMetrics::new();
        metrics.set_error_rate(&endpoint("a"), 0.9);
        metrics.add_error_rate(&endpoint("a"), 0.5);
        assert_eq!(metrics.error_rate(&endpoint("a")), 1.0);
        metrics.set_error_rate(&endpoint("a"), -0.5);
        assert_eq!(metrics.error_rate(&endpoint("a")), 0.0);
    }

    #[test]
    fn test_latency_floored_at_zero() {
        let mut metrics = SlotMetrics::new();
        metrics.set_delay(&endpoint("a"), Delay::new(10.0, 2.0));
        metrics.add_latency(&endpoint("a"), -25.0);
        assert_eq!(metrics.delay(&endpoint("a")).latency_ms, 0.0);
        assert_eq!(metrics.delay(&endpoint("a")).jitter_ms, 2.0);
    }

    #[test]
    fn test_replica_reduction_saturates() {
        let mut metrics = SlotMetrics::new();
        metrics.set_replicas(&service("s"), 2);
        metrics.reduce_replicas(&service("s"), 5);
        assert_eq!(metrics.replicas(&service("s")), 0);
    }

    #[test]
    fn test_traffic_mutators() {
        let mut metrics = SlotMetrics::new();
        metrics.add_entry_requests(&endpoint("a"), 10);
        metrics.add_entry_requests(&endpoint("a"), 5);
        assert_eq!(metrics.entry_request_count(&endpoint("a")), 15);

        metrics.multiply_entry_requests(&endpoint("a"), 2.5);
        assert_eq!(metrics.entry_request_count(&endpoint("a")), 38);

        // multiplying an absent endpoint leaves it absent
        metrics.multiply_entry_requests(&endpoint("b"), 3.0);
        assert_eq!(metrics.entry_request_count(&endpoint("b")), 0);
    }
}
