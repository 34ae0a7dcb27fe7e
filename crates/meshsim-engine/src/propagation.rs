//! Two-pass traffic propagation through the dependency graph.
//!
//! Each time slot is simulated independently: entry-point requests are
//! synthesized and walked depth-first through the oneof call groups of the
//! dependency graph. Per-slot DFS state carries the revisit guard and the
//! per-endpoint outcome cache; slots share nothing mutable, so they run on
//! the rayon thread pool.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use tracing::trace;

use meshsim_core::{
    CallGroup, DependencyGraph, EndpointMetric, EndpointName, LatencyStats, MetricsBySlot,
    SlotMetrics, TimeSlot,
};

use crate::sampler::Sampler;
use crate::stats::WelfordAccumulator;

/// Identifier of one synthetic request, unique within a slot: the entry
/// endpoint's name with a sequence suffix. Shared identity across the DFS
/// is what deduplicates diamond dependencies.
pub type RequestId = String;

/// Latency statistics split by final status bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusLatency {
    /// Statistics of requests that ended successful (`"200"`).
    pub success: Option<LatencyStats>,
    /// Statistics of requests that ended failed (`"500"`).
    pub failure: Option<LatencyStats>,
}

/// Per-endpoint outcome of one simulated slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropagationStats {
    /// Requests that reached the endpoint.
    pub request_count: u64,
    /// Requests the endpoint failed by its own error draw.
    pub own_error_count: u64,
    /// Requests the endpoint served itself but reported failed because of a
    /// dependency, per its fallback policy.
    pub downstream_error_count: u64,
    /// Latency statistics per status bucket; zeroed in the load-estimation
    /// pass.
    pub latency: StatusLatency,
}

/// Propagation results for every slot.
pub type PropagationBySlot = BTreeMap<TimeSlot, BTreeMap<EndpointName, PropagationStats>>;

/// Result of one request's visit to one endpoint, as observed by the
/// caller.
#[derive(Clone, Copy, Debug)]
struct RequestOutcome {
    success: bool,
    latency_ms: f64,
}

/// Running counters for one endpoint within one slot.
#[derive(Clone, Debug, Default)]
struct EndpointAccumulator {
    request_count: u64,
    own_error_count: u64,
    downstream_error_count: u64,
    success_latency: WelfordAccumulator,
    failure_latency: WelfordAccumulator,
}

/// DFS-based traffic propagator. Stateless; all per-run state lives in the
/// per-slot traversal.
#[derive(Debug, Default)]
pub struct Propagator;

impl Propagator {
    /// Creates the propagator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Simulates every slot of `metrics`. Slots are independent and run in
    /// parallel; `sampler_for` builds one sampler per slot.
    ///
    /// With `compute_latency` unset (the load-estimation pass) latency
    /// statistics are zeroed and only the counters are meaningful.
    pub fn simulate<S, F>(
        &self,
        graph: &DependencyGraph,
        endpoint_table: &BTreeMap<EndpointName, EndpointMetric>,
        metrics: &MetricsBySlot,
        compute_latency: bool,
        sampler_for: F,
    ) -> PropagationBySlot
    where
        S: Sampler,
        F: Fn(TimeSlot) -> S + Sync,
    {
        metrics
            .par_iter()
            .map(|(slot, slot_metrics)| {
                let mut sampler = sampler_for(*slot);
                let stats = SlotPropagation::new(graph, endpoint_table, slot_metrics, &mut sampler)
                    .run(compute_latency);
                (*slot, stats)
            })
            .collect()
    }
}

/// Mutable state of one slot's depth-first propagation.
struct SlotPropagation<'a, S: Sampler> {
    graph: &'a DependencyGraph,
    endpoint_table: &'a BTreeMap<EndpointName, EndpointMetric>,
    metrics: &'a SlotMetrics,
    sampler: &'a mut S,
    /// (endpoint, request) pairs already walked. Guards against graph
    /// cycles and double counting when a diamond dependency reaches the
    /// same endpoint through several paths.
    visited: HashSet<(EndpointName, RequestId)>,
    /// Outcomes already computed per endpoint, replayed on revisits.
    outcome_cache: BTreeMap<EndpointName, BTreeMap<RequestId, RequestOutcome>>,
    accumulators: BTreeMap<EndpointName, EndpointAccumulator>,
}

impl<'a, S: Sampler> SlotPropagation<'a, S> {
    fn new(
        graph: &'a DependencyGraph,
        endpoint_table: &'a BTreeMap<EndpointName, EndpointMetric>,
        metrics: &'a SlotMetrics,
        sampler: &'a mut S,
    ) -> Self {
        Self {
            graph,
            endpoint_table,
            metrics,
            sampler,
            visited: HashSet::new(),
            outcome_cache: BTreeMap::new(),
            accumulators: BTreeMap::new(),
        }
    }

    fn run(mut self, compute_latency: bool) -> BTreeMap<EndpointName, PropagationStats> {
        let entry_points: Vec<(EndpointName, u64)> = self
            .metrics
            .entry_points()
            .filter(|(_, count)| *count > 0)
            .map(|(endpoint, count)| (endpoint.clone(), count))
            .collect();

        for (endpoint, count) in entry_points {
            let requests: Vec<RequestId> =
                (0..count).map(|seq| format!("{endpoint}-{seq}")).collect();
            self.visit(&endpoint, &requests);
        }

        self.finalize(compute_latency)
    }

    /// Walks `requests` into `endpoint` and returns each request's outcome
    /// as the caller observes it. Requests the endpoint has already seen
    /// replay their cached outcome instead of being recomputed.
    fn visit(
        &mut self,
        endpoint: &EndpointName,
        requests: &[RequestId],
    ) -> BTreeMap<RequestId, RequestOutcome> {
        let mut fresh = Vec::new();
        for request in requests {
            if self
                .visited
                .insert((endpoint.clone(), request.clone()))
            {
                fresh.push(request.clone());
            }
        }

        if !fresh.is_empty() {
            let outcomes = self.execute(endpoint, &fresh);
            self.outcome_cache
                .entry(endpoint.clone())
                .or_default()
                .extend(outcomes);
        }

        let cache = self.outcome_cache.get(endpoint);
        requests
            .iter()
            .filter_map(|request| {
                cache
                    .and_then(|outcomes| outcomes.get(request))
                    .map(|outcome| (request.clone(), *outcome))
            })
            .collect()
    }

    /// Computes outcomes for requests reaching `endpoint` for the first
    /// time, recursing into selected dependencies.
    fn execute(
        &mut self,
        endpoint: &EndpointName,
        requests: &[RequestId],
    ) -> BTreeMap<RequestId, RequestOutcome> {
        // an absent instance fails every request from the caller's view,
        // with no latency, no own-error accounting, and no downstream
        // traffic
        let service = endpoint.service_name();
        if self.metrics.replicas(&service) == 0 {
            trace!(endpoint = %endpoint, "no replicas, failing upstream");
            return requests
                .iter()
                .map(|request| {
                    (
                        request.clone(),
                        RequestOutcome {
                            success: false,
                            latency_ms: 0.0,
                        },
                    )
                })
                .collect();
        }

        let fallback = self
            .endpoint_table
            .get(endpoint)
            .map(|metric| metric.fallback)
            .unwrap_or_default();
        let delay = self.metrics.delay(endpoint);
        let error_rate = self.metrics.error_rate(endpoint);

        // own outcome and latency per request; latency is incurred whether
        // or not the request succeeds locally
        let own: Vec<(bool, f64)> = requests
            .iter()
            .map(|_| {
                let success = !(self.sampler.unit() < error_rate);
                let latency_ms = self.sampler.jittered(delay.latency_ms, delay.jitter_ms);
                (success, latency_ms)
            })
            .collect();

        // per group, each request selects at most one target; the residual
        // probability mass selects "no call"
        let groups = self.graph.groups(endpoint);
        let selections: Vec<Vec<Option<EndpointName>>> = groups
            .iter()
            .map(|group| {
                requests
                    .iter()
                    .map(|_| select_target(group, self.sampler))
                    .collect()
            })
            .collect();

        // distinct targets picked by locally successful requests, with the
        // requests that picked them
        let mut dependent_requests: BTreeMap<EndpointName, Vec<RequestId>> = BTreeMap::new();
        for per_request in &selections {
            for (index, selected) in per_request.iter().enumerate() {
                if let Some(target) = selected {
                    if own[index].0 {
                        dependent_requests
                            .entry(target.clone())
                            .or_default()
                            .push(requests[index].clone());
                    }
                }
            }
        }

        let mut dependent_outcomes: BTreeMap<EndpointName, BTreeMap<RequestId, RequestOutcome>> =
            BTreeMap::new();
        for (target, selected_requests) in &dependent_requests {
            let outcomes = self.visit(target, selected_requests);
            dependent_outcomes.insert(target.clone(), outcomes);
        }

        // fold own and dependent outcomes per request
        let mut results = BTreeMap::new();
        for (index, request) in requests.iter().enumerate() {
            let (own_success, own_latency_ms) = own[index];
            let mut dependent_flags = Vec::with_capacity(selections.len());
            let mut dependent_latency_max = 0.0f64;
            if own_success {
                for per_request in &selections {
                    match &per_request[index] {
                        Some(target) => {
                            let outcome = dependent_outcomes
                                .get(target)
                                .and_then(|outcomes| outcomes.get(request))
                                .copied()
                                .unwrap_or(RequestOutcome {
                                    success: false,
                                    latency_ms: 0.0,
                                });
                            dependent_flags.push(outcome.success);
                            dependent_latency_max = dependent_latency_max.max(outcome.latency_ms);
                        }
                        // no call: counts as success, costs nothing
                        None => dependent_flags.push(true),
                    }
                }
            }

            let success = fallback.resolve(own_success, &dependent_flags);
            // a request that fails locally never pays for downstream work it
            // never issued
            let latency_ms = if own_success {
                own_latency_ms + dependent_latency_max
            } else {
                own_latency_ms
            };

            let accumulator = self.accumulators.entry(endpoint.clone()).or_default();
            accumulator.request_count += 1;
            if !own_success {
                accumulator.own_error_count += 1;
            } else if !success {
                accumulator.downstream_error_count += 1;
            }
            if success {
                accumulator.success_latency.record(latency_ms);
            } else {
                accumulator.failure_latency.record(latency_ms);
            }

            results.insert(
                request.clone(),
                RequestOutcome {
                    success,
                    latency_ms,
                },
            );
        }

        results
    }

    fn finalize(self, compute_latency: bool) -> BTreeMap<EndpointName, PropagationStats> {
        self.accumulators
            .into_iter()
            .map(|(endpoint, accumulator)| {
                let latency = if compute_latency {
                    StatusLatency {
                        success: (accumulator.success_latency.count() > 0)
                            .then(|| accumulator.success_latency.stats()),
                        failure: (accumulator.failure_latency.count() > 0)
                            .then(|| accumulator.failure_latency.stats()),
                    }
                } else {
                    StatusLatency::default()
                };
                (
                    endpoint,
                    PropagationStats {
                        request_count: accumulator.request_count,
                        own_error_count: accumulator.own_error_count,
                        downstream_error_count: accumulator.downstream_error_count,
                        latency,
                    },
                )
            })
            .collect()
    }
}

/// Selects one target from a oneof group by cumulative-probability
/// thresholding over a U(0,100) draw; `None` is the "no call" residual.
fn select_target<S: Sampler>(group: &CallGroup, sampler: &mut S) -> Option<EndpointName> {
    let draw = sampler.percent();
    let mut cumulative = 0.0;
    for candidate in group {
        cumulative += candidate.probability_percent;
        if draw < cumulative {
            return Some(candidate.target.clone());
        }
    }
    None
}
