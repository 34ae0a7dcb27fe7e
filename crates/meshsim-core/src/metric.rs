use serde::{Deserialize, Serialize};

use crate::ids::{EndpointName, ServiceName};

/// Base service time of an endpoint: a latency floor with uniform jitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Base latency in milliseconds.
    pub latency_ms: f64,
    /// Uniform jitter half-width in milliseconds.
    pub jitter_ms: f64,
}

impl Delay {
    /// Zero latency, zero jitter.
    pub const ZERO: Delay = Delay {
        latency_ms: 0.0,
        jitter_ms: 0.0,
    };

    /// Creates a delay from a latency floor and jitter half-width.
    #[must_use]
    pub const fn new(latency_ms: f64, jitter_ms: f64) -> Self {
        Self {
            latency_ms,
            jitter_ms,
        }
    }
}

/// How an endpoint folds dependent-call failures into its own outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// The endpoint fails when it fails itself or when any dependent call
    /// fails.
    #[default]
    FailIfAnyDependentFail,
    /// The endpoint fails when it fails itself or when every dependent call
    /// fails; a single surviving dependent keeps it alive.
    FailIfAllDependentFail,
    /// Dependent failures never affect the endpoint's reported outcome.
    IgnoreDependentFail,
}

impl FallbackPolicy {
    /// Folds an endpoint's own outcome with its dependents' outcomes into
    /// the final success flag reported upstream.
    ///
    /// `dependents` holds one success flag per dependent-call selection; a
    /// "no call" selection is recorded as `true` by the caller.
    #[must_use]
    pub fn resolve(self, own_success: bool, dependents: &[bool]) -> bool {
        match self {
            Self::FailIfAnyDependentFail => own_success && dependents.iter().all(|&ok| ok),
            Self::FailIfAllDependentFail => {
                own_success && (dependents.is_empty() || dependents.iter().any(|&ok| ok))
            }
            Self::IgnoreDependentFail => own_success,
        }
    }

    /// Canonical kebab-case name, as written in user configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailIfAnyDependentFail => "fail-if-any-dependent-fail",
            Self::FailIfAllDependentFail => "fail-if-all-dependent-fail",
            Self::IgnoreDependentFail => "ignore-dependent-fail",
        }
    }
}

/// Static load parameters of one endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointMetric {
    /// Endpoint this row describes.
    pub endpoint: EndpointName,
    /// Base service time.
    #[serde(default)]
    pub delay: Delay,
    /// Probability in percent that the endpoint itself fails a request.
    #[serde(default)]
    pub error_rate_percent: f64,
    /// Requests per day arriving from outside the modeled system; non-zero
    /// only for entry-point endpoints.
    #[serde(default)]
    pub expected_external_daily_request_count: u64,
    /// Failure-fallback semantics for dependent calls.
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl EndpointMetric {
    /// Zeroed default row for endpoints that appear in the dependency graph
    /// without user configuration, so every defined endpoint has a metric
    /// row.
    #[must_use]
    pub fn zeroed(endpoint: EndpointName) -> Self {
        Self {
            endpoint,
            delay: Delay::ZERO,
            error_rate_percent: 0.0,
            expected_external_daily_request_count: 0,
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Static capacity parameters of one service version.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceMetric {
    /// Service version this row describes.
    pub service: ServiceName,
    /// Requests per second one replica sustains without overload.
    pub capacity_per_replica: f64,
}

/// Replica count of one service version at simulation start.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicaCount {
    /// Service version this row describes.
    pub service: ServiceName,
    /// Number of running replicas.
    pub replicas: u32,
}
