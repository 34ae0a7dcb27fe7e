use serde::{Deserialize, Serialize};

use crate::ids::{EndpointName, ServiceName};

/// Time window a fault covers, in simulated days and hours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    /// One-based day the window starts on.
    pub day: u32,
    /// Hour of day the window starts at, `0..24`.
    pub start_hour: u32,
    /// Window length in hours; may wrap past midnight into the next day.
    pub duration_hours: u32,
    /// Probability in percent that the fault occurs in a covered slot.
    #[serde(default = "default_probability_percent")]
    pub probability_percent: f64,
}

fn default_probability_percent() -> f64 {
    100.0
}

impl TimePeriod {
    /// Creates a window that always fires (100% probability).
    #[must_use]
    pub const fn new(day: u32, start_hour: u32, duration_hours: u32) -> Self {
        Self {
            day,
            start_hour,
            duration_hours,
            probability_percent: 100.0,
        }
    }

    /// Sets the occurrence probability of this window.
    #[must_use]
    pub const fn with_probability(mut self, probability_percent: f64) -> Self {
        self.probability_percent = probability_percent;
        self
    }
}

/// Extra traffic injected into targeted endpoints.
///
/// A declaration carries exactly one of the two forms; the enum makes any
/// other combination unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficAmount {
    /// Requests added on top of the slot's entry-point count.
    Extra(u64),
    /// Factor the slot's entry-point count is multiplied by.
    Multiplier(f64),
}

/// What a fault does to its targets while active.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FaultKind {
    /// Adds service latency to targeted endpoints.
    IncreaseLatency {
        /// Added latency in milliseconds.
        ms: f64,
    },
    /// Adds error-rate percentage points to targeted endpoints.
    IncreaseErrorRate {
        /// Added error rate in percent.
        percent: f64,
    },
    /// Injects additional entry-point traffic into targeted endpoints.
    InjectTraffic {
        /// Amount of traffic injected.
        amount: TrafficAmount,
    },
    /// Removes replicas from targeted services.
    ReduceInstance {
        /// Number of replicas removed.
        count: u32,
    },
}

impl FaultKind {
    /// Canonical kebab-case name, used for metric labels and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IncreaseLatency { .. } => "increase-latency",
            Self::IncreaseErrorRate { .. } => "increase-error-rate",
            Self::InjectTraffic { .. } => "inject-traffic",
            Self::ReduceInstance { .. } => "reduce-instance",
        }
    }
}

/// One fault declaration: what happens, when, and to whom.
///
/// Endpoint-level kinds (latency, error rate, traffic) consume `endpoints`;
/// upstream preprocessing has already expanded any service-level targets
/// into the endpoints they own. `ReduceInstance` consumes `services`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fault {
    /// Effect applied while the fault is active.
    pub kind: FaultKind,
    /// Time windows the fault covers.
    pub periods: Vec<TimePeriod>,
    /// Targeted endpoints, for endpoint-level fault kinds.
    #[serde(default)]
    pub endpoints: Vec<EndpointName>,
    /// Targeted services, for `ReduceInstance`.
    #[serde(default)]
    pub services: Vec<ServiceName>,
}
