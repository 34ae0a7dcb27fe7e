//! Core domain types for the MeshSim synthetic-traffic engine.

pub mod config;
pub mod data;
pub mod error;
pub mod fault;
pub mod graph;
pub mod ids;
pub mod metric;
pub mod metrics;
pub mod slot;
pub mod time;

pub use config::SimulationSettings;
pub use data::{CombinedRealtimeData, EndpointBaseData, LatencyStats, SampleResponse};
pub use error::{SimError, SimResult};
pub use fault::{Fault, FaultKind, TimePeriod, TrafficAmount};
pub use graph::{CallGroup, CallTarget, DependencyGraph};
pub use ids::{EndpointName, ServiceName, SimulationId};
pub use metric::{Delay, EndpointMetric, FallbackPolicy, ReplicaCount, ServiceMetric};
pub use slot::{
    BaseMetrics, FaultAdjustedMetrics, MetricsBySlot, OverloadAdjustedMetrics, SlotMetrics,
};
pub use time::TimeSlot;
