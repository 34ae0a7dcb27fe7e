//! MeshSim load simulation engine.
//!
//! Given a declarative description of services, endpoints, their call
//! graph, and target load/fault parameters, the engine produces
//! statistically realistic per-time-slot request/error/latency records as
//! if real production traffic had occurred, without a live cluster.
//!
//! One run executes six stages:
//! 1. expand static metrics into per-slot working metrics,
//! 2. inject faults (both passes see the same fault conditions),
//! 3. a first propagation pass estimating per-service load,
//! 4. overload-aware error-rate adjustment,
//! 5. a final propagation pass with full latency statistics,
//! 6. conversion into combined realtime data records.
//!
//! Time slots are statistically and computationally independent once their
//! working metrics are built; the propagator runs them in parallel. All
//! randomness flows through [`sampler::Sampler`], so seeded runs replay
//! bit-identically.

pub mod baseline;
pub mod engine;
pub mod fault;
pub mod generator;
pub mod overload;
pub mod propagation;
pub mod sampler;
pub mod stats;

pub use engine::{LoadSimulationEngine, SimulationInput};
pub use fault::FaultInjector;
pub use generator::DataGenerator;
pub use overload::OverloadEstimator;
pub use propagation::{PropagationBySlot, PropagationStats, Propagator, StatusLatency};
pub use sampler::{Sampler, SequenceSampler, StdSampler};
pub use stats::WelfordAccumulator;
