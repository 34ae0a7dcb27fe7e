//! Simulation settings
//!
//! This module provides the tunable parameters of a simulation run with
//! support for:
//! - Configuration files
//! - Environment variable overrides (`MESHSIM_*`)
//! - Reasonable defaults
//! - Validation of documented bounds

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SimError, SimResult};

/// Tunable parameters of one simulation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Simulated duration in days, `1..=7`.
    pub simulation_duration_in_days: u32,

    /// Steepness of the overload error-rate saturation curve, `0..=10`.
    pub overload_error_rate_increase_factor: f64,

    /// Seed for the simulation's random draws. Runs replay bit-identically
    /// when set; draws come from OS entropy when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            simulation_duration_in_days: 1,
            overload_error_rate_increase_factor: Self::DEFAULT_OVERLOAD_FACTOR,
            rng_seed: None,
        }
    }
}

impl SimulationSettings {
    /// Maximum simulated duration in days.
    pub const MAX_DURATION_DAYS: u32 = 7;
    /// Maximum steepness of the overload saturation curve.
    pub const MAX_OVERLOAD_FACTOR: f64 = 10.0;
    /// Default steepness of the overload saturation curve.
    pub const DEFAULT_OVERLOAD_FACTOR: f64 = 3.0;

    /// Load settings from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by the `MESHSIM_CONFIG` env var
    /// 3. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("simulation_duration_in_days", 1)?
            .set_default(
                "overload_error_rate_increase_factor",
                Self::DEFAULT_OVERLOAD_FACTOR,
            )?;

        if let Ok(config_path) = std::env::var("MESHSIM_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("MESHSIM")
                .separator("__")
                .try_parsing(true),
        );

        let settings: SimulationSettings = builder.build()?.try_deserialize()?;

        settings
            .validate()
            .map_err(|err| ConfigError::Message(err.to_string()))?;

        Ok(settings)
    }

    /// Load settings from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: SimulationSettings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        settings
            .validate()
            .map_err(|err| ConfigError::Message(err.to_string()))?;

        Ok(settings)
    }

    /// Validate setting bounds.
    pub fn validate(&self) -> SimResult<()> {
        if !(1..=Self::MAX_DURATION_DAYS).contains(&self.simulation_duration_in_days) {
            return Err(SimError::invalid_config(format!(
                "simulation_duration_in_days must be 1..={}, got {}",
                Self::MAX_DURATION_DAYS,
                self.simulation_duration_in_days
            )));
        }

        if !(0.0..=Self::MAX_OVERLOAD_FACTOR).contains(&self.overload_error_rate_increase_factor) {
            return Err(SimError::invalid_config(format!(
                "overload_error_rate_increase_factor must be 0..={}, got {}",
                Self::MAX_OVERLOAD_FACTOR,
                self.overload_error_rate_increase_factor
            )));
        }

        Ok(())
    }
}
