// Run configuration for the transport core.
use crate::error::ConfigError;
use crate::units::{CM, TESLA};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning of the boundary-chord search in a magnetic field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagatorSettings {
    /// Largest accepted sagitta between helix and chord.
    pub deflection_tolerance: f64,
    /// Chord rounds before accepting the current position.
    pub max_chord_iterations: u32,
    /// Remaining arc below `min_step_fraction * step` is ignored.
    pub min_step_fraction: f64,
    /// Distance pushed past an accepted boundary crossing.
    pub push: f64,
}

impl Default for PropagatorSettings {
    fn default() -> Self {
        Self {
            deflection_tolerance: 1.0e-2 * CM,
            max_chord_iterations: 10,
            min_step_fraction: 1.0e-7,
            push: 1.0e-8 * CM,
        }
    }
}

/// Configuration of one simulation run.
///
/// Every field has a default, so a JSON document only needs the values it
/// changes:
///
/// ```json
/// { "bz": 1.0, "track_capacity": 4096, "seed": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Field along z in tesla.
    pub bz: f64,
    /// Slots per species track pool, also the size of each active list.
    pub track_capacity: usize,
    /// Upper bound on steps taken by [`crate::model::Model::run`].
    pub max_steps: usize,
    /// Worker threads; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Seed of the first primary; later primaries use consecutive seeds.
    pub seed: u64,
    pub propagator: PropagatorSettings,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bz: 0.0 * TESLA,
            track_capacity: 1 << 16,
            max_steps: 10_000,
            threads: None,
            seed: 1,
            propagator: PropagatorSettings::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.track_capacity == 0 {
            return Err(ConfigError::Invalid("track_capacity must be positive".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be positive".into()));
        }
        if !self.bz.is_finite() {
            return Err(ConfigError::Invalid(format!("bz must be finite, got {}", self.bz)));
        }
        let p = &self.propagator;
        if !(p.deflection_tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "propagator.deflection_tolerance must be positive".into(),
            ));
        }
        if p.max_chord_iterations == 0 {
            return Err(ConfigError::Invalid(
                "propagator.max_chord_iterations must be positive".into(),
            ));
        }
        if !(p.min_step_fraction > 0.0 && p.min_step_fraction < 1.0) {
            return Err(ConfigError::Invalid(
                "propagator.min_step_fraction must lie in (0, 1)".into(),
            ));
        }
        if !(p.push >= 0.0) {
            return Err(ConfigError::Invalid("propagator.push must be non-negative".into()));
        }
        Ok(())
    }
}
