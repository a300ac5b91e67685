//! Error taxonomy for the transport core.
//!
//! Numerical edge cases, the chord-iteration cap and particles leaving the
//! world are not errors; they are handled inside the step. What remains is
//! misconfiguration, which halts the run.

use crate::track::ParticleKind;
use thiserror::Error;

/// A bounded slot reservation went past its fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity {capacity} exhausted")]
pub struct CapacityError {
    pub capacity: usize,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{species} track pool exhausted (capacity {capacity})")]
    PoolExhausted {
        species: ParticleKind,
        capacity: usize,
    },

    #[error("{species} active list full (capacity {capacity})")]
    QueueFull {
        species: ParticleKind,
        capacity: usize,
    },

    #[error("primary at ({x}, {y}, {z}) is outside the world")]
    PrimaryOutsideWorld { x: f64, y: f64, z: f64 },

    #[error("invalid primary: {0}")]
    InvalidPrimary(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Duplicate cell_id {0} found. All cell IDs must be unique.")]
    DuplicateCellId(u32),

    #[error("Duplicate surface_id {0} found. All surface IDs must be unique.")]
    DuplicateSurfaceId(usize),

    #[error("geometry has no cells")]
    Empty,
}
