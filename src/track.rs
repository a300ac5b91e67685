use crate::navigation::NavState;
use crate::ranluxpp::Ranluxpp;
use crate::units::ELECTRON_MASS_C2;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of discrete interaction channels tracked per particle.
pub const NUM_PROCESSES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    #[serde(rename = "electron")]
    Electron,
    #[serde(rename = "positron")]
    Positron,
    #[serde(rename = "gamma")]
    Gamma,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 3] = [
        ParticleKind::Electron,
        ParticleKind::Positron,
        ParticleKind::Gamma,
    ];

    /// Charge in units of the elementary charge.
    pub fn charge(self) -> f64 {
        match self {
            ParticleKind::Electron => -1.0,
            ParticleKind::Positron => 1.0,
            ParticleKind::Gamma => 0.0,
        }
    }

    pub fn mass(self) -> f64 {
        match self {
            ParticleKind::Electron | ParticleKind::Positron => ELECTRON_MASS_C2,
            ParticleKind::Gamma => 0.0,
        }
    }

    pub fn is_charged(self) -> bool {
        self != ParticleKind::Gamma
    }

    /// Position of this species in per-species arrays.
    pub fn index(self) -> usize {
        match self {
            ParticleKind::Electron => 0,
            ParticleKind::Positron => 1,
            ParticleKind::Gamma => 2,
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParticleKind::Electron => "electron",
            ParticleKind::Positron => "positron",
            ParticleKind::Gamma => "gamma",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a track between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackStatus {
    #[default]
    Propagating,
    /// Crossed a boundary last step; relocated before the next one.
    OnBoundary,
    Dead,
}

/// One particle in flight.
///
/// The species is implied by the pool the track lives in; it is not stored.
#[derive(Debug, Clone)]
pub struct Track {
    /// Kinetic energy.
    pub energy: f64,
    pub position: Vector3<f64>,
    /// Unit vector.
    pub direction: Vector3<f64>,
    pub current_state: NavState,
    pub next_state: NavState,
    /// Remaining mean free paths per channel; `<= 0` means resample.
    pub num_ia_left: [f64; NUM_PROCESSES],
    pub rng: Ranluxpp,
    pub status: TrackStatus,
}

impl Track {
    /// A primary track with an externally seeded stream.
    pub fn new(
        seed: u64,
        energy: f64,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        state: NavState,
    ) -> Self {
        Self {
            energy,
            position,
            direction: direction.normalize(),
            current_state: state,
            next_state: state,
            num_ia_left: [-1.0; NUM_PROCESSES],
            rng: Ranluxpp::new(seed),
            status: TrackStatus::Propagating,
        }
    }

    /// A secondary born at the parent's position and in the parent's volume.
    ///
    /// The parent's stream is branched so the two never share random output.
    pub fn secondary_of(parent: &mut Track, energy: f64, direction: Vector3<f64>) -> Self {
        Self {
            energy,
            position: parent.position,
            direction: direction.normalize(),
            current_state: parent.current_state,
            next_state: parent.next_state,
            num_ia_left: [-1.0; NUM_PROCESSES],
            rng: parent.rng.branch(),
            status: TrackStatus::Propagating,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status != TrackStatus::Dead
    }

    /// Kill the track, returning the kinetic energy it still carried.
    pub fn kill(&mut self) -> f64 {
        let remaining = self.energy;
        self.energy = 0.0;
        self.status = TrackStatus::Dead;
        remaining
    }

    /// Momentum magnitude for a particle of `kind` with this track's energy.
    pub fn momentum(&self, kind: ParticleKind) -> f64 {
        let mass = kind.mass();
        (self.energy * (self.energy + 2.0 * mass)).sqrt()
    }
}

impl Default for Track {
    fn default() -> Self {
        Self {
            energy: 0.0,
            position: Vector3::zeros(),
            direction: Vector3::new(0.0, 0.0, 1.0),
            current_state: NavState::outside(),
            next_state: NavState::outside(),
            num_ia_left: [-1.0; NUM_PROCESSES],
            rng: Ranluxpp::new(0),
            status: TrackStatus::Dead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_construction() {
        let t = Track::new(
            1,
            2.0,
            Vector3::new(0.0, 1.0, 2.0),
            Vector3::new(2.0, 0.0, 0.0),
            NavState::inside(0),
        );
        assert_eq!(t.position, Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(t.direction, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(t.energy, 2.0);
        assert_eq!(t.num_ia_left, [-1.0; 3]);
        assert!(t.is_alive());
    }

    #[test]
    fn test_secondary_inherits_position_and_state() {
        let mut parent = Track::new(
            3,
            5.0,
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, 1.0),
            NavState::inside(4),
        );
        let before = parent.rng.clone();
        let child = Track::secondary_of(&mut parent, 1.0, Vector3::new(0.0, 3.0, 0.0));
        assert_eq!(child.position, parent.position);
        assert_eq!(child.current_state, NavState::inside(4));
        assert_eq!(child.direction, Vector3::new(0.0, 1.0, 0.0));
        assert_ne!(parent.rng, before);
        assert_ne!(child.rng, parent.rng);
    }

    #[test]
    fn test_kill_returns_energy() {
        let mut t = Track::new(
            0,
            0.25,
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            NavState::inside(0),
        );
        assert_eq!(t.kill(), 0.25);
        assert_eq!(t.energy, 0.0);
        assert_eq!(t.status, TrackStatus::Dead);
    }

    #[test]
    fn test_species() {
        assert_eq!(ParticleKind::Electron.charge(), -1.0);
        assert!(!ParticleKind::Gamma.is_charged());
        assert_eq!(ParticleKind::Gamma.mass(), 0.0);
        assert_eq!(ParticleKind::Positron.to_string(), "positron");
        for (i, kind) in ParticleKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
