use crate::stats::AngularDistribution;
use crate::track::ParticleKind;
use crate::units::MEV;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A primary drawn from a source, before it is given a slot and a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primary {
    pub kind: ParticleKind,
    pub energy: f64,
    pub position: Vector3<f64>,
    pub direction: Vector3<f64>,
}

/// Point source with a single species and energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndependentSource {
    pub kind: ParticleKind,
    pub space: [f64; 3],
    pub angle: AngularDistribution,
    /// Kinetic energy in MeV.
    pub energy: f64,
}

impl IndependentSource {
    pub fn new() -> Self {
        Self {
            kind: ParticleKind::Gamma,
            space: [0.0, 0.0, 0.0],
            angle: AngularDistribution::Isotropic,
            energy: 1.0 * MEV,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Primary {
        Primary {
            kind: self.kind,
            energy: self.energy,
            position: Vector3::from(self.space),
            direction: self.angle.sample(rng),
        }
    }
}

impl Default for IndependentSource {
    fn default() -> Self {
        Self::new()
    }
}
