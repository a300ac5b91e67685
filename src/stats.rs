use crate::units::TWO_PI;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Direction drawn uniformly on the unit sphere: `cos(theta) = 2u - 1`, `phi = 2 pi u`.
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let mu: f64 = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = TWO_PI * rng.gen::<f64>();
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Angular distributions for primary sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AngularDistribution {
    Isotropic,
    Monodirectional { reference_uvw: [f64; 3] },
}

impl AngularDistribution {
    /// Monodirectional along (u, v, w), normalized. `None` for the zero vector.
    pub fn new_monodirectional(u: f64, v: f64, w: f64) -> Option<Self> {
        let mag = (u * u + v * v + w * w).sqrt();
        if mag == 0.0 || !mag.is_finite() {
            return None;
        }
        Some(Self::Monodirectional {
            reference_uvw: [u / mag, v / mag, w / mag],
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        match self {
            AngularDistribution::Isotropic => isotropic_direction(rng),
            AngularDistribution::Monodirectional { reference_uvw } => {
                Vector3::from(*reference_uvw)
            }
        }
    }
}
