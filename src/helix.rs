// Exact helix in a uniform magnetic field along z.

use crate::units::B2C;
use nalgebra::Vector3;

/// Below this turning angle the trigonometric ratios use their series.
const SMALL_ANGLE: f64 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelixStepper {
    /// Field strength along z in tesla.
    pub bz: f64,
}

impl HelixStepper {
    pub fn new(bz: f64) -> Self {
        Self { bz }
    }

    /// Angle the transverse direction turns through per unit arc length.
    pub fn turning_rate(&self, charge: f64, momentum: f64) -> f64 {
        B2C * charge * self.bz / momentum
    }

    /// Advance `step` along the helix; returns the end position and direction.
    ///
    /// With no field, no charge or zero momentum the motion is a straight line
    /// and the result is bit-identical to `position + direction * step`.
    pub fn do_step(
        &self,
        charge: f64,
        momentum: f64,
        step: f64,
        position: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let phi = if momentum > 0.0 {
            step * self.turning_rate(charge, momentum)
        } else {
            0.0
        };
        if phi == 0.0 || !phi.is_finite() {
            return (position + direction * step, *direction);
        }

        // sin(phi)/phi and (1 - cos(phi))/phi
        let (sinc, cosc) = if phi.abs() < SMALL_ANGLE {
            let phi2 = phi * phi;
            (1.0 - phi2 / 6.0, phi * (0.5 - phi2 / 24.0))
        } else {
            let half = (0.5 * phi).sin();
            (phi.sin() / phi, 2.0 * half * half / phi)
        };
        let (sin_phi, cos_phi) = phi.sin_cos();

        let dx = direction.x;
        let dy = direction.y;
        let end_position = position
            + Vector3::new(
                step * (dx * sinc - dy * cosc),
                step * (dx * cosc + dy * sinc),
                step * direction.z,
            );
        let end_direction = Vector3::new(
            dx * cos_phi - dy * sin_phi,
            dx * sin_phi + dy * cos_phi,
            direction.z,
        );
        (end_position, end_direction)
    }
}
