// Unit system: lengths in cm, energies in MeV, magnetic field in tesla.

pub const CM: f64 = 1.0;
pub const MM: f64 = 0.1 * CM;
pub const METER: f64 = 100.0 * CM;

pub const MEV: f64 = 1.0;
pub const KEV: f64 = 1.0e-3 * MEV;
pub const EV: f64 = 1.0e-6 * MEV;
pub const GEV: f64 = 1.0e3 * MEV;

pub const TESLA: f64 = 1.0;

/// Electron rest energy m_e c^2.
pub const ELECTRON_MASS_C2: f64 = 0.510_998_95 * MEV;

/// Converts `charge * Bz / momentum` into curvature (1/length).
pub const B2C: f64 = -0.299_792_458 * GEV / (TESLA * METER);

/// Distance a track is pushed past an accepted boundary crossing.
pub const PUSH: f64 = 1.0e-8 * CM;

pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curvature_constant() {
        // 1 GeV/c in 1 T curls with a radius of ~3.34 m.
        let radius = GEV / (B2C.abs() * TESLA);
        assert!((radius / METER - 3.3356).abs() < 1e-3);
    }
}
