//! Cross sections and final-state sampling for the electromagnetic processes.
//!
//! Energies are kinetic energies in MeV unless noted. Per-electron cross
//! sections are in cm^2 and are multiplied by the electron density of the
//! medium by the caller.

use crate::units::{ELECTRON_MASS_C2, TWO_PI};
use nalgebra::Vector3;
use rand::Rng;

/// Classical electron radius in cm.
pub const CLASSICAL_ELECTRON_RADIUS: f64 = 2.817_940_326_2e-13;

/// 2 pi r_e^2 m_e c^2 in MeV cm^2.
const TWO_PI_MC2_RCL2: f64 =
    TWO_PI * ELECTRON_MASS_C2 * CLASSICAL_ELECTRON_RADIUS * CLASSICAL_ELECTRON_RADIUS;

/// Rotate `u_old` to a direction at polar cosine `mu` and azimuth `phi` about it.
pub fn rotate_direction_3d(u_old: &Vector3<f64>, mu: f64, phi: f64) -> Vector3<f64> {
    let mu = mu.clamp(-1.0, 1.0);
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // Find a perpendicular vector to u_old
    let perp = if u_old.x.abs() < 0.99 {
        Vector3::new(1.0, 0.0, 0.0).cross(u_old).normalize()
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(u_old).normalize()
    };
    let ortho = u_old.cross(&perp);

    (mu * u_old + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho).normalize()
}

/// Direction of a particle that shared momentum `p0 * d0` with an emitted
/// particle of momentum `p1 * d1`.
fn recoil_direction(
    p0: f64,
    d0: &Vector3<f64>,
    p1: f64,
    d1: &Vector3<f64>,
) -> Vector3<f64> {
    (p0 * d0 - p1 * d1).try_normalize(f64::MIN_POSITIVE).unwrap_or(*d0)
}

fn momentum(kinetic: f64) -> f64 {
    (kinetic * (kinetic + 2.0 * ELECTRON_MASS_C2)).sqrt()
}

/// A particle leaving an interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub energy: f64,
    pub direction: Vector3<f64>,
}

/// Outcome of an interaction that emits one secondary and keeps the primary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub secondary: Emission,
    pub primary_direction: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Ionisation

/// Moller (e-) or Bhabha (e+) cross section per target electron for delta rays
/// above `cut`.
pub fn ionization_cross_section(energy: f64, cut: f64, is_electron: bool) -> f64 {
    let max_energy = if is_electron { 0.5 * energy } else { energy };
    if cut >= max_energy || energy <= 0.0 {
        return 0.0;
    }
    let xmin = cut / energy;
    let xmax = max_energy / energy;
    let tau = energy / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let gamma2 = gam * gam;
    let beta2 = tau * (tau + 2.0) / gamma2;

    let cross = if is_electron {
        let gg = (2.0 * gam - 1.0) / gamma2;
        ((xmax - xmin)
            * (1.0 - gg + 1.0 / (xmin * xmax) + 1.0 / ((1.0 - xmin) * (1.0 - xmax)))
            - gg * (xmax * (1.0 - xmin) / (xmin * (1.0 - xmax))).ln())
            / beta2
    } else {
        let y = 1.0 / (1.0 + gam);
        let y2 = y * y;
        let y12 = 1.0 - 2.0 * y;
        let b1 = 2.0 - y2;
        let b2 = y12 * (3.0 + y2);
        let y122 = y12 * y12;
        let b4 = y122 * y12;
        let b3 = b4 + y122;
        (xmax - xmin)
            * (1.0 / (beta2 * xmin * xmax) + b2 - 0.5 * b3 * (xmin + xmax)
                + b4 * (xmin * xmin + xmin * xmax + xmax * xmax) / 3.0)
            - b1 * (xmax / xmin).ln()
    };
    (cross * TWO_PI_MC2_RCL2 / energy).max(0.0)
}

/// Sample the delta-ray energy for Moller (e-) or Bhabha (e+) scattering.
pub fn sample_energy_transfer_ionization<R: Rng + ?Sized>(
    energy: f64,
    cut: f64,
    is_electron: bool,
    rng: &mut R,
) -> f64 {
    let max_energy = if is_electron { 0.5 * energy } else { energy };
    let xmin = cut / energy;
    let xmax = max_energy / energy;
    let tau = energy / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let gamma2 = gam * gam;
    let beta2 = tau * (tau + 2.0) / gamma2;

    if is_electron {
        let gg = (2.0 * gam - 1.0) / gamma2;
        let y = 1.0 - xmax;
        let grej = 1.0 - gg * xmax + xmax * xmax * (1.0 - gg + (1.0 - gg * y) / (y * y));
        loop {
            let r = rng.gen::<f64>();
            let q = xmin * xmax / (xmin * (1.0 - r) + xmax * r);
            let y = 1.0 - q;
            let z = 1.0 - gg * q + q * q * (1.0 - gg + (1.0 - gg * y) / (y * y));
            if z >= grej * rng.gen::<f64>() {
                return q * energy;
            }
        }
    } else {
        let y = 1.0 / (1.0 + gam);
        let y2 = y * y;
        let y12 = 1.0 - 2.0 * y;
        let b1 = 2.0 - y2;
        let b2 = y12 * (3.0 + y2);
        let y122 = y12 * y12;
        let b4 = y122 * y12;
        let b3 = b4 + y122;
        // Upper bound of the shape below: drop its negative terms.
        let y = xmax * xmax;
        let grej = 1.0 + (y * y * b4 + y * b2) * beta2;
        loop {
            let r = rng.gen::<f64>();
            let q = xmin * xmax / (xmin * (1.0 - r) + xmax * r);
            let y = q * q;
            let z = 1.0 + (y * y * b4 - q * y * b3 + y * b2 - q * b1) * beta2;
            if z >= grej * rng.gen::<f64>() {
                return q * energy;
            }
        }
    }
}

/// Directions after ionisation: the delta ray and the scattered primary.
pub fn sample_directions_ionization<R: Rng + ?Sized>(
    energy: f64,
    delta_energy: f64,
    direction: &Vector3<f64>,
    rng: &mut R,
) -> (Vector3<f64>, Vector3<f64>) {
    let mc2 = ELECTRON_MASS_C2;
    let cost = (delta_energy * (energy + 2.0 * mc2) / (energy * (delta_energy + 2.0 * mc2)))
        .min(1.0)
        .sqrt();
    let phi = TWO_PI * rng.gen::<f64>();
    let delta_dir = rotate_direction_3d(direction, cost, phi);
    let primary_dir = recoil_direction(momentum(energy), direction, momentum(delta_energy), &delta_dir);
    (delta_dir, primary_dir)
}

// ---------------------------------------------------------------------------
// Bremsstrahlung

/// Macroscopic cross section for emitting a photon above `k_min`, complete
/// screening, in 1/cm for a medium of radiation length `x0`.
pub fn bremsstrahlung_cross_section(energy: f64, k_min: f64, x0: f64) -> f64 {
    if energy <= k_min || k_min <= 0.0 {
        return 0.0;
    }
    let total = energy + ELECTRON_MASS_C2;
    let sigma = (4.0 / 3.0) * (energy / k_min).ln() - (4.0 / 3.0) * (energy - k_min) / total
        + (energy * energy - k_min * k_min) / (2.0 * total * total);
    (sigma / x0).max(0.0)
}

/// Photon energy from the complete-screening spectrum between `k_min` and `energy`.
pub fn sample_energy_transfer_bremsstrahlung<R: Rng + ?Sized>(
    energy: f64,
    k_min: f64,
    rng: &mut R,
) -> f64 {
    let total = energy + ELECTRON_MASS_C2;
    let ratio = energy / k_min;
    loop {
        let k = k_min * ratio.powf(rng.gen::<f64>());
        let y = k / total;
        if rng.gen::<f64>() <= 1.0 - y + 0.75 * y * y {
            return k;
        }
    }
}

/// Polar angle cosine from the modified Tsai distribution for a lepton of
/// total energy `total_energy`.
pub fn sample_tsai_cos_theta<R: Rng + ?Sized>(total_energy: f64, rng: &mut R) -> f64 {
    let a = if rng.gen::<f64>() < 0.25 { 1.875 } else { 0.625 };
    let u = -(rng.gen::<f64>() * rng.gen::<f64>()).max(f64::MIN_POSITIVE).ln() / a;
    let theta = u * ELECTRON_MASS_C2 / total_energy;
    theta.min(std::f64::consts::PI).cos()
}

/// Directions after bremsstrahlung: the photon and the radiating primary.
pub fn sample_directions_bremsstrahlung<R: Rng + ?Sized>(
    energy: f64,
    photon_energy: f64,
    direction: &Vector3<f64>,
    rng: &mut R,
) -> (Vector3<f64>, Vector3<f64>) {
    let cost = sample_tsai_cos_theta(energy + ELECTRON_MASS_C2, rng);
    let phi = TWO_PI * rng.gen::<f64>();
    let photon_dir = rotate_direction_3d(direction, cost, phi);
    let primary_dir = recoil_direction(momentum(energy), direction, photon_energy, &photon_dir);
    (photon_dir, primary_dir)
}

// ---------------------------------------------------------------------------
// Positron annihilation

/// Heitler cross section per target electron for e+ e- -> 2 gamma in flight.
pub fn annihilation_cross_section(energy: f64) -> f64 {
    if energy <= 0.0 {
        return 0.0;
    }
    let gam = energy / ELECTRON_MASS_C2 + 1.0;
    let gamma2 = gam * gam;
    let sqgrate = (gamma2 - 1.0).sqrt();
    let pi_rcl2 = std::f64::consts::PI * CLASSICAL_ELECTRON_RADIUS * CLASSICAL_ELECTRON_RADIUS;
    pi_rcl2 / (gam + 1.0)
        * ((gamma2 + 4.0 * gam + 1.0) / (gamma2 - 1.0) * (gam + sqgrate).ln()
            - (gam + 3.0) / sqgrate)
}

/// Two photons from the annihilation of a positron in flight with an electron at rest.
pub fn sample_annihilation_in_flight<R: Rng + ?Sized>(
    energy: f64,
    direction: &Vector3<f64>,
    rng: &mut R,
) -> (Emission, Emission) {
    let mc2 = ELECTRON_MASS_C2;
    let tau = energy / mc2;
    let gam = tau + 1.0;
    let tau2 = tau + 2.0;
    let sqgrate = (tau / tau2).sqrt() * 0.5;
    let sqg2m1 = (tau * tau2).sqrt();

    let eps_min = 0.5 - sqgrate;
    let eps_max = 0.5 + sqgrate;
    let eps_ratio = (eps_max / eps_min).ln();

    let eps = loop {
        let eps = eps_min * (eps_ratio * rng.gen::<f64>()).exp();
        let reject = 1.0 - eps + (2.0 * gam * eps - 1.0) / (eps * tau2 * tau2);
        if reject >= rng.gen::<f64>() {
            break eps;
        }
    };

    let available = energy + 2.0 * mc2;
    let cost = if sqg2m1 > 0.0 {
        ((eps * tau2 - 1.0) / (eps * sqg2m1)).clamp(-1.0, 1.0)
    } else {
        2.0 * rng.gen::<f64>() - 1.0
    };
    let phi = TWO_PI * rng.gen::<f64>();
    let first_dir = rotate_direction_3d(direction, cost, phi);
    let first_energy = eps * available;
    let second_dir = recoil_direction(momentum(energy), direction, first_energy, &first_dir);
    (
        Emission {
            energy: first_energy,
            direction: first_dir,
        },
        Emission {
            energy: available - first_energy,
            direction: second_dir,
        },
    )
}

// ---------------------------------------------------------------------------
// Photon processes

/// Klein-Nishina cross section per target electron.
pub fn compton_cross_section(energy: f64) -> f64 {
    if energy <= 0.0 {
        return 0.0;
    }
    let k = energy / ELECTRON_MASS_C2;
    let l = (1.0 + 2.0 * k).ln();
    let pi2_rcl2 = TWO_PI * CLASSICAL_ELECTRON_RADIUS * CLASSICAL_ELECTRON_RADIUS;
    if k < 1.0e-3 {
        // Thomson limit with the first-order correction.
        return pi2_rcl2 * (4.0 / 3.0) * (1.0 - 2.0 * k);
    }
    pi2_rcl2
        * ((1.0 + k) / (k * k) * (2.0 * (1.0 + k) / (1.0 + 2.0 * k) - l / k) + l / (2.0 * k)
            - (1.0 + 3.0 * k) / ((1.0 + 2.0 * k) * (1.0 + 2.0 * k)))
}

/// Scattered photon from Klein-Nishina Compton scattering.
pub fn sample_compton<R: Rng + ?Sized>(
    energy: f64,
    direction: &Vector3<f64>,
    rng: &mut R,
) -> Emission {
    let e0_m = energy / ELECTRON_MASS_C2;
    let eps0 = 1.0 / (1.0 + 2.0 * e0_m);
    let eps0sq = eps0 * eps0;
    let alpha1 = -eps0.ln();
    let alpha2 = alpha1 + 0.5 * (1.0 - eps0sq);

    let (eps, onecost) = loop {
        let (eps, epssq) = if alpha1 > alpha2 * rng.gen::<f64>() {
            let eps = (-alpha1 * rng.gen::<f64>()).exp();
            (eps, eps * eps)
        } else {
            let epssq = eps0sq + (1.0 - eps0sq) * rng.gen::<f64>();
            (epssq.sqrt(), epssq)
        };
        let onecost = (1.0 - eps) / (eps * e0_m);
        let sint2 = onecost * (2.0 - onecost);
        let reject = 1.0 - eps * sint2 / (1.0 + epssq);
        if reject >= rng.gen::<f64>() {
            break (eps, onecost);
        }
    };

    let phi = TWO_PI * rng.gen::<f64>();
    Emission {
        energy: eps * energy,
        direction: rotate_direction_3d(direction, 1.0 - onecost, phi),
    }
}

/// Electron and positron from pair conversion of a photon above threshold.
pub fn sample_conversion<R: Rng + ?Sized>(
    energy: f64,
    direction: &Vector3<f64>,
    rng: &mut R,
) -> (Emission, Emission) {
    let mc2 = ELECTRON_MASS_C2;
    let eps0 = mc2 / energy;
    // Complete-screening Bethe-Heitler shape; its maximum on [0, 1] is 1.
    let eps = loop {
        let eps = eps0 + (1.0 - 2.0 * eps0) * rng.gen::<f64>();
        let shape = eps * eps + (1.0 - eps) * (1.0 - eps) + (2.0 / 3.0) * eps * (1.0 - eps);
        if shape >= rng.gen::<f64>() {
            break eps;
        }
    };

    let electron_energy = (eps * energy - mc2).max(0.0);
    let positron_energy = (energy - 2.0 * mc2 - electron_energy).max(0.0);

    let phi = TWO_PI * rng.gen::<f64>();
    let electron_cost = sample_tsai_cos_theta(electron_energy + mc2, rng);
    let positron_cost = sample_tsai_cos_theta(positron_energy + mc2, rng);
    (
        Emission {
            energy: electron_energy,
            direction: rotate_direction_3d(direction, electron_cost, phi),
        },
        Emission {
            energy: positron_energy,
            direction: rotate_direction_3d(direction, positron_cost, phi + std::f64::consts::PI),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranluxpp::Ranluxpp;

    fn z_axis() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    #[test]
    fn test_rotate_direction_keeps_angle() {
        let u = Vector3::new(0.3, -0.4, 0.866_025_403_784_438_6).normalize();
        for &(mu, phi) in &[(0.5, 0.1), (-0.9, 2.0), (1.0, 0.0), (-1.0, 1.0)] {
            let v = rotate_direction_3d(&u, mu, phi);
            assert!((v.norm() - 1.0).abs() < 1e-12);
            assert!((v.dot(&u) - mu).abs() < 1e-12);
        }
    }

    #[test]
    fn test_moller_sampling_bounds() {
        let mut rng = Ranluxpp::new(1);
        for _ in 0..1000 {
            let t = sample_energy_transfer_ionization(10.0, 0.1, true, &mut rng);
            assert!((0.1..=5.0).contains(&t));
            let t = sample_energy_transfer_ionization(10.0, 0.1, false, &mut rng);
            assert!((0.1..=10.0).contains(&t));
        }
    }

    #[test]
    fn test_ionization_cross_section_threshold() {
        assert_eq!(ionization_cross_section(0.15, 0.1, true), 0.0);
        assert!(ionization_cross_section(0.25, 0.1, true) > 0.0);
        assert!(ionization_cross_section(0.15, 0.1, false) > 0.0);
        // Lower cut, more delta rays.
        assert!(
            ionization_cross_section(10.0, 0.01, true) > ionization_cross_section(10.0, 0.1, true)
        );
    }

    #[test]
    fn test_bremsstrahlung_energy_range() {
        let mut rng = Ranluxpp::new(2);
        for _ in 0..1000 {
            let k = sample_energy_transfer_bremsstrahlung(5.0, 0.01, &mut rng);
            assert!((0.01..=5.0).contains(&k));
        }
        assert_eq!(bremsstrahlung_cross_section(0.005, 0.01, 36.0), 0.0);
        assert!(bremsstrahlung_cross_section(5.0, 0.01, 36.0) > 0.0);
    }

    #[test]
    fn test_compton_energy_bounds() {
        let mut rng = Ranluxpp::new(3);
        let e = 1.0;
        let min = e / (1.0 + 2.0 * e / ELECTRON_MASS_C2);
        for _ in 0..1000 {
            let out = sample_compton(e, &z_axis(), &mut rng);
            assert!(out.energy >= min * (1.0 - 1e-12) && out.energy <= e);
            assert!((out.direction.norm() - 1.0).abs() < 1e-12);
            // Compton kinematics tie energy and angle together.
            let cost = out.direction.dot(&z_axis());
            let expected = e / (1.0 + e / ELECTRON_MASS_C2 * (1.0 - cost));
            assert!((out.energy - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_compton_cross_section_thomson_limit() {
        let thomson = (8.0 / 3.0) * std::f64::consts::PI * CLASSICAL_ELECTRON_RADIUS.powi(2);
        let low = compton_cross_section(1.0e-6);
        assert!((low / thomson - 1.0).abs() < 1e-3);
        assert!(compton_cross_section(10.0) < compton_cross_section(1.0));
    }

    #[test]
    fn test_annihilation_conserves_energy() {
        let mut rng = Ranluxpp::new(4);
        for _ in 0..200 {
            let (g1, g2) = sample_annihilation_in_flight(2.0, &z_axis(), &mut rng);
            let total = g1.energy + g2.energy;
            assert!((total - (2.0 + 2.0 * ELECTRON_MASS_C2)).abs() < 1e-12);
            assert!(g1.energy > 0.0 && g2.energy > 0.0);
            assert!((g2.direction.norm() - 1.0).abs() < 1e-12);
        }
        assert!(annihilation_cross_section(1.0) > annihilation_cross_section(10.0));
    }

    #[test]
    fn test_conversion_conserves_energy() {
        let mut rng = Ranluxpp::new(5);
        for _ in 0..200 {
            let (e, p) = sample_conversion(10.0, &z_axis(), &mut rng);
            assert!((e.energy + p.energy - (10.0 - 2.0 * ELECTRON_MASS_C2)).abs() < 1e-12);
            assert!(e.energy >= 0.0 && p.energy >= 0.0);
        }
    }

    #[test]
    fn test_ionization_directions_are_unit() {
        let mut rng = Ranluxpp::new(6);
        let (delta, primary) = sample_directions_ionization(1.0, 0.2, &z_axis(), &mut rng);
        assert!((delta.norm() - 1.0).abs() < 1e-12);
        assert!((primary.norm() - 1.0).abs() < 1e-12);
        // The delta ray and primary go to opposite sides of the incident axis.
        assert!(delta.x * primary.x + delta.y * primary.y < 0.0);
    }
}
