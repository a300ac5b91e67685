//! Physics-engine contract used by the transport step, and a standard
//! electromagnetic engine for a single homogeneous medium.

use crate::interactions::{
    annihilation_cross_section, bremsstrahlung_cross_section, compton_cross_section,
    ionization_cross_section, rotate_direction_3d, sample_annihilation_in_flight,
    sample_compton, sample_conversion, sample_directions_bremsstrahlung,
    sample_directions_ionization, sample_energy_transfer_bremsstrahlung,
    sample_energy_transfer_ionization, Emission, Transfer,
};
use crate::ranluxpp::Ranluxpp;
use crate::track::{ParticleKind, NUM_PROCESSES};
use crate::units::{CM, ELECTRON_MASS_C2, KEV, MEV, MM};
use crate::utilities::interpolate_log_log;
use nalgebra::Vector3;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Step proposed when no process can limit a neutral track.
pub const UNLIMITED_STEP: f64 = 1.0e20 * CM;

/// Process channels of charged tracks.
pub const IONIZATION: usize = 0;
pub const BREMSSTRAHLUNG: usize = 1;
pub const ANNIHILATION: usize = 2;

/// Process channels of photons.
pub const CONVERSION: usize = 0;
pub const COMPTON: usize = 1;
pub const PHOTOELECTRIC: usize = 2;

/// The per-step view of a track exchanged with a [`PhysicsEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsTrack {
    pub kind: ParticleKind,
    /// Kinetic energy.
    pub energy: f64,
    pub direction: Vector3<f64>,
    pub num_ia_left: [f64; NUM_PROCESSES],
    /// Geometric step: proposed by `how_far`, then set to the distance travelled.
    pub geometric_step: f64,
    /// Discrete process limiting the step, if any.
    pub winner: Option<usize>,
    pub on_boundary: bool,
    /// Energy deposited by the last `perform_continuous`.
    pub energy_deposit: f64,
    /// Mean free path per channel at the pre-step energy.
    pub mfp: [f64; NUM_PROCESSES],
}

impl PhysicsTrack {
    pub fn new(
        kind: ParticleKind,
        energy: f64,
        direction: Vector3<f64>,
        num_ia_left: [f64; NUM_PROCESSES],
    ) -> Self {
        Self {
            kind,
            energy,
            direction,
            num_ia_left,
            geometric_step: 0.0,
            winner: None,
            on_boundary: false,
            energy_deposit: 0.0,
            mfp: [f64::INFINITY; NUM_PROCESSES],
        }
    }
}

/// Capabilities the transport step needs from a physics engine.
///
/// Random numbers come from the track's own stream so results do not depend
/// on which worker runs the step.
pub trait PhysicsEngine: Sync {
    /// Set `geometric_step`, `winner` and `mfp` from the track's energy and
    /// its `num_ia_left`, all of which are positive on entry.
    fn how_far(&self, track: &mut PhysicsTrack);

    /// Apply continuous effects over `geometric_step`: energy loss, deflection
    /// and the reduction of `num_ia_left`. Returns whether the track stopped.
    fn perform_continuous(&self, track: &mut PhysicsTrack, rng: &mut Ranluxpp) -> bool;

    /// Whether the discrete interaction chosen by `how_far` is rejected as a
    /// delta interaction, given a uniform draw `u`.
    fn check_delta(&self, track: &PhysicsTrack, u: f64) -> bool;

    /// Production threshold for delta rays.
    fn production_cut(&self) -> f64;

    /// Delta ray from ionisation by an electron or positron.
    fn sample_ionization(
        &self,
        kind: ParticleKind,
        energy: f64,
        cut: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> Transfer;

    /// Photon from bremsstrahlung.
    fn sample_bremsstrahlung(
        &self,
        kind: ParticleKind,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> Transfer;

    /// Two photons from positron annihilation in flight.
    fn sample_annihilation(
        &self,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> (Emission, Emission);

    /// Electron and positron, in that order, from pair conversion.
    fn sample_conversion(
        &self,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> (Emission, Emission);

    /// Scattered photon from Compton scattering.
    fn sample_compton(&self, energy: f64, direction: &Vector3<f64>, rng: &mut Ranluxpp)
        -> Emission;
}

/// A macroscopic cross section tabulated in energy, interpolated log-log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionTable {
    /// Energies in MeV, increasing.
    pub energy: Vec<f64>,
    /// Cross sections in 1/cm.
    pub value: Vec<f64>,
}

impl CrossSectionTable {
    pub fn evaluate(&self, energy: f64) -> f64 {
        if self.energy.is_empty() || energy < self.energy[0] {
            return 0.0;
        }
        interpolate_log_log(&self.energy, &self.value, energy)
    }
}

/// Medium and model parameters of [`StandardPhysics`]; defaults describe water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Electrons per cm^3.
    pub electron_density: f64,
    pub radiation_length: f64,
    /// Restricted stopping power in MeV/cm, taken as constant.
    pub stopping_power: f64,
    /// Delta rays below this kinetic energy are part of the continuous loss.
    pub production_cut: f64,
    /// Bremsstrahlung photons below this energy are part of the continuous loss.
    pub brems_cut: f64,
    /// Charged tracks below this energy stop and deposit what is left.
    pub tracking_cut: f64,
    /// Largest step as a fraction of the remaining range.
    pub range_fraction: f64,
    /// Below this range the whole range is taken in one step.
    pub final_range: f64,
    pub multiple_scattering: bool,
    pub photoelectric: CrossSectionTable,
    pub conversion: CrossSectionTable,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            electron_density: 3.343e23,
            radiation_length: 36.08 * CM,
            stopping_power: 2.0 * MEV / CM,
            production_cut: 100.0 * KEV,
            brems_cut: 10.0 * KEV,
            tracking_cut: 10.0 * KEV,
            range_fraction: 0.2,
            final_range: 1.0 * MM,
            multiple_scattering: true,
            photoelectric: CrossSectionTable {
                energy: vec![1.0e-3, 1.0e-2, 3.0e-2, 1.0e-1, 1.0, 10.0],
                value: vec![4.0e3, 4.94, 1.5e-1, 2.8e-3, 1.0e-6, 1.0e-8],
            },
            conversion: CrossSectionTable {
                energy: vec![2.0 * ELECTRON_MASS_C2, 1.5, 2.0, 10.0, 100.0, 1000.0],
                value: vec![1.0e-9, 1.0e-5, 4.0e-5, 4.9e-3, 1.55e-2, 2.05e-2],
            },
        }
    }
}

/// Electromagnetic physics for one homogeneous medium.
#[derive(Debug, Clone, Default)]
pub struct StandardPhysics {
    pub settings: PhysicsSettings,
}

impl StandardPhysics {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self { settings }
    }

    /// Macroscopic cross section of channel `process` in 1/cm.
    pub fn macroscopic_cross_section(&self, kind: ParticleKind, energy: f64, process: usize) -> f64 {
        let s = &self.settings;
        match (kind, process) {
            (ParticleKind::Gamma, CONVERSION) => s.conversion.evaluate(energy),
            (ParticleKind::Gamma, COMPTON) => s.electron_density * compton_cross_section(energy),
            (ParticleKind::Gamma, PHOTOELECTRIC) => s.photoelectric.evaluate(energy),
            (_, IONIZATION) => {
                s.electron_density
                    * ionization_cross_section(
                        energy,
                        s.production_cut,
                        kind == ParticleKind::Electron,
                    )
            }
            (_, BREMSSTRAHLUNG) => {
                bremsstrahlung_cross_section(energy, s.brems_cut, s.radiation_length)
            }
            (ParticleKind::Positron, ANNIHILATION) => {
                s.electron_density * annihilation_cross_section(energy)
            }
            _ => 0.0,
        }
    }

    /// Step allowed by continuous energy loss.
    fn continuous_step_limit(&self, energy: f64) -> f64 {
        let s = &self.settings;
        let range = energy / s.stopping_power;
        if range > s.final_range {
            (s.range_fraction * range).max(s.final_range)
        } else {
            range
        }
    }

    /// Highland width of the projected scattering angle.
    fn highland_theta0(&self, energy: f64, step: f64) -> f64 {
        let momentum = (energy * (energy + 2.0 * ELECTRON_MASS_C2)).sqrt();
        let beta = momentum / (energy + ELECTRON_MASS_C2);
        let t = step / self.settings.radiation_length;
        let log_term = (1.0 + 0.038 * t.ln()).max(0.0);
        13.6 * MEV / (beta * momentum) * t.sqrt() * log_term
    }
}

impl PhysicsEngine for StandardPhysics {
    fn how_far(&self, track: &mut PhysicsTrack) {
        let mut best_step = f64::INFINITY;
        let mut winner = None;
        for process in 0..NUM_PROCESSES {
            let xs = self.macroscopic_cross_section(track.kind, track.energy, process);
            track.mfp[process] = if xs > 0.0 { 1.0 / xs } else { f64::INFINITY };
            let distance = track.num_ia_left[process] * track.mfp[process];
            if distance < best_step {
                best_step = distance;
                winner = Some(process);
            }
        }

        if track.kind.is_charged() {
            let limit = self.continuous_step_limit(track.energy);
            if limit < best_step {
                best_step = limit;
                winner = None;
            }
        }

        track.geometric_step = best_step.min(UNLIMITED_STEP);
        track.winner = winner;
        track.on_boundary = false;
        track.energy_deposit = 0.0;
    }

    fn perform_continuous(&self, track: &mut PhysicsTrack, rng: &mut Ranluxpp) -> bool {
        let step = track.geometric_step;
        for process in 0..NUM_PROCESSES {
            if track.mfp[process].is_finite() {
                track.num_ia_left[process] -= step / track.mfp[process];
            }
        }
        track.energy_deposit = 0.0;

        if !track.kind.is_charged() {
            return false;
        }

        let s = &self.settings;
        let loss = s.stopping_power * step;
        if track.energy - loss <= s.tracking_cut {
            track.energy_deposit = track.energy;
            track.energy = 0.0;
            return true;
        }

        if s.multiple_scattering && step > 0.0 {
            let theta0 = self.highland_theta0(track.energy, step);
            if theta0 > 0.0 {
                if let Ok(normal) = Normal::new(0.0, theta0) {
                    let theta_x = normal.sample(rng);
                    let theta_y = normal.sample(rng);
                    let theta = theta_x.hypot(theta_y).min(std::f64::consts::PI);
                    let phi = theta_y.atan2(theta_x);
                    track.direction = rotate_direction_3d(&track.direction, theta.cos(), phi);
                }
            }
        }

        track.energy -= loss;
        track.energy_deposit = loss;
        false
    }

    fn check_delta(&self, track: &PhysicsTrack, u: f64) -> bool {
        let Some(process) = track.winner else {
            return false;
        };
        let pre = 1.0 / track.mfp[process];
        let post = self.macroscopic_cross_section(track.kind, track.energy, process);
        u * pre > post
    }

    fn production_cut(&self) -> f64 {
        self.settings.production_cut
    }

    fn sample_ionization(
        &self,
        kind: ParticleKind,
        energy: f64,
        cut: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> Transfer {
        let is_electron = kind == ParticleKind::Electron;
        let delta = sample_energy_transfer_ionization(energy, cut, is_electron, rng);
        let (delta_dir, primary_dir) = sample_directions_ionization(energy, delta, direction, rng);
        Transfer {
            secondary: Emission {
                energy: delta,
                direction: delta_dir,
            },
            primary_direction: primary_dir,
        }
    }

    fn sample_bremsstrahlung(
        &self,
        _kind: ParticleKind,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> Transfer {
        let k = sample_energy_transfer_bremsstrahlung(energy, self.settings.brems_cut, rng);
        let (photon_dir, primary_dir) = sample_directions_bremsstrahlung(energy, k, direction, rng);
        Transfer {
            secondary: Emission {
                energy: k,
                direction: photon_dir,
            },
            primary_direction: primary_dir,
        }
    }

    fn sample_annihilation(
        &self,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> (Emission, Emission) {
        sample_annihilation_in_flight(energy, direction, rng)
    }

    fn sample_conversion(
        &self,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> (Emission, Emission) {
        sample_conversion(energy, direction, rng)
    }

    fn sample_compton(
        &self,
        energy: f64,
        direction: &Vector3<f64>,
        rng: &mut Ranluxpp,
    ) -> Emission {
        sample_compton(energy, direction, rng)
    }
}
