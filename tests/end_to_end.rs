// Whole-model scenarios with scripted physics, plus energy bookkeeping with
// the standard physics.

use emtransport::cell::Cell;
use emtransport::geometry::Geometry;
use emtransport::interactions::{Emission, Transfer};
use emtransport::physics::{
    PhysicsEngine, PhysicsTrack, StandardPhysics, COMPTON, IONIZATION, PHOTOELECTRIC,
};
use emtransport::ranluxpp::Ranluxpp;
use emtransport::region::Region;
use emtransport::source::IndependentSource;
use emtransport::surface::{BoundaryType, Surface};
use emtransport::track::ParticleKind;
use emtransport::units::{KEV, MEV, TESLA};
use emtransport::{Model, TransportConfig, TransportError};
use nalgebra::Vector3;
use std::sync::Arc;

/// One homogeneous volume: a vacuum-bounded ball.
fn homogeneous_ball(radius: f64) -> Geometry {
    let sphere =
        Arc::new(Surface::sphere(0.0, 0.0, 0.0, radius, 1).with_boundary(BoundaryType::Vacuum));
    Geometry::new(vec![Cell::new(1, Region::below(&sphere), None)]).unwrap()
}

fn config() -> TransportConfig {
    TransportConfig {
        track_capacity: 256,
        threads: Some(2),
        ..TransportConfig::default()
    }
}

/// Scripted outcomes: photons at the incident energy Compton scatter, softer
/// photons are absorbed, charged tracks stop on their first step or simply
/// drift.
struct Scripted {
    incident: f64,
    scattered: f64,
    charged_step: f64,
    charged_stop: bool,
    always_ionize: bool,
}

impl Scripted {
    fn compton_then_absorb(incident: f64, scattered: f64) -> Self {
        Self {
            incident,
            scattered,
            charged_step: 0.1,
            charged_stop: true,
            always_ionize: false,
        }
    }

    fn drift(step: f64) -> Self {
        Self {
            incident: f64::INFINITY,
            scattered: 0.0,
            charged_step: step,
            charged_stop: false,
            always_ionize: false,
        }
    }
}

impl PhysicsEngine for Scripted {
    fn how_far(&self, track: &mut PhysicsTrack) {
        track.mfp = [1.0; 3];
        if track.kind == ParticleKind::Gamma {
            track.geometric_step = 1.0;
            track.winner = if track.energy >= self.incident {
                Some(COMPTON)
            } else {
                Some(PHOTOELECTRIC)
            };
        } else {
            track.geometric_step = self.charged_step;
            track.winner = self.always_ionize.then_some(IONIZATION);
        }
    }

    fn perform_continuous(&self, track: &mut PhysicsTrack, _rng: &mut Ranluxpp) -> bool {
        track.energy_deposit = 0.0;
        if track.kind.is_charged() && self.charged_stop {
            track.energy_deposit = track.energy;
            track.energy = 0.0;
            return true;
        }
        false
    }

    fn check_delta(&self, _track: &PhysicsTrack, _u: f64) -> bool {
        false
    }

    fn production_cut(&self) -> f64 {
        1.0 * KEV
    }

    fn sample_ionization(
        &self,
        _kind: ParticleKind,
        energy: f64,
        _cut: f64,
        direction: &Vector3<f64>,
        _rng: &mut Ranluxpp,
    ) -> Transfer {
        Transfer {
            secondary: Emission {
                energy: 0.1 * energy,
                direction: *direction,
            },
            primary_direction: *direction,
        }
    }

    fn sample_bremsstrahlung(
        &self,
        _kind: ParticleKind,
        _energy: f64,
        _direction: &Vector3<f64>,
        _rng: &mut Ranluxpp,
    ) -> Transfer {
        unreachable!("bremsstrahlung is not scripted")
    }

    fn sample_annihilation(
        &self,
        _energy: f64,
        _direction: &Vector3<f64>,
        _rng: &mut Ranluxpp,
    ) -> (Emission, Emission) {
        unreachable!("annihilation is not scripted")
    }

    fn sample_conversion(
        &self,
        _energy: f64,
        _direction: &Vector3<f64>,
        _rng: &mut Ranluxpp,
    ) -> (Emission, Emission) {
        unreachable!("conversion is not scripted")
    }

    fn sample_compton(
        &self,
        _energy: f64,
        _direction: &Vector3<f64>,
        _rng: &mut Ranluxpp,
    ) -> Emission {
        Emission {
            energy: self.scattered,
            direction: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

#[test]
fn test_photon_compton_scatters_once_then_is_absorbed() {
    let incident = 1.0 * MEV;
    let scattered = 0.3 * MEV;
    let mut model = Model::new(
        config(),
        homogeneous_ball(100.0),
        Scripted::compton_then_absorb(incident, scattered),
    )
    .unwrap();
    model
        .add_primary(
            ParticleKind::Gamma,
            incident,
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, 1.0),
        )
        .unwrap();

    assert!(model.step().unwrap());
    let electrons = model.active_tracks(ParticleKind::Electron);
    assert_eq!(electrons.len(), 1);
    assert!((electrons[0].energy - (incident - scattered)).abs() < 1e-12);
    let gammas = model.active_tracks(ParticleKind::Gamma);
    assert_eq!(gammas.len(), 1);
    assert_eq!(gammas[0].energy, scattered);

    let summary = model.run().unwrap();
    assert!(model.is_finished());
    assert_eq!(summary.secondaries, 1);
    assert_eq!(summary.escaped, 0);
    assert!((summary.energy_deposit - incident).abs() < 1e-8);
}

#[test]
fn test_electron_without_field_moves_by_the_physics_step() {
    let mut model = Model::new(config(), homogeneous_ball(10.0), Scripted::drift(0.5)).unwrap();
    model
        .add_primary(
            ParticleKind::Electron,
            2.0 * MEV,
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, 1.0),
        )
        .unwrap();

    assert!(model.step().unwrap());
    let electrons = model.active_tracks(ParticleKind::Electron);
    assert_eq!(electrons.len(), 1);
    let track = &electrons[0];
    assert_eq!(track.current_state, track.next_state);
    assert_eq!(track.position, Vector3::new(0.0, 0.0, 0.5));
    assert_eq!(track.direction, Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(track.energy, 2.0 * MEV);
}

#[test]
fn test_drifting_electron_leaves_the_world() {
    // 0.3 does not divide the radius, so the surface is met mid-step.
    let mut model = Model::new(config(), homogeneous_ball(2.0), Scripted::drift(0.3)).unwrap();
    model
        .add_primary(
            ParticleKind::Electron,
            2.0 * MEV,
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
        )
        .unwrap();

    let summary = model.run().unwrap();
    assert_eq!(summary.hits, 1);
    assert_eq!(summary.escaped, 1);
    assert!((summary.escaped_energy - 2.0 * MEV).abs() < 1e-8);
    assert_eq!(summary.energy_deposit, 0.0);
}

#[test]
fn test_secondary_pool_exhaustion_halts_the_run() {
    let mut physics = Scripted::drift(0.01);
    physics.always_ionize = true;
    let cfg = TransportConfig {
        track_capacity: 4,
        ..config()
    };
    let mut model = Model::new(cfg, homogeneous_ball(100.0), physics).unwrap();
    model
        .add_primary(
            ParticleKind::Electron,
            10.0 * MEV,
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, 1.0),
        )
        .unwrap();

    let err = model.run().unwrap_err();
    assert!(
        matches!(
            err,
            TransportError::PoolExhausted {
                species: ParticleKind::Electron,
                capacity: 4
            }
        ),
        "unexpected error: {err}"
    );

    // The failed step is abandoned rather than left half-scheduled.
    let steps = model.steps();
    assert!(model.is_finished());
    for kind in ParticleKind::ALL {
        assert_eq!(model.active_len(kind), 0);
    }
    assert!(!model.step().unwrap());
    assert_eq!(model.steps(), steps + 1);
}

#[test]
fn test_energy_is_deposited_or_escapes() {
    let cfg = TransportConfig {
        bz: 1.0 * TESLA,
        track_capacity: 1 << 12,
        threads: Some(4),
        seed: 17,
        ..TransportConfig::default()
    };
    let inner = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 2.0, 1));
    let outer =
        Arc::new(Surface::sphere(0.0, 0.0, 0.0, 6.0, 2).with_boundary(BoundaryType::Vacuum));
    let geometry = Geometry::new(vec![
        Cell::new(1, Region::below(&inner), Some("core".to_string())),
        Cell::new(
            2,
            Region::above(&inner).intersection(&Region::below(&outer)),
            Some("shell".to_string()),
        ),
    ])
    .unwrap();

    let mut model = Model::new(cfg, geometry, StandardPhysics::default()).unwrap();
    // Below the pair threshold no rest mass is created or destroyed.
    let source = IndependentSource {
        energy: 0.9 * MEV,
        ..IndependentSource::new()
    };
    let n = 25;
    model
        .add_primaries_from(&source, n, &mut Ranluxpp::new(3))
        .unwrap();

    let summary = model.run().unwrap();
    assert!(model.is_finished());
    let total = summary.energy_deposit + summary.escaped_energy;
    assert!(
        (total - n as f64 * 0.9 * MEV).abs() < 1e-5,
        "deposited {} + escaped {}",
        summary.energy_deposit,
        summary.escaped_energy
    );
}
