//! One transport step per track, expressed as an explicit state transition.
//!
//! A step asks the physics engine for a step length, moves the track through
//! the field and geometry, applies continuous effects and then resolves what
//! happens to the track: it continues, it sits on a boundary, or it dies.
//! Tracks created on the way go straight into the next active lists of their
//! species.

use crate::bank::Secondaries;
use crate::error::TransportError;
use crate::navigation::Navigator;
use crate::physics::{
    PhysicsEngine, PhysicsTrack, ANNIHILATION, BREMSSTRAHLUNG, COMPTON, CONVERSION, IONIZATION,
    PHOTOELECTRIC,
};
use crate::propagator::FieldPropagator;
use crate::queue::ActiveQueue;
use crate::scoring::Scoring;
use crate::track::{ParticleKind, Track, TrackStatus};
use crate::units::{ELECTRON_MASS_C2, EV, TWO_PI};
use log::trace;
use nalgebra::Vector3;
use rayon::prelude::*;

/// Below this energy Compton scattering is not simulated and the products
/// are deposited locally.
pub const COMPTON_ENERGY_FLOOR: f64 = 100.0 * EV;

/// What a step did with the track in `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still in the bulk of a volume; scheduled for the next step.
    Continue(usize),
    /// Stopped on a boundary; relocated and scheduled for the next step.
    CrossBoundary(usize),
    /// Dead or out of the world; not scheduled again.
    Terminate(usize),
}

impl Transition {
    pub fn slot(self) -> usize {
        match self {
            Transition::Continue(slot)
            | Transition::CrossBoundary(slot)
            | Transition::Terminate(slot) => slot,
        }
    }

    pub fn is_alive(self) -> bool {
        !matches!(self, Transition::Terminate(_))
    }
}

/// Everything a step reads or updates besides the track itself.
pub struct Transport<'a, N: ?Sized, P: ?Sized> {
    pub navigator: &'a N,
    pub physics: &'a P,
    pub propagator: &'a FieldPropagator,
    pub secondaries: Secondaries<'a>,
    pub scoring: &'a Scoring,
    /// Distance moved past an accepted boundary crossing.
    pub push: f64,
}

impl<'a, N, P> Transport<'a, N, P>
where
    N: Navigator + ?Sized,
    P: PhysicsEngine + ?Sized,
{
    /// Run the step of every track in `active` on the current rayon pool,
    /// appending survivors to the next active list of `kind`.
    pub fn run_kernel(&self, kind: ParticleKind, active: &ActiveQueue) -> Result<(), TransportError> {
        let lane = self.secondaries.lane(kind);
        (0..active.len()).into_par_iter().try_for_each(|i| {
            let slot = active.get(i);
            let transition = {
                let mut track = lane.pool.lock(slot);
                self.step(kind, slot, &mut track)?
            };
            match transition {
                Transition::Continue(slot) | Transition::CrossBoundary(slot) => lane
                    .next
                    .push(slot)
                    .map_err(|e| TransportError::QueueFull {
                        species: kind,
                        capacity: e.capacity,
                    }),
                Transition::Terminate(_) => Ok(()),
            }
        })
    }

    /// Advance the track held in `slot` by one step.
    pub fn step(
        &self,
        kind: ParticleKind,
        slot: usize,
        track: &mut Track,
    ) -> Result<Transition, TransportError> {
        if track.status == TrackStatus::Dead {
            return Ok(Transition::Terminate(slot));
        }
        if track.status == TrackStatus::OnBoundary {
            self.navigator
                .relocate(&track.position, &mut track.current_state);
            track.status = TrackStatus::Propagating;
        }

        if track.current_state.top().is_none() {
            trace!("{kind} in slot {slot} left the world at {:?}", track.position);
            let carried = track.kill();
            self.scoring.add_escaped(carried);
            return Ok(Transition::Terminate(slot));
        }

        for n in track.num_ia_left.iter_mut() {
            if *n <= 0.0 {
                *n = interaction_lengths(track.rng.uniform());
            }
        }

        let mut physics_track =
            PhysicsTrack::new(kind, track.energy, track.direction, track.num_ia_left);
        self.physics.how_far(&mut physics_track);

        let propagation = self.propagator.propagate(
            self.navigator,
            kind,
            track.energy,
            physics_track.geometric_step,
            &mut track.position,
            &mut track.direction,
            &track.current_state,
        );
        track.next_state = propagation.next_state;
        if propagation.cap_reached {
            trace!(
                "{kind} in slot {slot} hit the chord iteration cap after {} cm",
                propagation.step
            );
            self.scoring.add_chord_limit_hit();
        }

        let on_boundary = propagation.next_state.is_on_boundary();
        physics_track.geometric_step = propagation.step;
        physics_track.on_boundary = on_boundary;
        physics_track.direction = track.direction;

        let stopped = self
            .physics
            .perform_continuous(&mut physics_track, &mut track.rng);
        track.energy = physics_track.energy;
        track.direction = physics_track.direction;
        track.num_ia_left = physics_track.num_ia_left;
        self.scoring.add_energy_deposit(physics_track.energy_deposit);

        if stopped {
            return self.stop(kind, slot, track);
        }

        if on_boundary {
            self.scoring.add_hit();
            std::mem::swap(&mut track.current_state, &mut track.next_state);
            track.position += track.direction * self.push;
            track.status = TrackStatus::OnBoundary;
            return Ok(Transition::CrossBoundary(slot));
        }

        let Some(winner) = physics_track.winner else {
            return Ok(Transition::Continue(slot));
        };
        track.num_ia_left[winner] = -1.0;

        if kind.is_charged() {
            if self
                .physics
                .check_delta(&physics_track, track.rng.uniform())
            {
                return Ok(Transition::Continue(slot));
            }
            self.charged_interaction(kind, winner, slot, track)
        } else {
            self.photon_interaction(winner, slot, track)
        }
    }

    fn spawn(
        &self,
        kind: ParticleKind,
        parent: &mut Track,
        energy: f64,
        direction: Vector3<f64>,
    ) -> Result<(), TransportError> {
        let secondary = Track::secondary_of(parent, energy, direction);
        self.secondaries.next_track(kind, secondary)?;
        self.scoring.add_secondaries(1);
        Ok(())
    }

    /// End a track that has no kinetic energy left to transport. Positrons
    /// annihilate at rest; any residual energy is deposited.
    fn stop(
        &self,
        kind: ParticleKind,
        slot: usize,
        track: &mut Track,
    ) -> Result<Transition, TransportError> {
        if kind == ParticleKind::Positron {
            self.annihilate_at_rest(track)?;
        }
        let residual = track.kill();
        self.scoring.add_energy_deposit(residual);
        Ok(Transition::Terminate(slot))
    }

    /// Continue after a discrete energy loss, unless nothing is left.
    fn after_loss(
        &self,
        kind: ParticleKind,
        slot: usize,
        track: &mut Track,
    ) -> Result<Transition, TransportError> {
        if track.energy <= 0.0 {
            track.energy = 0.0;
            return self.stop(kind, slot, track);
        }
        Ok(Transition::Continue(slot))
    }

    /// Two back-to-back photons of `m_e c^2` in an isotropic direction.
    fn annihilate_at_rest(&self, track: &mut Track) -> Result<(), TransportError> {
        let cost = 2.0 * track.rng.uniform() - 1.0;
        let sint = ((1.0 - cost) * (1.0 + cost)).sqrt();
        let phi = TWO_PI * track.rng.uniform();
        let direction = Vector3::new(sint * phi.cos(), sint * phi.sin(), cost);
        self.spawn(ParticleKind::Gamma, track, ELECTRON_MASS_C2, direction)?;
        self.spawn(ParticleKind::Gamma, track, ELECTRON_MASS_C2, -direction)
    }

    fn charged_interaction(
        &self,
        kind: ParticleKind,
        process: usize,
        slot: usize,
        track: &mut Track,
    ) -> Result<Transition, TransportError> {
        match process {
            IONIZATION => {
                let cut = self.physics.production_cut();
                let transfer = self.physics.sample_ionization(
                    kind,
                    track.energy,
                    cut,
                    &track.direction,
                    &mut track.rng,
                );
                let delta = transfer.secondary;
                self.spawn(ParticleKind::Electron, track, delta.energy, delta.direction)?;
                track.energy -= delta.energy;
                track.direction = transfer.primary_direction;
                self.after_loss(kind, slot, track)
            }
            BREMSSTRAHLUNG => {
                let transfer = self.physics.sample_bremsstrahlung(
                    kind,
                    track.energy,
                    &track.direction,
                    &mut track.rng,
                );
                let photon = transfer.secondary;
                self.spawn(ParticleKind::Gamma, track, photon.energy, photon.direction)?;
                track.energy -= photon.energy;
                track.direction = transfer.primary_direction;
                self.after_loss(kind, slot, track)
            }
            ANNIHILATION => {
                let (first, second) =
                    self.physics
                        .sample_annihilation(track.energy, &track.direction, &mut track.rng);
                self.spawn(ParticleKind::Gamma, track, first.energy, first.direction)?;
                self.spawn(ParticleKind::Gamma, track, second.energy, second.direction)?;
                track.kill();
                Ok(Transition::Terminate(slot))
            }
            _ => Ok(Transition::Continue(slot)),
        }
    }

    fn photon_interaction(
        &self,
        process: usize,
        slot: usize,
        track: &mut Track,
    ) -> Result<Transition, TransportError> {
        let energy = track.energy;
        match process {
            CONVERSION => {
                if energy < 2.0 * ELECTRON_MASS_C2 {
                    return Ok(Transition::Continue(slot));
                }
                let (electron, positron) =
                    self.physics
                        .sample_conversion(energy, &track.direction, &mut track.rng);
                self.spawn(ParticleKind::Electron, track, electron.energy, electron.direction)?;
                self.spawn(ParticleKind::Positron, track, positron.energy, positron.direction)?;
                track.kill();
                Ok(Transition::Terminate(slot))
            }
            COMPTON => {
                if energy < COMPTON_ENERGY_FLOOR {
                    return Ok(Transition::Continue(slot));
                }
                let scattered =
                    self.physics
                        .sample_compton(energy, &track.direction, &mut track.rng);

                let electron_energy = energy - scattered.energy;
                if electron_energy > COMPTON_ENERGY_FLOOR {
                    let direction = energy * track.direction - scattered.energy * scattered.direction;
                    self.spawn(
                        ParticleKind::Electron,
                        track,
                        electron_energy,
                        direction.normalize(),
                    )?;
                } else {
                    self.scoring.add_energy_deposit(electron_energy);
                }

                if scattered.energy > COMPTON_ENERGY_FLOOR {
                    track.energy = scattered.energy;
                    track.direction = scattered.direction;
                    Ok(Transition::Continue(slot))
                } else {
                    track.energy = scattered.energy;
                    let residual = track.kill();
                    self.scoring.add_energy_deposit(residual);
                    Ok(Transition::Terminate(slot))
                }
            }
            PHOTOELECTRIC => {
                let residual = track.kill();
                self.scoring.add_energy_deposit(residual);
                Ok(Transition::Terminate(slot))
            }
            _ => Ok(Transition::Continue(slot)),
        }
    }
}

/// Number of mean free paths to the next interaction for a uniform draw in
/// [0, 1). Finite and positive for every draw.
fn interaction_lengths(u: f64) -> f64 {
    (-(1.0 - u).ln()).max(f64::MIN_POSITIVE)
}
