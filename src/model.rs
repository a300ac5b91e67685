use crate::bank::{Secondaries, TrackPool};
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::navigation::Navigator;
use crate::physics::PhysicsEngine;
use crate::propagator::FieldPropagator;
use crate::queue::ActiveQueue;
use crate::scoring::{Scoring, ScoringSummary};
use crate::source::IndependentSource;
use crate::track::{ParticleKind, Track};
use crate::transport::Transport;
use crate::units::TESLA;
use log::{debug, error, info, warn};
use nalgebra::Vector3;
use rand::Rng;

/// Owns the track pools and active lists of a run and drives the per-species
/// transport kernels, one step at a time.
pub struct Model<N, P> {
    pub config: TransportConfig,
    navigator: N,
    physics: P,
    propagator: FieldPropagator,
    pools: [TrackPool; 3],
    active: [ActiveQueue; 3],
    next: [ActiveQueue; 3],
    scoring: Scoring,
    workers: rayon::ThreadPool,
    primaries: u64,
    steps: usize,
}

impl<N: Navigator, P: PhysicsEngine> Model<N, P> {
    pub fn new(config: TransportConfig, navigator: N, physics: P) -> Result<Self, TransportError> {
        config.validate()?;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let workers = builder
            .build()
            .map_err(|e| TransportError::WorkerPool(e.to_string()))?;

        let capacity = config.track_capacity;
        Ok(Self {
            propagator: FieldPropagator::new(config.bz * TESLA, config.propagator),
            pools: ParticleKind::ALL.map(|kind| TrackPool::new(kind, capacity)),
            active: ParticleKind::ALL.map(|_| ActiveQueue::new(capacity)),
            next: ParticleKind::ALL.map(|_| ActiveQueue::new(capacity)),
            scoring: Scoring::new(),
            workers,
            primaries: 0,
            steps: 0,
            config,
            navigator,
            physics,
        })
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn scoring(&self) -> ScoringSummary {
        self.scoring.snapshot()
    }

    /// Steps taken since the model was built.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn primaries(&self) -> u64 {
        self.primaries
    }

    /// Tracks of `kind` scheduled for the next step.
    pub fn active_len(&self, kind: ParticleKind) -> usize {
        self.active[kind.index()].len()
    }

    /// Copies of the tracks of `kind` scheduled for the next step.
    pub fn active_tracks(&mut self, kind: ParticleKind) -> Vec<Track> {
        let k = kind.index();
        let slots = self.active[k].to_vec();
        let pool = &mut self.pools[k];
        slots.into_iter().map(|slot| pool.get_mut(slot).clone()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.active.iter().all(ActiveQueue::is_empty)
    }

    /// Schedule a primary. Its stream is seeded with `config.seed` plus the
    /// number of primaries added before it.
    pub fn add_primary(
        &mut self,
        kind: ParticleKind,
        energy: f64,
        position: Vector3<f64>,
        direction: Vector3<f64>,
    ) -> Result<usize, TransportError> {
        if !(energy.is_finite() && energy >= 0.0) {
            return Err(TransportError::InvalidPrimary(format!(
                "kinetic energy {energy} is not a finite non-negative number"
            )));
        }
        let norm = direction.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(TransportError::InvalidPrimary(format!(
                "direction {:?} cannot be normalized",
                direction
            )));
        }

        let state = self.navigator.locate(&position);
        if state.top().is_none() {
            return Err(TransportError::PrimaryOutsideWorld {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }

        let seed = self.config.seed.wrapping_add(self.primaries);
        let track = Track::new(seed, energy, position, direction, state);
        let k = kind.index();
        let slot = self.pools[k].allocate(track)?;
        self.active[k]
            .push(slot)
            .map_err(|e| TransportError::QueueFull {
                species: kind,
                capacity: e.capacity,
            })?;
        self.primaries += 1;
        Ok(slot)
    }

    /// Schedule `n` primaries drawn from `source`.
    pub fn add_primaries_from<R: Rng + ?Sized>(
        &mut self,
        source: &IndependentSource,
        n: usize,
        rng: &mut R,
    ) -> Result<(), TransportError> {
        for _ in 0..n {
            let primary = source.sample(rng);
            self.add_primary(
                primary.kind,
                primary.energy,
                primary.position,
                primary.direction,
            )?;
        }
        Ok(())
    }

    /// Advance every scheduled track by one step. Returns whether any track is
    /// left for another step.
    ///
    /// A failed step cannot be replayed: its tracks were already partly
    /// advanced. On error every active list is emptied, so the model reports
    /// itself finished and later calls do nothing.
    pub fn step(&mut self) -> Result<bool, TransportError> {
        if let Err(e) = self.run_kernels() {
            error!("step {} failed, abandoning the run: {}", self.steps + 1, e);
            for queue in self.active.iter_mut().chain(self.next.iter_mut()) {
                queue.clear();
            }
            for (pool, queue) in self.pools.iter_mut().zip(self.active.iter_mut()) {
                pool.compact(queue)?;
            }
            return Err(e);
        }

        std::mem::swap(&mut self.active, &mut self.next);
        for queue in self.next.iter_mut() {
            queue.clear();
        }
        for (pool, queue) in self.pools.iter_mut().zip(self.active.iter_mut()) {
            pool.compact(queue)?;
        }
        self.steps += 1;

        debug!(
            "step {}: {} electrons, {} positrons, {} gammas active",
            self.steps,
            self.active[0].len(),
            self.active[1].len(),
            self.active[2].len()
        );
        Ok(!self.is_finished())
    }

    fn run_kernels(&self) -> Result<(), TransportError> {
        let transport = Transport {
            navigator: &self.navigator,
            physics: &self.physics,
            propagator: &self.propagator,
            secondaries: Secondaries::new(&self.pools, &self.next),
            scoring: &self.scoring,
            push: self.config.propagator.push,
        };
        let active = &self.active;
        let transport = &transport;
        self.workers.install(|| {
            let (electrons, (positrons, gammas)) = rayon::join(
                || transport.run_kernel(ParticleKind::Electron, &active[0]),
                || {
                    rayon::join(
                        || transport.run_kernel(ParticleKind::Positron, &active[1]),
                        || transport.run_kernel(ParticleKind::Gamma, &active[2]),
                    )
                },
            );
            electrons.and(positrons).and(gammas)
        })
    }

    /// Step until no track is left or `config.max_steps` steps have been
    /// taken in this call.
    pub fn run(&mut self) -> Result<ScoringSummary, TransportError> {
        info!(
            "Starting transport of {} primaries (Bz = {} T, {} workers)",
            self.primaries,
            self.propagator.bz() / TESLA,
            self.workers.current_num_threads()
        );

        let mut taken = 0;
        while !self.is_finished() {
            if taken >= self.config.max_steps {
                warn!(
                    "stopping after {} steps with {} tracks still alive",
                    taken,
                    self.active.iter().map(ActiveQueue::len).sum::<usize>()
                );
                break;
            }
            self.step()?;
            taken += 1;
        }

        let summary = self.scoring.snapshot();
        info!("Transport finished after {} steps\n{}", taken, summary);
        Ok(summary)
    }
}
