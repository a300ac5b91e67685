//! Propagation in a constant Bz field with boundary-chord iteration.
//!
//! Charged tracks follow the exact helix in pieces short enough that the chord
//! between the ends of a piece stays within the deflection tolerance of the
//! curve. The geometry is queried along each chord; when it reports a boundary
//! the crossing point is taken on the chord.

use crate::config::PropagatorSettings;
use crate::helix::HelixStepper;
use crate::navigation::{NavState, Navigator};
use crate::track::ParticleKind;
use crate::units::B2C;
use nalgebra::Vector3;

/// Outcome of one call to [`FieldPropagator::propagate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagation {
    /// Arc length actually travelled.
    pub step: f64,
    /// State after the move; on a boundary if one stopped the track.
    pub next_state: NavState,
    /// Chords tried (zero for straight-line moves).
    pub chord_iterations: u32,
    /// The iteration cap ended the search before the step was used up.
    pub cap_reached: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldPropagator {
    stepper: HelixStepper,
    settings: PropagatorSettings,
}

impl FieldPropagator {
    pub fn new(bz: f64, settings: PropagatorSettings) -> Self {
        Self {
            stepper: HelixStepper::new(bz),
            settings,
        }
    }

    pub fn bz(&self) -> f64 {
        self.stepper.bz
    }

    /// Move a track of `kind` and kinetic `energy` by up to `step`, stopping at
    /// the first boundary. `position` and `direction` are updated in place.
    pub fn propagate<N: Navigator + ?Sized>(
        &self,
        navigator: &N,
        kind: ParticleKind,
        energy: f64,
        step: f64,
        position: &mut Vector3<f64>,
        direction: &mut Vector3<f64>,
        current: &NavState,
    ) -> Propagation {
        // An unlimited physics step would make the chord floor infinite.
        let step = step.min(navigator.max_step()).max(0.0);
        let charge = kind.charge();
        let mass = kind.mass();
        let momentum = (energy * (energy + 2.0 * mass)).sqrt();
        // Only the transverse momentum bends.
        let momentum_xy = momentum * ((1.0 - direction.z) * (1.0 + direction.z)).max(0.0).sqrt();
        let curvature = (B2C * charge * self.stepper.bz).abs() / (momentum_xy + 1.0e-30);

        if curvature == 0.0 || momentum_xy == 0.0 || step <= 0.0 {
            return self.straight(navigator, step, position, direction, current);
        }

        let safe_length = (2.0 * self.settings.deflection_tolerance / curvature).sqrt();
        let epsilon_step = self.settings.min_step_fraction * step;
        let max_iterations = self.settings.max_chord_iterations;

        let mut step_done = 0.0;
        let mut remains = step;
        let mut next_state = current.relocated();
        let mut iterations = 0u32;
        let mut full_chord;

        loop {
            let safe_move = remains.min(safe_length);
            let (end_position, end_direction) =
                self.stepper
                    .do_step(charge, momentum, safe_move, position, direction);

            let chord = end_position - *position;
            let chord_len = chord.norm();
            let mut moved;
            if chord_len > 0.0 {
                let chord_dir = chord / chord_len;
                let (distance, state) =
                    navigator.compute_step_and_next_volume(position, &chord_dir, chord_len, current);
                next_state = state;
                moved = distance;
                full_chord = moved == chord_len;
                if full_chord {
                    *position = end_position;
                    *direction = end_direction;
                    moved = safe_move;
                } else {
                    // The crossing is taken on the chord, not on the helix.
                    *position += chord_dir * moved;
                    let fraction = moved / chord_len;
                    let blended = *direction * (1.0 - fraction) + end_direction * fraction;
                    *direction = blended
                        .try_normalize(f64::MIN_POSITIVE)
                        .unwrap_or(end_direction);
                }
            } else {
                // Degenerate chord: nothing to search along.
                *position = end_position;
                *direction = end_direction;
                moved = safe_move;
                full_chord = true;
            }

            step_done += moved;
            remains -= moved;
            iterations += 1;

            if next_state.is_on_boundary()
                || !full_chord
                || remains <= epsilon_step
                || iterations >= max_iterations
            {
                break;
            }
        }

        let cap_reached = iterations >= max_iterations
            && full_chord
            && !next_state.is_on_boundary()
            && remains > epsilon_step;

        Propagation {
            step: step_done,
            next_state,
            chord_iterations: iterations,
            cap_reached,
        }
    }

    /// Straight-line move with a single navigator query.
    fn straight<N: Navigator + ?Sized>(
        &self,
        navigator: &N,
        step: f64,
        position: &mut Vector3<f64>,
        direction: &Vector3<f64>,
        current: &NavState,
    ) -> Propagation {
        let (distance, next_state) =
            navigator.compute_step_and_next_volume(position, direction, step, current);
        *position += direction * distance;
        Propagation {
            step: distance,
            next_state,
            chord_iterations: 0,
            cap_reached: false,
        }
    }
}
