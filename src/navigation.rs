// Contract between the transport core and a geometry engine.

use crate::physics::UNLIMITED_STEP;
use nalgebra::Vector3;

/// Index of a volume in the geometry engine's arena.
pub type VolumeId = usize;

/// Opaque navigation state held by value inside each track.
///
/// The transport core only compares, swaps and queries these states; it never
/// builds one itself except through a [`Navigator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavState {
    volume: Option<VolumeId>,
    on_boundary: bool,
}

impl NavState {
    /// State inside `volume`, away from any boundary.
    pub fn inside(volume: VolumeId) -> Self {
        Self {
            volume: Some(volume),
            on_boundary: false,
        }
    }

    /// State reached by crossing a boundary into `volume`, or out of the
    /// world when `volume` is `None`.
    pub fn entering(volume: Option<VolumeId>) -> Self {
        Self {
            volume,
            on_boundary: true,
        }
    }

    /// State outside the modelled world.
    pub fn outside() -> Self {
        Self::default()
    }

    /// The innermost volume, or `None` once the particle left the world.
    pub fn top(&self) -> Option<VolumeId> {
        self.volume
    }

    pub fn is_on_boundary(&self) -> bool {
        self.on_boundary
    }

    /// Same volume with the boundary flag cleared.
    pub fn relocated(self) -> Self {
        Self {
            volume: self.volume,
            on_boundary: false,
        }
    }
}

/// Capabilities the transport core needs from a geometry engine.
pub trait Navigator: Sync {
    /// Locate the volume containing `position`.
    fn locate(&self, position: &Vector3<f64>) -> NavState;

    /// Distance along the straight line from `position` in `direction` until
    /// the first boundary of the current volume, capped at `max_step`.
    ///
    /// When no boundary lies within `max_step`, the returned distance is
    /// exactly `max_step` and the returned state is not on a boundary.
    /// Otherwise the returned state is the volume entered, flagged as on the
    /// boundary.
    fn compute_step_and_next_volume(
        &self,
        position: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_step: f64,
        current: &NavState,
    ) -> (f64, NavState);

    /// Longest move a single propagation may request.
    fn max_step(&self) -> f64 {
        UNLIMITED_STEP
    }

    /// Refresh `state` after a boundary crossing has been committed.
    fn relocate(&self, position: &Vector3<f64>, state: &mut NavState) {
        let _ = position;
        *state = state.relocated();
    }
}
