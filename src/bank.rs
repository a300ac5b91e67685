// Track storage for the three species.
//
// Each species owns a fixed pool of track slots. New tracks (primaries and
// secondaries) take the next free slot from a bounded atomic bump allocator;
// between steps the scheduler compacts the live slots to the front so the
// pool can be reused.

use crate::error::TransportError;
use crate::queue::{ActiveQueue, SlotAllocator};
use crate::track::{ParticleKind, Track};
use std::sync::{Mutex, MutexGuard};

/// Fixed-capacity storage for the tracks of one species.
#[derive(Debug)]
pub struct TrackPool {
    kind: ParticleKind,
    slots: Vec<Mutex<Track>>,
    allocator: SlotAllocator,
}

impl TrackPool {
    pub fn new(kind: ParticleKind, capacity: usize) -> Self {
        Self {
            kind,
            slots: (0..capacity).map(|_| Mutex::new(Track::default())).collect(),
            allocator: SlotAllocator::new(capacity),
        }
    }

    pub fn kind(&self) -> ParticleKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Slots handed out since the last compaction.
    pub fn used(&self) -> usize {
        self.allocator.used()
    }

    /// Store `track` in a fresh slot and return the slot index.
    pub fn allocate(&self, track: Track) -> Result<usize, TransportError> {
        let slot = self
            .allocator
            .reserve()
            .map_err(|e| TransportError::PoolExhausted {
                species: self.kind,
                capacity: e.capacity,
            })?;
        *self.lock(slot) = track;
        Ok(slot)
    }

    /// Lock one slot. A poisoned slot is recovered; the track data is plain.
    pub fn lock(&self, slot: usize) -> MutexGuard<'_, Track> {
        self.slots[slot].lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Track {
        self.slots[slot].get_mut().unwrap_or_else(|p| p.into_inner())
    }

    /// Move the tracks listed in `active` to the lowest slots, rewrite
    /// `active` to point at them and release every other slot.
    pub fn compact(&mut self, active: &mut ActiveQueue) -> Result<(), TransportError> {
        let mut live = active.to_vec();
        live.sort_unstable();
        live.dedup();
        for (target, &source) in live.iter().enumerate() {
            // Sorted and distinct, so `target <= source` and the target slot
            // holds nothing still needed.
            if target != source {
                self.slots.swap(target, source);
            }
        }
        let compacted: Vec<usize> = (0..live.len()).collect();
        active
            .assign(&compacted)
            .map_err(|e| TransportError::QueueFull {
                species: self.kind,
                capacity: e.capacity,
            })?;
        self.allocator.reset_to(live.len());
        Ok(())
    }
}

/// A species pool together with the active list of the next step.
#[derive(Debug, Clone, Copy)]
pub struct Lane<'a> {
    pub pool: &'a TrackPool,
    pub next: &'a ActiveQueue,
}

/// Where tracks created during a step go: one lane per species.
#[derive(Debug, Clone, Copy)]
pub struct Secondaries<'a> {
    pub electrons: Lane<'a>,
    pub positrons: Lane<'a>,
    pub gammas: Lane<'a>,
}

impl<'a> Secondaries<'a> {
    /// Lanes from per-species arrays indexed by [`ParticleKind::index`].
    pub fn new(pools: &'a [TrackPool; 3], next: &'a [ActiveQueue; 3]) -> Self {
        Self {
            electrons: Lane {
                pool: &pools[0],
                next: &next[0],
            },
            positrons: Lane {
                pool: &pools[1],
                next: &next[1],
            },
            gammas: Lane {
                pool: &pools[2],
                next: &next[2],
            },
        }
    }

    pub fn lane(&self, kind: ParticleKind) -> Lane<'a> {
        match kind {
            ParticleKind::Electron => self.electrons,
            ParticleKind::Positron => self.positrons,
            ParticleKind::Gamma => self.gammas,
        }
    }

    /// Allocate a slot for `track` in the pool of `kind` and schedule it for
    /// the next step.
    pub fn next_track(&self, kind: ParticleKind, track: Track) -> Result<usize, TransportError> {
        let lane = self.lane(kind);
        let slot = lane.pool.allocate(track)?;
        lane.next
            .push(slot)
            .map_err(|e| TransportError::QueueFull {
                species: kind,
                capacity: e.capacity,
            })?;
        Ok(slot)
    }
}
