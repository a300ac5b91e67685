// Active-index lists shared by the workers of one step.
//
// Workers append slots concurrently; the list is read and cleared only between
// steps, when the scheduler has exclusive access.

use crate::error::CapacityError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free bounded counter handing out unique indices below `capacity`.
#[derive(Debug)]
pub struct SlotAllocator {
    next: AtomicUsize,
    capacity: usize,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Reserve one index. Fails once all `capacity` indices are handed out;
    /// a failed reservation does not move the counter.
    pub fn reserve(&self) -> Result<usize, CapacityError> {
        let capacity = self.capacity;
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map_err(|_| CapacityError { capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of indices handed out so far.
    pub fn used(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    /// Restart counting from `used`. Requires exclusive access.
    pub fn reset_to(&mut self, used: usize) {
        *self.next.get_mut() = used.min(self.capacity);
    }
}

/// Fixed-capacity list of track slots, appended to concurrently.
#[derive(Debug)]
pub struct ActiveQueue {
    slots: Box<[AtomicUsize]>,
    len: SlotAllocator,
}

impl ActiveQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| AtomicUsize::new(0)).collect(),
            len: SlotAllocator::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.len.capacity()
    }

    pub fn len(&self) -> usize {
        self.len.used()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `slot`, reserving its position atomically.
    pub fn push(&self, slot: usize) -> Result<(), CapacityError> {
        let index = self.len.reserve()?;
        self.slots[index].store(slot, Ordering::Release);
        Ok(())
    }

    /// Entry `index`; only meaningful for `index < len()` once the writers of
    /// the step have finished.
    pub fn get(&self, index: usize) -> usize {
        self.slots[index].load(Ordering::Acquire)
    }

    /// Snapshot of the current entries.
    pub fn to_vec(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn clear(&mut self) {
        self.len.reset_to(0);
    }

    /// Replace the contents with `slots`. Requires exclusive access.
    pub fn assign(&mut self, slots: &[usize]) -> Result<(), CapacityError> {
        if slots.len() > self.capacity() {
            return Err(CapacityError {
                capacity: self.capacity(),
            });
        }
        for (cell, &slot) in self.slots.iter_mut().zip(slots) {
            *cell.get_mut() = slot;
        }
        self.len.reset_to(slots.len());
        Ok(())
    }
}
