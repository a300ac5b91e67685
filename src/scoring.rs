use crate::units::MEV;
use log::warn;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Energy represented by one unit of the deposit accumulator (1 meV).
pub const DEPOSIT_QUANTUM: f64 = 1.0e-9 * MEV;

/// Run-wide counters updated concurrently by the transport workers.
///
/// All updates are integer additions, so totals do not depend on the order
/// in which tracks are processed. Energy is accumulated in fixed point and
/// saturates at `u64::MAX` quanta (about 1.8e10 MeV) instead of wrapping.
#[derive(Debug, Default)]
pub struct Scoring {
    energy_deposit: AtomicU64,
    hits: AtomicU64,
    secondaries: AtomicU64,
    escaped: AtomicU64,
    escaped_energy: AtomicU64,
    chord_limit_hits: AtomicU64,
}

impl Scoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_energy_deposit(&self, energy: f64) {
        add_energy(&self.energy_deposit, energy);
    }

    /// Boundary crossings.
    pub fn add_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_secondaries(&self, n: u64) {
        self.secondaries.fetch_add(n, Ordering::Relaxed);
    }

    /// A track that left the world carrying kinetic `energy`.
    pub fn add_escaped(&self, energy: f64) {
        self.escaped.fetch_add(1, Ordering::Relaxed);
        add_energy(&self.escaped_energy, energy);
    }

    /// Propagations ended by the chord iteration cap.
    pub fn add_chord_limit_hit(&self) {
        self.chord_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScoringSummary {
        ScoringSummary {
            energy_deposit: self.energy_deposit.load(Ordering::Relaxed) as f64 * DEPOSIT_QUANTUM,
            hits: self.hits.load(Ordering::Relaxed),
            secondaries: self.secondaries.load(Ordering::Relaxed),
            escaped: self.escaped.load(Ordering::Relaxed),
            escaped_energy: self.escaped_energy.load(Ordering::Relaxed) as f64 * DEPOSIT_QUANTUM,
            chord_limit_hits: self.chord_limit_hits.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn add_energy(total: &AtomicU64, energy: f64) {
    if energy > 0.0 {
        // Float to integer casts saturate, so a huge single value cannot wrap.
        let quanta = (energy / DEPOSIT_QUANTUM).round() as u64;
        let previous = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            Some(current.saturating_add(quanta))
        });
        if let Ok(current) = previous {
            if current.checked_add(quanta).is_none() {
                warn!(
                    "energy accumulator saturated at {:.6e} MeV",
                    u64::MAX as f64 * DEPOSIT_QUANTUM / MEV
                );
            }
        }
    }
}

/// Plain copy of the [`Scoring`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoringSummary {
    /// Total deposited energy in MeV.
    pub energy_deposit: f64,
    pub hits: u64,
    pub secondaries: u64,
    pub escaped: u64,
    /// Kinetic energy carried out of the world in MeV.
    pub escaped_energy: f64,
    pub chord_limit_hits: u64,
}

impl fmt::Display for ScoringSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy deposit: {:.6} MeV", self.energy_deposit / MEV)?;
        writeln!(f, "  Boundary hits: {}", self.hits)?;
        writeln!(f, "  Secondaries: {}", self.secondaries)?;
        writeln!(
            f,
            "  Escaped: {} ({:.6} MeV)",
            self.escaped,
            self.escaped_energy / MEV
        )?;
        write!(f, "  Chord limit hits: {}", self.chord_limit_hits)
    }
}
