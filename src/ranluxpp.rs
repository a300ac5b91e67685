// Per-track random number streams based on RANLUX++.
// See: A. Sibidanov, "A revision of the subtract-with-borrow random number
// generators", Computer Physics Communications 221 (2017) 299-303.
//
// RANLUX++ is a linear congruential generator with the 576-bit modulus
// m = 2^576 - 2^240 + 1 and the multiplier a^2048, where a is the multiplier
// equivalent to the RANLUX subtract-with-borrow recursion of Luscher. Because the
// recursion is an LCG, advancing a stream by n steps is a single modular
// exponentiation, which is what lets secondaries branch off decorrelated
// streams without generating the intermediate values.

use crate::mulmod::{canonical, mulmod, powermod, Uint576, ONE};
use once_cell::sync::Lazy;
use rand::{RngCore, SeedableRng};

/// The generator multiplier A = a^2048 mod m (luxury level p = 2048).
pub const MULTIPLIER: Uint576 = [
    0xed7f_aa90_747a_aad9,
    0x4cec_2c78_af55_c101,
    0xe64d_cb31_c482_28ec,
    0x6d8a_15a1_3bee_7cb0,
    0x20b2_ca60_cb78_c509,
    0x256c_3d3c_662e_a36c,
    0xff74_e541_0768_4ed2,
    0x492e_dfcc_0cc8_e753,
    0xb48c_187c_f5b2_2097,
];

/// A^(2^96): consecutive seeds start 2^96 steps apart.
static SEED_MULTIPLIER: Lazy<Uint576> = Lazy::new(|| {
    let a_48 = powermod(&MULTIPLIER, 1u64 << 48);
    powermod(&a_48, 1u64 << 48)
});

/// Number of steps a secondary's stream is advanced ahead of its parent's.
pub const SECONDARY_SKIP: u64 = 1u64 << 48;

/// 2^-53, the spacing of doubles produced by [`Ranluxpp::uniform`].
const INV_2_53: f64 = 1.0 / (1u64 << 53) as f64;

/// Deterministic RANLUX++ stream.
///
/// The state is always kept as the least non-negative residue modulo m, so two
/// streams that went through the same number of steps (by any mix of
/// [`Ranluxpp::uniform`] and [`Ranluxpp::skip`]) hold bit-identical state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ranluxpp {
    state: Uint576,
}

impl Ranluxpp {
    /// Create a stream for `seed`, positioned at step `2^96 * seed` of the
    /// sequence starting at 1.
    pub fn new(seed: u64) -> Self {
        let start = powermod(&SEED_MULTIPLIER, seed);
        Self {
            state: canonical(&mulmod(&start, &ONE)),
        }
    }

    /// Create a stream directly from a raw state.
    pub fn from_state(state: Uint576) -> Self {
        Self {
            state: canonical(&state),
        }
    }

    /// Current raw state.
    pub fn state(&self) -> &Uint576 {
        &self.state
    }

    #[inline]
    fn advance(&mut self) {
        self.state = canonical(&mulmod(&MULTIPLIER, &self.state));
    }

    /// Advance one step and return a double in [0, 1) built from the 53 most
    /// significant bits of the top state limb.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.advance();
        (self.state[8] >> 11) as f64 * INV_2_53
    }

    /// Advance the stream by `n` steps in O(log n) modular multiplications.
    pub fn skip(&mut self, n: u64) {
        let jump = powermod(&MULTIPLIER, n);
        self.state = canonical(&mulmod(&jump, &self.state));
    }

    /// Derive an independent stream for a secondary.
    ///
    /// The parent consumes one step so that successive branches differ, and
    /// the child starts [`SECONDARY_SKIP`] steps further along.
    pub fn branch(&mut self) -> Self {
        self.advance();
        let mut child = self.clone();
        child.skip(SECONDARY_SKIP);
        child
    }
}

impl SeedableRng for Ranluxpp {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

impl RngCore for Ranluxpp {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.advance();
        self.state[8]
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_deterministic() {
        let mut rng1 = Ranluxpp::new(12345);
        let mut rng2 = Ranluxpp::new(12345);
        for _ in 0..100 {
            assert_eq!(rng1.uniform().to_bits(), rng2.uniform().to_bits());
        }
    }

    #[test]
    fn test_range() {
        let mut rng = Ranluxpp::new(42);
        for _ in 0..10000 {
            let val = rng.uniform();
            assert!((0.0..1.0).contains(&val), "Value {} out of range [0, 1)", val);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut rng1 = Ranluxpp::new(1);
        let mut rng2 = Ranluxpp::new(2);
        let a: Vec<f64> = (0..10).map(|_| rng1.uniform()).collect();
        let b: Vec<f64> = (0..10).map(|_| rng2.uniform()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_zero_starts_at_one() {
        let rng = Ranluxpp::new(0);
        assert_eq!(rng.state(), &ONE);
    }

    #[test]
    fn test_skip_matches_sequential_steps() {
        let mut jumped = Ranluxpp::new(7);
        let mut stepped = jumped.clone();
        jumped.skip(25);
        for _ in 0..25 {
            stepped.uniform();
        }
        assert_eq!(jumped, stepped);
    }

    #[test]
    fn test_branch_decorrelates() {
        let mut parent = Ranluxpp::new(99);
        let mut child_a = parent.branch();
        let mut child_b = parent.branch();
        assert_ne!(child_a, child_b);
        assert_ne!(child_a, parent);
        let p = parent.uniform();
        assert_ne!(p, child_a.uniform());
        assert_ne!(p, child_b.uniform());
    }

    #[test]
    fn test_gen_f64_matches_uniform() {
        let mut a = Ranluxpp::new(5);
        let mut b = Ranluxpp::new(5);
        for _ in 0..20 {
            let x: f64 = a.gen();
            assert_eq!(x.to_bits(), b.uniform().to_bits());
        }
    }

    #[test]
    fn test_from_seed_bytes() {
        let mut a = Ranluxpp::from_seed(77u64.to_le_bytes());
        let mut b = Ranluxpp::new(77);
        assert_eq!(a.next_u64(), b.next_u64());
    }
}
