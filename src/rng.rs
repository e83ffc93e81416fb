//! Deterministic XorShift32 random number generator.
//!
//! The simulation carries its PRNG state inside [`SimState`], so random
//! draws roll back and re-simulate together with everything else. That
//! rules out any generator with hidden or global state: this module keeps
//! the entire generator in one non-zero 32-bit word that is copied whenever
//! a snapshot is taken.
//!
//! # Algorithm
//!
//! Marsaglia's XorShift32 with the (13, 17, 5) triple:
//!
//! ```text
//! x ^= x << 13;
//! x ^= x >> 17;
//! x ^= x << 5;
//! ```
//!
//! The recurrence is a bijection on the non-zero 32-bit words, so the
//! period is 2³² − 1 and a non-zero state can never reach zero. Zero is the
//! absorbing state and is rejected at construction.
//!
//! Bounded draws use Lemire's multiply-high reduction rather than modulo,
//! which avoids the modulo bias without a rejection loop.
//!
//! [`SimState`]: crate::sim::SimState

use serde::{Deserialize, Serialize};

use crate::{RiposteError, RiposteResult};

/// A deterministic XorShift32 generator.
///
/// The state is a single non-zero `u32`; copying the value copies the
/// entire generator. Not cryptographically secure: this is a simulation
/// PRNG where bit-exact reproducibility is the only requirement.
///
/// # Examples
///
/// ```
/// use riposte_netcode::XorShift32;
///
/// let mut rng = XorShift32::new(1)?;
/// let first = rng.next_u32();
/// assert_eq!(first, rng.state());
///
/// // Same seed, same sequence.
/// let mut again = XorShift32::new(1)?;
/// assert_eq!(again.next_u32(), first);
/// # Ok::<(), riposte_netcode::RiposteError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XorShift32 {
    state: u32,
}

impl Default for XorShift32 {
    /// The seed-1 generator. A placeholder for pre-filled storage; real
    /// simulations should seed through [`XorShift32::new`].
    fn default() -> Self {
        Self { state: 1 }
    }
}

impl XorShift32 {
    /// Creates a generator from a seed.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidSeed`] for a zero seed: zero maps to
    /// zero under the recurrence and would absorb the generator forever.
    pub fn new(seed: u32) -> RiposteResult<Self> {
        if seed == 0 {
            return Err(RiposteError::InvalidSeed);
        }
        Ok(Self { state: seed })
    }

    /// Returns the current state word.
    ///
    /// The state is also the most recent output, which lets the simulation
    /// hash the generator as one more state field.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Advances the generator and returns the new state word.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Draws a uniform value in `[0, bound)` via Lemire's multiply-high
    /// reduction.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidBound`] when `bound` is zero.
    #[inline]
    pub fn next_bounded(&mut self, bound: u32) -> RiposteResult<u32> {
        if bound == 0 {
            return Err(RiposteError::InvalidBound);
        }
        let word = u64::from(self.next_u32());
        Ok(((word * u64::from(bound)) >> 32) as u32)
    }

    /// Draws a uniform value in the half-open range `[min, max)`.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidRange`] when `max <= min`.
    #[inline]
    pub fn next_int(&mut self, min: i32, max: i32) -> RiposteResult<i32> {
        if max <= min {
            return Err(RiposteError::InvalidRange { min, max });
        }
        // The span fits in u32 even for i32::MIN..i32::MAX.
        let span = max.wrapping_sub(min) as u32;
        let offset = self.next_bounded(span)?;
        Ok(min.wrapping_add(offset as i32))
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_rejected() {
        assert_eq!(XorShift32::new(0), Err(RiposteError::InvalidSeed));
    }

    #[test]
    fn nonzero_seed_is_accepted() {
        let rng = XorShift32::new(1).unwrap();
        assert_eq!(rng.state(), 1);
    }

    // Pinned sequence so an accidental change to the shift triple cannot
    // slip through.
    #[test]
    fn golden_sequence_seed_1() {
        let mut rng = XorShift32::new(1).unwrap();
        let expected = [
            0x0004_2021_u32,
            0x0408_0601,
            0x9DCC_A8C5,
            0x1255_994F,
            0x8EF9_17D1,
        ];
        for &value in &expected {
            assert_eq!(rng.next_u32(), value);
        }
    }

    #[test]
    fn golden_sequence_arbitrary_seed() {
        let mut rng = XorShift32::new(0xDEAD_BEEF).unwrap();
        assert_eq!(rng.next_u32(), 0x477D_20B7);
        assert_eq!(rng.next_u32(), 0x8E1D_9142);
        assert_eq!(rng.next_u32(), 0xBA8C_2458);
    }

    #[test]
    fn state_tracks_last_output() {
        let mut rng = XorShift32::new(99).unwrap();
        let out = rng.next_u32();
        assert_eq!(rng.state(), out);
    }

    #[test]
    fn bounded_zero_bound_fails() {
        let mut rng = XorShift32::new(1).unwrap();
        assert_eq!(rng.next_bounded(0), Err(RiposteError::InvalidBound));
    }

    #[test]
    fn bounded_golden_values() {
        let mut rng = XorShift32::new(1).unwrap();
        let drawn: Vec<u32> = (0..8).map(|_| rng.next_bounded(6).unwrap()).collect();
        assert_eq!(drawn, vec![0, 0, 3, 0, 3, 1, 0, 0]);
    }

    #[test]
    fn next_int_empty_range_fails() {
        let mut rng = XorShift32::new(1).unwrap();
        assert_eq!(
            rng.next_int(5, 5),
            Err(RiposteError::InvalidRange { min: 5, max: 5 })
        );
        assert_eq!(
            rng.next_int(5, 4),
            Err(RiposteError::InvalidRange { min: 5, max: 4 })
        );
    }

    #[test]
    fn next_int_golden_values() {
        let mut rng = XorShift32::new(1).unwrap();
        let drawn: Vec<i32> = (0..8).map(|_| rng.next_int(-3, 4).unwrap()).collect();
        assert_eq!(drawn, vec![-3, -3, 1, -3, 0, -2, -2, -3]);
    }

    #[test]
    fn copies_are_independent() {
        let mut rng = XorShift32::new(12345).unwrap();
        rng.next_u32();
        let mut copy = rng;
        assert_eq!(copy.next_u32(), rng.next_u32());
        // Advancing one does not touch the other.
        rng.next_u32();
        assert_ne!(rng.state(), copy.state());
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Same seed, same sequence: the property the whole crate rests on.
        #[test]
        fn prop_determinism(seed in 1u32..) {
            let mut a = XorShift32::new(seed).unwrap();
            let mut b = XorShift32::new(seed).unwrap();
            for _ in 0..64 {
                prop_assert_eq!(a.next_u32(), b.next_u32());
            }
        }

        /// The state never reaches the absorbing zero from a non-zero seed.
        #[test]
        fn prop_never_absorbs(seed in 1u32..) {
            let mut rng = XorShift32::new(seed).unwrap();
            for _ in 0..256 {
                prop_assert_ne!(rng.next_u32(), 0);
            }
        }

        /// Bounded draws stay inside the bound for arbitrary seeds.
        #[test]
        fn prop_bounded_in_range(seed in 1u32.., bound in 1u32..) {
            let mut rng = XorShift32::new(seed).unwrap();
            for _ in 0..32 {
                prop_assert!(rng.next_bounded(bound).unwrap() < bound);
            }
        }

        /// Ranged draws stay inside the half-open range.
        #[test]
        fn prop_next_int_in_range(
            seed in 1u32..,
            min in -10_000i32..10_000,
            span in 1i32..10_000,
        ) {
            let max = min + span;
            let mut rng = XorShift32::new(seed).unwrap();
            for _ in 0..32 {
                let value = rng.next_int(min, max).unwrap();
                prop_assert!(value >= min);
                prop_assert!(value < max);
            }
        }
    }
}
