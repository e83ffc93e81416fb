//! Per-frame input storage with repeat-last prediction.

use crate::input::Buttons;
use crate::{Frame, RiposteError, RiposteResult};

/// A fixed-capacity ring of per-frame button masks for a single player.
///
/// Besides exact lookup, the ring answers the question the rollback session
/// keeps asking: "what is this player most likely pressing on frame `f`?"
/// The answer, [`get_or_predict`](InputRing::get_or_predict), repeats the
/// most recent known input, which is the standard prediction policy for
/// held-button games: players overwhelmingly keep doing what they were
/// doing one frame ago.
#[derive(Debug)]
pub struct InputRing {
    inputs: Vec<Buttons>,
    tags: Vec<Frame>,
    /// Highest frame ever stored since the last clear.
    latest: Frame,
}

impl InputRing {
    /// Creates a ring holding `capacity` frames of history.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidHistoryCapacity`] for capacities
    /// below 2: a one-slot ring cannot hold a frame and its predecessor,
    /// which prediction needs.
    pub fn with_capacity(capacity: usize) -> RiposteResult<Self> {
        if capacity < 2 {
            return Err(RiposteError::InvalidHistoryCapacity { capacity });
        }
        Ok(Self {
            inputs: vec![Buttons::NEUTRAL; capacity],
            tags: vec![Frame::NONE; capacity],
            latest: Frame::NONE,
        })
    }

    /// The number of frames the ring can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inputs.len()
    }

    /// Stores `input` as the buttons for `frame`, evicting whatever
    /// occupied the slot.
    ///
    /// Writing an older frame does not displace the latest-frame tracking,
    /// so late out-of-order confirmations cannot make the ring "forget"
    /// newer inputs.
    pub fn set(&mut self, frame: Frame, input: Buttons) {
        debug_assert!(frame.is_some(), "cannot store the sentinel frame");
        let Some(slot) = frame.buffer_index(self.capacity()) else {
            return;
        };
        self.inputs[slot] = input;
        self.tags[slot] = frame;
        if self.latest.is_none() || frame >= self.latest {
            self.latest = frame;
        }
    }

    /// Returns the stored buttons for `frame`, or `None` if the slot holds
    /// a different frame (evicted or never written).
    #[must_use]
    pub fn try_get(&self, frame: Frame) -> Option<Buttons> {
        let slot = frame.buffer_index(self.capacity())?;
        (self.tags[slot] == frame).then(|| self.inputs[slot])
    }

    /// Returns the stored buttons for `frame`, or a prediction.
    ///
    /// The prediction policy, in order:
    ///
    /// 1. an exact hit is returned as-is;
    /// 2. an empty ring predicts neutral;
    /// 3. a frame beyond the latest known one repeats the latest known
    ///    input unchanged;
    /// 4. a frame at or before the latest known one takes the nearest
    ///    stored input strictly before it, searching back at most
    ///    `capacity - 1` frames (and never below frame 0);
    /// 5. otherwise neutral.
    ///
    /// Worst case O(capacity); never allocates.
    #[must_use]
    pub fn get_or_predict(&self, frame: Frame) -> Buttons {
        if let Some(stored) = self.try_get(frame) {
            return stored;
        }
        let Some(latest) = self.latest_frame() else {
            return Buttons::NEUTRAL;
        };
        if frame > latest {
            // `latest` was stored, so its slot still tags it.
            return self
                .try_get(latest)
                .unwrap_or(Buttons::NEUTRAL);
        }
        let stop = frame.raw().saturating_sub(self.capacity() as u32 - 1);
        let mut probe = frame.raw();
        while probe > stop {
            probe -= 1;
            if let Some(stored) = self.try_get(Frame::new(probe)) {
                return stored;
            }
        }
        Buttons::NEUTRAL
    }

    /// The highest frame stored since the last clear, if any.
    #[inline]
    #[must_use]
    pub fn latest_frame(&self) -> Option<Frame> {
        self.latest.to_option()
    }

    /// Forgets every stored frame. Allocations are retained.
    pub fn clear(&mut self) {
        for tag in &mut self.tags {
            *tag = Frame::NONE;
        }
        self.latest = Frame::NONE;
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

    fn ring(capacity: usize) -> InputRing {
        InputRing::with_capacity(capacity).unwrap()
    }

    #[test]
    fn capacity_below_two_is_rejected() {
        for capacity in [0, 1] {
            assert_eq!(
                InputRing::with_capacity(capacity).unwrap_err(),
                RiposteError::InvalidHistoryCapacity { capacity }
            );
        }
    }

    #[test]
    fn set_then_get() {
        let mut ring = ring(8);
        ring.set(Frame::new(3), Buttons::JUMP);
        assert_eq!(ring.try_get(Frame::new(3)), Some(Buttons::JUMP));
        assert_eq!(ring.try_get(Frame::new(4)), None);
        assert_eq!(ring.latest_frame(), Some(Frame::new(3)));
    }

    #[test]
    fn slot_reuse_evicts() {
        let mut ring = ring(4);
        ring.set(Frame::new(1), Buttons::LEFT);
        ring.set(Frame::new(5), Buttons::RIGHT); // same slot, 5 % 4 == 1
        assert_eq!(ring.try_get(Frame::new(1)), None);
        assert_eq!(ring.try_get(Frame::new(5)), Some(Buttons::RIGHT));
    }

    #[test]
    fn older_set_does_not_displace_latest() {
        let mut ring = ring(8);
        ring.set(Frame::new(6), Buttons::RIGHT);
        ring.set(Frame::new(2), Buttons::LEFT);
        assert_eq!(ring.latest_frame(), Some(Frame::new(6)));
    }

    #[test]
    fn overwrite_same_frame_keeps_latest() {
        let mut ring = ring(8);
        ring.set(Frame::new(6), Buttons::RIGHT);
        ring.set(Frame::new(6), Buttons::ATTACK);
        assert_eq!(ring.try_get(Frame::new(6)), Some(Buttons::ATTACK));
        assert_eq!(ring.latest_frame(), Some(Frame::new(6)));
    }

    #[test]
    fn predict_exact_hit() {
        let mut ring = ring(8);
        ring.set(Frame::new(2), Buttons::ATTACK);
        assert_eq!(ring.get_or_predict(Frame::new(2)), Buttons::ATTACK);
    }

    #[test]
    fn predict_empty_ring_is_neutral() {
        let ring = ring(8);
        assert_eq!(ring.get_or_predict(Frame::new(0)), Buttons::NEUTRAL);
        assert_eq!(ring.get_or_predict(Frame::new(100)), Buttons::NEUTRAL);
    }

    #[test]
    fn predict_future_repeats_latest() {
        let mut ring = ring(8);
        ring.set(Frame::new(4), Buttons::LEFT);
        ring.set(Frame::new(5), Buttons::JUMP);
        assert_eq!(ring.get_or_predict(Frame::new(6)), Buttons::JUMP);
        assert_eq!(ring.get_or_predict(Frame::new(60)), Buttons::JUMP);
    }

    #[test]
    fn predict_gap_takes_nearest_earlier_frame() {
        let mut ring = ring(8);
        ring.set(Frame::new(2), Buttons::LEFT);
        ring.set(Frame::new(6), Buttons::RIGHT);
        // Frame 4 was never stored; the nearest earlier stored frame is 2.
        assert_eq!(ring.get_or_predict(Frame::new(4)), Buttons::LEFT);
    }

    #[test]
    fn predict_search_is_bounded_by_capacity() {
        let mut ring = ring(4);
        ring.set(Frame::new(0), Buttons::ATTACK);
        ring.set(Frame::new(10), Buttons::RIGHT);
        // Frame 5 is in the past, and the only earlier frame within
        // capacity-1 steps (frames 2..=4) holds nothing: frame 0's slot was
        // evicted by frame 10 anyway, but even a live frame 0 would be out
        // of search range.
        assert_eq!(ring.get_or_predict(Frame::new(5)), Buttons::NEUTRAL);
    }

    #[test]
    fn predict_at_frame_zero_does_not_underflow() {
        let mut ring = ring(8);
        ring.set(Frame::new(3), Buttons::JUMP);
        // Frame 0 is in the past relative to latest; there is nothing
        // before it to search.
        assert_eq!(ring.get_or_predict(Frame::new(0)), Buttons::NEUTRAL);
    }

    #[test]
    fn clear_forgets_but_keeps_capacity() {
        let mut ring = ring(8);
        ring.set(Frame::new(3), Buttons::JUMP);
        ring.clear();
        assert_eq!(ring.try_get(Frame::new(3)), None);
        assert_eq!(ring.latest_frame(), None);
        assert_eq!(ring.capacity(), 8);
        // Usable again after clearing.
        ring.set(Frame::new(0), Buttons::LEFT);
        assert_eq!(ring.try_get(Frame::new(0)), Some(Buttons::LEFT));
    }

    #[test]
    fn sentinel_frame_lookup_misses_empty_slots() {
        // An empty slot's tag is the sentinel; asking for the sentinel
        // frame must not "find" it.
        let ring = ring(8);
        assert_eq!(ring.try_get(Frame::NONE), None);
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
        /// The last `capacity` consecutively written frames are always
        /// retrievable, and everything older is gone.
        #[test]
        fn prop_window_retention(
            capacity in 2usize..64,
            frames in 1u32..500,
        ) {
            let mut ring = InputRing::with_capacity(capacity).unwrap();
            for raw in 0..frames {
                ring.set(Frame::new(raw), Buttons::from_bits(raw as u16));
            }
            for raw in 0..frames {
                let stored = ring.try_get(Frame::new(raw));
                if raw + (capacity as u32) >= frames {
                    prop_assert_eq!(stored, Some(Buttons::from_bits(raw as u16)));
                } else {
                    prop_assert_eq!(stored, None);
                }
            }
        }

        /// Prediction never panics and returns the stored value for any
        /// frame that is actually present.
        #[test]
        fn prop_predict_consistent_with_storage(
            capacity in 2usize..32,
            writes in proptest::collection::vec((0u32..200, any::<u16>()), 0..100),
            query in 0u32..250,
        ) {
            let mut ring = InputRing::with_capacity(capacity).unwrap();
            for &(frame, bits) in &writes {
                ring.set(Frame::new(frame), Buttons::from_bits(bits));
            }
            let predicted = ring.get_or_predict(Frame::new(query));
            if let Some(stored) = ring.try_get(Frame::new(query)) {
                prop_assert_eq!(predicted, stored);
            }
        }
    }
}
