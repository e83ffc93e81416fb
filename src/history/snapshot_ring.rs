//! Per-frame simulation snapshots.

use crate::sim::SimState;
use crate::{Frame, RiposteError, RiposteResult};

/// A fixed-capacity ring of simulation snapshots.
///
/// Saving copies the state *by value* into the slot and loading copies it
/// back out, so a loaded snapshot can never alias the live state, the
/// failure mode that silently corrupts rollback in reference-semantics
/// designs.
#[derive(Debug)]
pub struct SnapshotRing {
    states: Vec<SimState>,
    tags: Vec<Frame>,
    latest: Frame,
}

impl SnapshotRing {
    /// Creates a ring holding `capacity` snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidHistoryCapacity`] for capacities
    /// below 2.
    pub fn with_capacity(capacity: usize) -> RiposteResult<Self> {
        if capacity < 2 {
            return Err(RiposteError::InvalidHistoryCapacity { capacity });
        }
        Ok(Self {
            states: vec![SimState::default(); capacity],
            tags: vec![Frame::NONE; capacity],
            latest: Frame::NONE,
        })
    }

    /// The number of snapshots the ring can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Archives a copy of `state` as the snapshot for `frame`, evicting
    /// whatever occupied the slot.
    pub fn save(&mut self, frame: Frame, state: &SimState) {
        debug_assert!(frame.is_some(), "cannot store the sentinel frame");
        let Some(slot) = frame.buffer_index(self.capacity()) else {
            return;
        };
        self.states[slot] = *state;
        self.tags[slot] = frame;
        if self.latest.is_none() || frame >= self.latest {
            self.latest = frame;
        }
    }

    /// Returns an independent copy of the snapshot for `frame`, or `None`
    /// if the slot was evicted or never written.
    #[must_use]
    pub fn try_load(&self, frame: Frame) -> Option<SimState> {
        let slot = frame.buffer_index(self.capacity())?;
        (self.tags[slot] == frame).then(|| self.states[slot])
    }

    /// The highest frame saved since the last clear, if any.
    #[inline]
    #[must_use]
    pub fn latest_frame(&self) -> Option<Frame> {
        self.latest.to_option()
    }

    /// Forgets every snapshot. Allocations are retained.
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

    #[test]
    fn capacity_below_two_is_rejected() {
        assert_eq!(
            SnapshotRing::with_capacity(1).unwrap_err(),
            RiposteError::InvalidHistoryCapacity { capacity: 1 }
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut ring = SnapshotRing::with_capacity(4).unwrap();
        let mut state = SimState::new(9).unwrap();
        state.frame = Frame::new(2);
        state.p1.x = 1234;
        ring.save(Frame::new(2), &state);
        assert_eq!(ring.try_load(Frame::new(2)), Some(state));
        assert_eq!(ring.latest_frame(), Some(Frame::new(2)));
    }

    #[test]
    fn load_miss_returns_none() {
        let ring = SnapshotRing::with_capacity(4).unwrap();
        assert_eq!(ring.try_load(Frame::new(0)), None);
    }

    #[test]
    #[allow(unused_assignments, unused_variables)]
    fn loaded_snapshot_is_independent() {
        let mut ring = SnapshotRing::with_capacity(4).unwrap();
        let state = SimState::new(9).unwrap();
        ring.save(Frame::new(0), &state);
        let mut loaded = ring.try_load(Frame::new(0)).unwrap();
        loaded.p1.x += 300;
        // The archived copy is untouched.
        assert_eq!(ring.try_load(Frame::new(0)), Some(state));
    }

    #[test]
    fn slot_reuse_evicts_oldest() {
        let mut ring = SnapshotRing::with_capacity(3).unwrap();
        let state = SimState::new(9).unwrap();
        for raw in 0..5u32 {
            let mut tagged = state;
            tagged.frame = Frame::new(raw);
            ring.save(Frame::new(raw), &tagged);
        }
        assert_eq!(ring.try_load(Frame::new(0)), None);
        assert_eq!(ring.try_load(Frame::new(1)), None);
        for raw in 2..5u32 {
            let loaded = ring.try_load(Frame::new(raw)).unwrap();
            assert_eq!(loaded.frame, Frame::new(raw));
        }
        assert_eq!(ring.latest_frame(), Some(Frame::new(4)));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut ring = SnapshotRing::with_capacity(4).unwrap();
        ring.save(Frame::new(1), &SimState::new(9).unwrap());
        ring.clear();
        assert_eq!(ring.try_load(Frame::new(1)), None);
        assert_eq!(ring.latest_frame(), None);
        assert_eq!(ring.capacity(), 4);
    }
}
