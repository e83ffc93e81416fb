//! The rollback session: tick, predict, detect, rewind, re-simulate.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::history::{InputRing, SnapshotRing};
use crate::input::Buttons;
use crate::sim::{step, SimState};
use crate::{Frame, PlayerSide, RiposteError, RiposteResult};

/// Informational rollback counters.
///
/// These are for HUDs and diagnostics only; nothing in the session reads
/// them back.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct RollbackStats {
    /// Number of rollbacks performed.
    pub rollback_count: u64,
    /// Total frames re-simulated across all rollbacks.
    pub rollback_frames_total: u64,
    /// Deepest single rollback, in frames.
    pub max_rollback_depth: u32,
}

/// Drives one peer's simulation under rollback netcode.
///
/// Every tick the session records the confirmed local input, fills the
/// remote input from the network-confirmed value or a prediction, archives
/// a snapshot, and steps the simulation. When a confirmed remote input
/// later contradicts a prediction for a past frame, the session rewinds to
/// that frame's snapshot and re-simulates forward with the corrected input.
///
/// After any sequence of [`tick`](Self::tick) and
/// [`set_remote_input`](Self::set_remote_input) calls with delays bounded
/// by the history capacity, the current state is identical to the
/// fully-confirmed ground-truth run over the same inputs.
///
/// # Example
///
/// ```
/// use riposte_netcode::{Buttons, Frame, PlayerSide, RollbackSession, SimState};
///
/// let mut session = RollbackSession::new(SimState::new(1)?, 32, PlayerSide::P2)?;
/// session.tick(Buttons::LEFT); // remote (P1) input predicted as neutral
/// session.set_remote_input(Frame::new(0), Buttons::RIGHT)?; // mispredicted: rolls back
/// assert_eq!(session.stats().rollback_count, 1);
/// # Ok::<(), riposte_netcode::RiposteError>(())
/// ```
pub struct RollbackSession {
    local_side: PlayerSide,
    state: SimState,
    local_inputs: InputRing,
    remote_inputs: InputRing,
    snapshots: SnapshotRing,
    stats: RollbackStats,
}

impl RollbackSession {
    /// Creates a session starting from `initial_state`.
    ///
    /// `history_capacity` bounds how far back the session can rewind; it
    /// must cover the worst remote input delay (in frames) the transport is
    /// expected to produce. All three history rings share this capacity.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidHistoryCapacity`] for capacities
    /// below 2.
    pub fn new(
        initial_state: SimState,
        history_capacity: usize,
        local_side: PlayerSide,
    ) -> RiposteResult<Self> {
        Ok(Self {
            local_side,
            state: initial_state,
            local_inputs: InputRing::with_capacity(history_capacity)?,
            remote_inputs: InputRing::with_capacity(history_capacity)?,
            snapshots: SnapshotRing::with_capacity(history_capacity)?,
            stats: RollbackStats::default(),
        })
    }

    /// The frame the next [`tick`](Self::tick) will simulate.
    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.state.frame
    }

    /// The live simulation state.
    #[inline]
    #[must_use]
    pub fn current_state(&self) -> &SimState {
        &self.state
    }

    /// The rollback counters accumulated so far.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> RollbackStats {
        self.stats
    }

    /// The capacity shared by the input and snapshot rings.
    #[inline]
    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.snapshots.capacity()
    }

    /// Which player this peer controls.
    #[inline]
    #[must_use]
    pub fn local_side(&self) -> PlayerSide {
        self.local_side
    }

    /// Advances the simulation by one frame using the confirmed local
    /// input and the confirmed-or-predicted remote input.
    ///
    /// A predicted remote input is written back into the remote ring: that
    /// stored prediction is what a later confirmed input is compared
    /// against, so without the write-back mispredictions would go
    /// undetected.
    pub fn tick(&mut self, local_input: Buttons) {
        let frame = self.state.frame;
        self.local_inputs.set(frame, local_input);

        let remote_input = match self.remote_inputs.try_get(frame) {
            Some(confirmed) => confirmed,
            None => {
                let predicted = self.remote_inputs.get_or_predict(frame);
                self.remote_inputs.set(frame, predicted);
                trace!(frame = %frame, input = %predicted, "predicted remote input");
                predicted
            },
        };

        self.snapshots.save(frame, &self.state);
        let (p1, p2) = self.side_inputs(local_input, remote_input);
        self.state = step(self.state, p1, p2);
    }

    /// Delivers a confirmed remote input for `frame`.
    ///
    /// Arrivals may be late, reordered or duplicated:
    ///
    /// - a duplicate (bit-identical to the stored value, confirmed or
    ///   predicted) is a no-op;
    /// - a contradiction of a stored value for a *past* frame overwrites it
    ///   and rolls back to `frame`;
    /// - a never-stored frame (future, or so late its slot was already
    ///   evicted) is stored without a rollback: with no stored value there
    ///   is no prediction to contradict, and an eviction-late mismatch is
    ///   unrecoverable regardless.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InsufficientHistory`] when a rollback is
    /// required but the target snapshot was evicted, and
    /// [`RiposteError::MissingLocalInput`] if re-simulation finds a gap in
    /// the local input record (a bug, not a runtime condition).
    pub fn set_remote_input(&mut self, frame: Frame, input: Buttons) -> RiposteResult<()> {
        match self.remote_inputs.try_get(frame) {
            Some(stored) if stored == input => Ok(()),
            Some(_) => {
                self.remote_inputs.set(frame, input);
                if frame < self.state.frame {
                    debug!(
                        frame = %frame,
                        current = %self.state.frame,
                        "confirmed remote input contradicts prediction, rolling back"
                    );
                    self.rollback_to(frame)
                } else {
                    Ok(())
                }
            },
            None => {
                self.remote_inputs.set(frame, input);
                Ok(())
            },
        }
    }

    /// Rewinds to `frame` and re-simulates up to the previous head.
    ///
    /// The corrected path overwrites the archived snapshots as it goes, so
    /// after the rollback the rewritten timeline is canonical.
    fn rollback_to(&mut self, frame: Frame) -> RiposteResult<()> {
        let end = self.state.frame;
        let Some(snapshot) = self.snapshots.try_load(frame) else {
            return Err(RiposteError::InsufficientHistory {
                frame,
                capacity: self.snapshots.capacity(),
            });
        };

        let depth = end.raw() - frame.raw();
        self.stats.rollback_count += 1;
        self.stats.rollback_frames_total += u64::from(depth);
        self.stats.max_rollback_depth = self.stats.max_rollback_depth.max(depth);
        debug!(from = %end, to = %frame, depth, "rolling back");

        self.state = snapshot;
        for raw in frame.raw()..end.raw() {
            let resim_frame = Frame::new(raw);
            let local = self
                .local_inputs
                .try_get(resim_frame)
                .ok_or(RiposteError::MissingLocalInput { frame: resim_frame })?;
            let remote = match self.remote_inputs.try_get(resim_frame) {
                Some(confirmed) => confirmed,
                None => {
                    let predicted = self.remote_inputs.get_or_predict(resim_frame);
                    self.remote_inputs.set(resim_frame, predicted);
                    predicted
                },
            };
            self.snapshots.save(resim_frame, &self.state);
            let (p1, p2) = self.side_inputs(local, remote);
            self.state = step(self.state, p1, p2);
        }
        Ok(())
    }

    /// Maps `(local, remote)` onto `(p1, p2)` according to the local side.
    fn side_inputs(&self, local: Buttons, remote: Buttons) -> (Buttons, Buttons) {
        match self.local_side {
            PlayerSide::P1 => (local, remote),
            PlayerSide::P2 => (remote, local),
        }
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

    fn session(side: PlayerSide) -> RollbackSession {
        RollbackSession::new(SimState::new(1).unwrap(), 16, side).unwrap()
    }

    /// The fully-confirmed run both peers should converge to.
    fn ground_truth(frames: u32, p1: Buttons, p2: Buttons) -> SimState {
        let mut state = SimState::new(1).unwrap();
        for _ in 0..frames {
            state = step(state, p1, p2);
        }
        state
    }

    #[test]
    fn invalid_capacity_is_rejected() {
        let result = RollbackSession::new(SimState::new(1).unwrap(), 1, PlayerSide::P1);
        assert_eq!(
            result.err(),
            Some(RiposteError::InvalidHistoryCapacity { capacity: 1 })
        );
    }

    #[test]
    fn tick_advances_one_frame() {
        let mut session = session(PlayerSide::P1);
        assert_eq!(session.current_frame(), Frame::ZERO);
        session.tick(Buttons::NEUTRAL);
        assert_eq!(session.current_frame(), Frame::new(1));
    }

    #[test]
    fn side_mapping_routes_local_input() {
        let mut as_p1 = session(PlayerSide::P1);
        as_p1.tick(Buttons::RIGHT);
        assert_eq!(as_p1.current_state().p1.facing, 1);
        assert_eq!(as_p1.current_state().p1.x, 4_300);
        assert_eq!(as_p1.current_state().p2.x, 16_000);

        let mut as_p2 = session(PlayerSide::P2);
        as_p2.tick(Buttons::LEFT);
        assert_eq!(as_p2.current_state().p2.x, 15_700);
        assert_eq!(as_p2.current_state().p1.x, 4_000);
    }

    #[test]
    fn confirmed_before_tick_needs_no_rollback() {
        let mut session = session(PlayerSide::P1);
        for raw in 0..50u32 {
            session
                .set_remote_input(Frame::new(raw), Buttons::LEFT)
                .unwrap();
            session.tick(Buttons::RIGHT);
        }
        assert_eq!(session.stats().rollback_count, 0);
        assert_eq!(
            *session.current_state(),
            ground_truth(50, Buttons::RIGHT, Buttons::LEFT)
        );
    }

    #[test]
    fn misprediction_rolls_back_and_converges() {
        let mut session = session(PlayerSide::P1);
        // Tick ahead with no remote information: prediction says neutral.
        for _ in 0..5 {
            session.tick(Buttons::RIGHT);
        }
        // The remote player was actually holding LEFT the whole time.
        for raw in 0..5u32 {
            session
                .set_remote_input(Frame::new(raw), Buttons::LEFT)
                .unwrap();
        }
        assert!(session.stats().rollback_count > 0);
        assert_eq!(
            *session.current_state(),
            ground_truth(5, Buttons::RIGHT, Buttons::LEFT)
        );
    }

    #[test]
    fn matching_confirmation_is_a_no_op() {
        let mut session = session(PlayerSide::P1);
        for _ in 0..5 {
            session.tick(Buttons::RIGHT);
        }
        // Prediction was neutral and the remote player really was neutral.
        for raw in 0..5u32 {
            session
                .set_remote_input(Frame::new(raw), Buttons::NEUTRAL)
                .unwrap();
        }
        assert_eq!(session.stats().rollback_count, 0);
    }

    #[test]
    fn duplicate_confirmations_are_no_ops() {
        let mut session = session(PlayerSide::P1);
        session
            .set_remote_input(Frame::new(0), Buttons::ATTACK)
            .unwrap();
        session.tick(Buttons::NEUTRAL);
        let after_first = session.stats();
        // Bit-identical redelivery, as a lossy transport will produce.
        session
            .set_remote_input(Frame::new(0), Buttons::ATTACK)
            .unwrap();
        assert_eq!(session.stats(), after_first);
    }

    #[test]
    fn future_confirmation_is_stored_without_rollback() {
        let mut session = session(PlayerSide::P1);
        session
            .set_remote_input(Frame::new(3), Buttons::JUMP)
            .unwrap();
        assert_eq!(session.stats().rollback_count, 0);
        for _ in 0..4 {
            session.tick(Buttons::NEUTRAL);
        }
        // The pre-delivered input was used at frame 3, not predicted over.
        assert_eq!(session.stats().rollback_count, 0);
        let mut expected = SimState::new(1).unwrap();
        for raw in 0..4u32 {
            let p2 = if raw == 3 { Buttons::JUMP } else { Buttons::NEUTRAL };
            expected = step(expected, Buttons::NEUTRAL, p2);
        }
        assert_eq!(*session.current_state(), expected);
    }

    #[test]
    fn rollback_depth_statistics() {
        let mut session = session(PlayerSide::P1);
        for _ in 0..8 {
            session.tick(Buttons::NEUTRAL);
        }
        // One mismatch 8 frames deep.
        session
            .set_remote_input(Frame::new(0), Buttons::LEFT)
            .unwrap();
        let stats = session.stats();
        assert_eq!(stats.rollback_count, 1);
        assert_eq!(stats.rollback_frames_total, 8);
        assert_eq!(stats.max_rollback_depth, 8);
    }

    #[test]
    fn eviction_late_arrival_is_stored_without_rollback() {
        let mut session = RollbackSession::new(SimState::new(1).unwrap(), 4, PlayerSide::P1)
            .unwrap();
        for _ in 0..10 {
            session.tick(Buttons::NEUTRAL);
        }
        // Frame 2's prediction was evicted long ago, so there is nothing
        // to compare against: the input is stored fresh, no rollback.
        session
            .set_remote_input(Frame::new(2), Buttons::LEFT)
            .unwrap();
        assert_eq!(session.stats().rollback_count, 0);
    }

    #[test]
    fn mismatch_on_evicted_snapshot_fails_loudly() {
        let mut session = RollbackSession::new(SimState::new(1).unwrap(), 4, PlayerSide::P1)
            .unwrap();
        for _ in 0..10 {
            session.tick(Buttons::NEUTRAL);
        }
        // First delivery for the ancient frame 2 is stored silently.
        session
            .set_remote_input(Frame::new(2), Buttons::LEFT)
            .unwrap();
        // A second, contradictory delivery is a detectable mismatch for a
        // past frame, but frame 2's snapshot is long evicted: the session
        // must fail loudly and name the fix.
        let result = session.set_remote_input(Frame::new(2), Buttons::RIGHT);
        assert_eq!(
            result,
            Err(RiposteError::InsufficientHistory {
                frame: Frame::new(2),
                capacity: 4,
            })
        );
        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("history capacity"));
    }

    #[test]
    fn mismatch_within_history_recovers() {
        let mut session = RollbackSession::new(SimState::new(1).unwrap(), 4, PlayerSide::P1)
            .unwrap();
        for _ in 0..10 {
            session.tick(Buttons::NEUTRAL);
        }
        // Frame 6 is the oldest frame both rings still hold.
        session
            .set_remote_input(Frame::new(6), Buttons::LEFT)
            .unwrap();
        assert_eq!(session.stats().rollback_count, 1);
        assert_eq!(session.current_frame(), Frame::new(10));
    }

    #[test]
    fn corrected_timeline_survives_later_rollbacks() {
        // Two mispredictions corrected out of order: the second rollback
        // re-simulates over snapshots rewritten by the first.
        let mut session = session(PlayerSide::P1);
        for _ in 0..6 {
            session.tick(Buttons::RIGHT);
        }
        session
            .set_remote_input(Frame::new(4), Buttons::LEFT)
            .unwrap();
        session
            .set_remote_input(Frame::new(1), Buttons::LEFT)
            .unwrap();

        let mut expected = SimState::new(1).unwrap();
        for raw in 0..6u32 {
            let p2 = if raw == 1 || raw == 4 {
                Buttons::LEFT
            } else {
                Buttons::NEUTRAL
            };
            expected = step(expected, Buttons::RIGHT, p2);
        }
        assert_eq!(*session.current_state(), expected);
        assert_eq!(session.stats().rollback_count, 2);
    }
}
