//! Inputs-only replays: record, play back, fingerprint.
//!
//! A replay is just a seed and the full input sequence; determinism does
//! the rest. Playing one back re-runs the simulation from
//! [`SimState::new`] and folds [`step`] over the recorded pairs, which
//! reproduces the original run bit for bit on any machine.
//!
//! The on-disk form lives in [`container`] (the RPLK format).

pub mod container;

use serde::{Deserialize, Serialize};

use crate::hash::state_checksum;
use crate::input::{Buttons, InputPair};
use crate::sim::{step, SimState};
use crate::{Frame, RiposteError, RiposteResult};

/// An immutable recorded session: seed, start frame, and every frame's
/// input pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Replay {
    seed: u32,
    start_frame: Frame,
    inputs: Box<[InputPair]>,
}

impl Replay {
    /// Creates a replay value.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidSeed`] for a zero seed.
    pub fn new(seed: u32, start_frame: Frame, inputs: Vec<InputPair>) -> RiposteResult<Self> {
        if seed == 0 {
            return Err(RiposteError::InvalidSeed);
        }
        Ok(Self {
            seed,
            start_frame,
            inputs: inputs.into_boxed_slice(),
        })
    }

    /// The simulation seed.
    #[inline]
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// The frame the recording started on. Always 0 for replays built by
    /// [`ReplayRecorder`]; playback only supports 0.
    #[inline]
    #[must_use]
    pub fn start_frame(&self) -> Frame {
        self.start_frame
    }

    /// The recorded input pairs, one per frame.
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[InputPair] {
        &self.inputs
    }

    /// The number of recorded frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether no frames were recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// A growable recorder for an in-progress session.
///
/// [`build`](Self::build) snapshots the recording into an immutable
/// [`Replay`] by deep copy; the recorder remains usable and can keep
/// appending afterwards.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    seed: u32,
    inputs: Vec<InputPair>,
}

impl ReplayRecorder {
    /// Creates a recorder for a session seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::InvalidSeed`] for a zero seed.
    pub fn new(seed: u32) -> RiposteResult<Self> {
        if seed == 0 {
            return Err(RiposteError::InvalidSeed);
        }
        Ok(Self {
            seed,
            inputs: Vec::new(),
        })
    }

    /// Appends one frame of inputs.
    pub fn append(&mut self, p1: Buttons, p2: Buttons) {
        self.inputs.push(InputPair::new(p1, p2));
    }

    /// The number of frames recorded so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether nothing has been recorded yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Snapshots the recording into an immutable replay starting at
    /// frame 0.
    #[must_use]
    pub fn build(&self) -> Replay {
        Replay {
            seed: self.seed,
            start_frame: Frame::ZERO,
            inputs: self.inputs.clone().into_boxed_slice(),
        }
    }
}

/// Plays a replay back to its final state.
///
/// Stateless: two calls with the same replay return bit-identical states.
///
/// # Errors
///
/// Returns [`RiposteError::UnsupportedStartFrame`] for a replay that does
/// not start at frame 0.
pub fn play(replay: &Replay) -> RiposteResult<SimState> {
    if replay.start_frame() != Frame::ZERO {
        return Err(RiposteError::UnsupportedStartFrame {
            start_frame: replay.start_frame(),
        });
    }
    let mut state = SimState::new(replay.seed())?;
    for pair in replay.inputs() {
        state = step(state, pair.p1, pair.p2);
    }
    Ok(state)
}

/// Plays a replay back and fingerprints the final state.
///
/// # Errors
///
/// Same conditions as [`play`].
pub fn play_and_checksum(replay: &Replay) -> RiposteResult<u32> {
    Ok(state_checksum(&play(replay)?))
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
    fn recorder_rejects_zero_seed() {
        assert_eq!(ReplayRecorder::new(0).unwrap_err(), RiposteError::InvalidSeed);
    }

    #[test]
    fn replay_rejects_zero_seed() {
        assert_eq!(
            Replay::new(0, Frame::ZERO, Vec::new()).unwrap_err(),
            RiposteError::InvalidSeed
        );
    }

    #[test]
    fn recorder_counts_appends() {
        let mut recorder = ReplayRecorder::new(5).unwrap();
        assert!(recorder.is_empty());
        recorder.append(Buttons::LEFT, Buttons::RIGHT);
        recorder.append(Buttons::JUMP, Buttons::NEUTRAL);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn build_is_a_snapshot() {
        let mut recorder = ReplayRecorder::new(5).unwrap();
        recorder.append(Buttons::LEFT, Buttons::NEUTRAL);
        let early = recorder.build();
        recorder.append(Buttons::RIGHT, Buttons::NEUTRAL);
        let late = recorder.build();
        assert_eq!(early.len(), 1);
        assert_eq!(late.len(), 2);
        assert_eq!(early.inputs()[0], InputPair::new(Buttons::LEFT, Buttons::NEUTRAL));
    }

    #[test]
    fn play_of_empty_replay_is_initial_state() {
        let replay = ReplayRecorder::new(3).unwrap().build();
        assert_eq!(play(&replay).unwrap(), SimState::new(3).unwrap());
    }

    #[test]
    fn play_matches_direct_stepping() {
        let mut recorder = ReplayRecorder::new(11).unwrap();
        let mut state = SimState::new(11).unwrap();
        for raw in 0..120u32 {
            let p1 = if raw % 3 == 0 { Buttons::RIGHT } else { Buttons::NEUTRAL };
            let p2 = if raw % 7 == 0 { Buttons::LEFT | Buttons::JUMP } else { Buttons::LEFT };
            recorder.append(p1, p2);
            state = step(state, p1, p2);
        }
        let replayed = play(&recorder.build()).unwrap();
        assert_eq!(replayed, state);
        assert_eq!(
            play_and_checksum(&recorder.build()).unwrap(),
            state_checksum(&state)
        );
    }

    #[test]
    fn play_is_repeatable() {
        let mut recorder = ReplayRecorder::new(42).unwrap();
        for _ in 0..60 {
            recorder.append(Buttons::ATTACK, Buttons::LEFT);
        }
        let replay = recorder.build();
        assert_eq!(play(&replay).unwrap(), play(&replay).unwrap());
    }

    #[test]
    fn nonzero_start_frame_is_unsupported() {
        let replay = Replay::new(1, Frame::new(30), Vec::new()).unwrap();
        assert_eq!(
            play(&replay).unwrap_err(),
            RiposteError::UnsupportedStartFrame {
                start_frame: Frame::new(30)
            }
        );
    }
}
