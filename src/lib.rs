//! # Riposte Netcode
//!
//! Riposte is the core of a rollback-netcode engine for deterministic
//! two-player real-time simulations, written in 100% safe Rust.
//!
//! Two remote peers each run an identical fixed-point simulation at a fixed
//! tick rate. Each peer sees its own input with zero delay but must predict
//! the opponent's input, later correcting the timeline when the real remote
//! input arrives: rewind to the mispredicted frame, replace the predicted
//! input with the confirmed one, and re-simulate forward to the present.
//!
//! The crate provides four things:
//!
//! - a deterministic fixed-point [simulation step](sim::step): a pure state
//!   transition over player state, PRNG state and a frame counter;
//! - a [rollback session](session::RollbackSession): ring buffers of inputs
//!   and state snapshots, repeat-last prediction, mismatch detection and
//!   re-simulation;
//! - a [replay pipeline](replay): inputs-only record/play plus the RPLK
//!   binary on-disk container with CRC-32 payload integrity;
//! - a [wire codec](wire): the RBN1 binary input packet for UDP transport
//!   with redundant last-N-frames delivery and an optional state-hash field
//!   for desync detection.
//!
//! Everything else (rendering, input polling, the socket and its handshake
//! state machine) belongs to the caller. The core never spawns threads,
//! never reads a clock, and never touches a file or socket on its own.
//!
//! ## Example
//!
//! ```
//! use riposte_netcode::{Buttons, Frame, PlayerSide, RollbackSession, SimState};
//!
//! let initial = SimState::new(7)?;
//! let mut session = RollbackSession::new(initial, 64, PlayerSide::P1)?;
//!
//! // Advance one frame with a confirmed local input; the remote input is
//! // predicted until it arrives.
//! session.tick(Buttons::RIGHT);
//!
//! // A confirmed remote input for a past frame triggers a rollback when it
//! // contradicts the prediction.
//! session.set_remote_input(Frame::new(0), Buttons::ATTACK)?;
//! assert_eq!(session.current_frame(), Frame::new(1));
//! # Ok::<(), riposte_netcode::RiposteError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![warn(rustdoc::invalid_html_tags)]
#![warn(rustdoc::bare_urls)]

pub use error::{CorruptReason, EncodeErrorKind, RiposteError};

/// A specialized `Result` type for riposte-netcode operations.
///
/// This alias is named `RiposteResult` rather than `Result` so that glob
/// imports (`use riposte_netcode::prelude::*;`) never shadow
/// `std::result::Result`. The second type parameter can be overridden where
/// a different error type is needed.
pub type RiposteResult<T, E = RiposteError> = std::result::Result<T, E>;

pub mod crc;
pub mod error;
pub mod hash;
pub mod history;
pub mod input;
pub mod prelude;
pub mod replay;
pub mod rng;
pub mod session;
pub mod sim;
pub mod wire;

pub use hash::state_checksum;
pub use history::{InputRing, SnapshotRing};
pub use input::{Buttons, InputPair};
pub use replay::{play, play_and_checksum, Replay, ReplayRecorder};
pub use rng::XorShift32;
pub use session::{RollbackSession, RollbackStats};
pub use sim::{step, ActionState, SimState};
pub use wire::{ChecksumReport, InputPacket, PacketHeader};

// Re-export smallvec so users can name the packet input storage type.
pub use smallvec::SmallVec;

/// A monotonically non-decreasing frame index.
///
/// Frames are the fundamental unit of time in rollback networking: the
/// `k`-th input pair drives the transition from state `k` to state `k + 1`.
/// Frame numbers start at 0 and increment once per tick; at 60 ticks per
/// second the 32-bit counter lasts roughly 828 days, so wraparound is
/// treated as unreachable.
///
/// The maximum representable value is reserved as the [`Frame::NONE`]
/// sentinel. Ring buffers use it to tag never-written slots, which halves
/// their auxiliary memory compared to a parallel `bool` array.
///
/// # Ordering caveat
///
/// `Frame` derives `Ord` over the raw counter, so [`Frame::NONE`] compares
/// *greater* than every valid frame. Check [`is_none`](Frame::is_none)
/// before ordering comparisons whenever a sentinel can be in play.
///
/// # Examples
///
/// ```
/// use riposte_netcode::Frame;
///
/// let frame = Frame::new(41);
/// assert_eq!(frame + 1, Frame::new(42));
/// assert!(frame.is_some());
/// assert!(Frame::NONE.is_none());
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Frame(u32);

impl Frame {
    /// The reserved sentinel meaning "no frame" / "never written".
    pub const NONE: Self = Self(u32::MAX);

    /// Frame 0, the first simulated frame.
    pub const ZERO: Self = Self(0);

    /// Creates a `Frame` from a raw counter value.
    ///
    /// `u32::MAX` yields [`Frame::NONE`]; no other validation is performed.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is the [`Frame::NONE`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns `true` if this is a usable frame index (not the sentinel).
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Returns `Some(self)` for a usable frame, `None` for the sentinel.
    #[inline]
    #[must_use]
    pub const fn to_option(self) -> Option<Self> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    /// Adds to the frame counter, returning `None` on overflow or when the
    /// result would collide with the [`Frame::NONE`] sentinel.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u32) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(raw) if raw != u32::MAX => Some(Self(raw)),
            _ => None,
        }
    }

    /// Subtracts from the frame counter, saturating at frame 0.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: u32) -> Self {
        Self(self.0.saturating_sub(rhs))
    }

    /// The ring-buffer slot this frame occupies for the given capacity.
    ///
    /// Returns `None` for the sentinel or a zero capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use riposte_netcode::Frame;
    ///
    /// assert_eq!(Frame::new(7).buffer_index(4), Some(3));
    /// assert_eq!(Frame::NONE.buffer_index(4), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn buffer_index(self, capacity: usize) -> Option<usize> {
        if self.is_none() || capacity == 0 {
            None
        } else {
            Some(self.0 as usize % capacity)
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::ops::Add<u32> for Frame {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::AddAssign<u32> for Frame {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

impl From<u32> for Frame {
    #[inline]
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Frame> for u32 {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

impl PartialEq<u32> for Frame {
    #[inline]
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

/// Which player the local peer controls.
///
/// The session maps `(local, remote)` inputs onto `(p1, p2)` according to
/// this value. Invalid roles are unrepresentable: there is no third variant.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum PlayerSide {
    /// The local peer controls player 1.
    P1,
    /// The local peer controls player 2.
    P2,
}

impl PlayerSide {
    /// The opposite side.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::P1 => Self::P2,
            Self::P2 => Self::P1,
        }
    }
}

impl std::fmt::Display for PlayerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P1 => write!(f, "P1"),
            Self::P2 => write!(f, "P2"),
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

    #[test]
    fn frame_none_is_sentinel() {
        assert!(Frame::NONE.is_none());
        assert!(!Frame::NONE.is_some());
        assert_eq!(Frame::NONE.raw(), u32::MAX);
        assert_eq!(Frame::NONE.to_option(), None);
    }

    #[test]
    fn frame_zero_is_some() {
        assert!(Frame::ZERO.is_some());
        assert_eq!(Frame::ZERO.to_option(), Some(Frame::new(0)));
    }

    #[test]
    fn frame_checked_add_rejects_sentinel_collision() {
        assert_eq!(Frame::new(5).checked_add(1), Some(Frame::new(6)));
        assert_eq!(Frame::new(u32::MAX - 1).checked_add(1), None);
        assert_eq!(Frame::NONE.checked_add(1), None);
    }

    #[test]
    fn frame_saturating_sub_stops_at_zero() {
        assert_eq!(Frame::new(5).saturating_sub(3), Frame::new(2));
        assert_eq!(Frame::new(2).saturating_sub(5), Frame::new(0));
    }

    #[test]
    fn frame_buffer_index() {
        assert_eq!(Frame::new(0).buffer_index(8), Some(0));
        assert_eq!(Frame::new(13).buffer_index(8), Some(5));
        assert_eq!(Frame::NONE.buffer_index(8), None);
        assert_eq!(Frame::new(13).buffer_index(0), None);
    }

    #[test]
    fn frame_display() {
        assert_eq!(format!("{}", Frame::new(42)), "42");
        assert_eq!(format!("{}", Frame::NONE), "NONE");
    }

    #[test]
    fn frame_ordering_sentinel_caveat() {
        // NONE is the largest raw value; ordering against it must be guarded.
        assert!(Frame::NONE > Frame::new(1_000_000));
    }

    #[test]
    fn frame_compares_against_u32() {
        assert_eq!(Frame::new(9), 9u32);
    }

    #[test]
    fn player_side_opponent() {
        assert_eq!(PlayerSide::P1.opponent(), PlayerSide::P2);
        assert_eq!(PlayerSide::P2.opponent(), PlayerSide::P1);
    }

    #[test]
    fn player_side_display() {
        assert_eq!(format!("{}", PlayerSide::P1), "P1");
        assert_eq!(format!("{}", PlayerSide::P2), "P2");
    }
}
