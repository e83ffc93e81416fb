//! Convenient re-exports for common usage.
//!
//! ```
//! use riposte_netcode::prelude::*;
//!
//! let session = RollbackSession::new(SimState::new(1)?, 32, PlayerSide::P1)?;
//! assert_eq!(session.current_frame(), Frame::ZERO);
//! # Ok::<(), RiposteError>(())
//! ```

pub use crate::error::{CorruptReason, EncodeErrorKind, RiposteError};
pub use crate::hash::{state_checksum, StateHasher};
pub use crate::history::{InputRing, SnapshotRing};
pub use crate::input::{Buttons, InputPair};
pub use crate::replay::container::{read_replay, write_replay};
pub use crate::replay::{play, play_and_checksum, Replay, ReplayRecorder};
pub use crate::rng::XorShift32;
pub use crate::session::{RollbackSession, RollbackStats};
pub use crate::sim::{step, ActionState, PlayerState, SimState};
pub use crate::wire::{decode, decode_into, ChecksumReport, InputPacket, PacketHeader};
pub use crate::{Frame, PlayerSide, RiposteResult};
