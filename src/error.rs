//! Error types for riposte-netcode.
//!
//! Every fallible operation in the crate returns [`RiposteError`] to its
//! immediate caller. The core never logs an error and never recovers
//! silently; the one deliberate exception is the wire decoder, which is
//! `Option`-valued so that stray datagrams are dropped without ceremony
//! (see [`wire::decode`](crate::wire::decode)).
//!
//! Variants that can occur on hot paths carry their debugging data as plain
//! fields and format lazily in `Display`, so constructing an error never
//! allocates.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::Frame;

/// Why a byte stream was rejected as corrupt.
///
/// Stored as structured fields rather than a `String` so that validation
/// failures cost nothing to construct; the message is only rendered when
/// the error is actually displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CorruptReason {
    /// The magic bytes at the start of the stream did not match.
    BadMagic {
        /// The four bytes actually found.
        found: [u8; 4],
    },
    /// The declared header size field did not match the fixed layout.
    WrongHeaderSize {
        /// The header size actually declared.
        found: u16,
    },
    /// The recomputed payload CRC did not match the declared one.
    ChecksumMismatch {
        /// The CRC declared in the header.
        declared: u32,
        /// The CRC recomputed over the payload actually read.
        computed: u32,
    },
}

impl Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { found } => {
                write!(
                    f,
                    "bad magic bytes {:02X} {:02X} {:02X} {:02X}",
                    found[0], found[1], found[2], found[3]
                )
            },
            Self::WrongHeaderSize { found } => {
                write!(f, "wrong header size {}", found)
            },
            Self::ChecksumMismatch { declared, computed } => {
                write!(
                    f,
                    "payload CRC mismatch (declared {:#010X}, computed {:#010X})",
                    declared, computed
                )
            },
        }
    }
}

/// Why a packet could not be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EncodeErrorKind {
    /// The packet's input count was outside the protocol range.
    FrameCountOutOfRange {
        /// The number of inputs in the packet.
        count: usize,
    },
    /// The destination buffer was too small for the encoded packet.
    DestinationTooSmall {
        /// The number of bytes the encoded packet needs.
        required: usize,
        /// The number of bytes the caller provided.
        provided: usize,
    },
}

impl Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameCountOutOfRange { count } => {
                write!(f, "input count {} outside the allowed range 1..=32", count)
            },
            Self::DestinationTooSmall { required, provided } => {
                write!(
                    f,
                    "destination buffer too small ({} bytes provided, {} required)",
                    provided, required
                )
            },
        }
    }
}

/// All errors this crate can return.
///
/// # Forward Compatibility
///
/// The enum is `#[non_exhaustive]`: new variants may appear in future
/// versions, so downstream matches should keep a wildcard arm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RiposteError {
    /// A simulation or replay seed was zero. Zero is the absorbing state of
    /// the XorShift32 recurrence and can never be used.
    InvalidSeed,
    /// A ring-buffer capacity below the minimum of 2 was requested.
    InvalidHistoryCapacity {
        /// The capacity that was requested.
        capacity: usize,
    },
    /// A bounded random draw was requested with an upper bound of zero.
    InvalidBound,
    /// A ranged random draw was requested with an empty range.
    InvalidRange {
        /// The inclusive lower end of the requested range.
        min: i32,
        /// The exclusive upper end of the requested range.
        max: i32,
    },
    /// A packet could not be encoded with the given arguments.
    EncodeError {
        /// What was wrong with the encode request.
        kind: EncodeErrorKind,
    },
    /// The replay starts at a non-zero frame, which playback and the
    /// on-disk container do not support.
    UnsupportedStartFrame {
        /// The start frame the replay declared.
        start_frame: Frame,
    },
    /// The stream declared a format version this build does not read.
    UnsupportedVersion {
        /// The version actually declared.
        version: u8,
    },
    /// The stream failed an integrity check.
    Corrupt {
        /// The first validation step that failed.
        reason: CorruptReason,
    },
    /// A rollback target was requested whose snapshot has been evicted from
    /// the history ring.
    InsufficientHistory {
        /// The frame the rollback needed.
        frame: Frame,
        /// The history capacity the session was built with.
        capacity: usize,
    },
    /// Re-simulation found no recorded local input for a past frame.
    ///
    /// Local inputs are recorded by every `tick`, so this is a programming
    /// error in the caller or the crate, not a runtime condition.
    MissingLocalInput {
        /// The frame whose local input was missing.
        frame: Frame,
    },
    /// The stream ended before the declared number of bytes could be read.
    Truncated {
        /// What was being read when the stream ended.
        context: &'static str,
    },
    /// An I/O operation failed for a reason other than early end-of-stream.
    ///
    /// The underlying error is stored as a `String` so this enum stays
    /// `Clone + PartialEq`, which `std::io::Error` is not; callers that
    /// need the original error should inspect it before conversion.
    Io {
        /// The rendered I/O error.
        context: String,
    },
}

impl Display for RiposteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSeed => {
                write!(f, "seed must be non-zero (zero is the PRNG absorbing state)")
            },
            Self::InvalidHistoryCapacity { capacity } => {
                write!(f, "history capacity must be at least 2, got {}", capacity)
            },
            Self::InvalidBound => {
                write!(f, "bounded random draw requires a non-zero upper bound")
            },
            Self::InvalidRange { min, max } => {
                write!(f, "ranged random draw requires min < max, got [{}, {})", min, max)
            },
            Self::EncodeError { kind } => {
                write!(f, "cannot encode packet: {}", kind)
            },
            Self::UnsupportedStartFrame { start_frame } => {
                write!(
                    f,
                    "replays starting at frame {} are unsupported (only frame 0)",
                    start_frame
                )
            },
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported format version {}", version)
            },
            Self::Corrupt { reason } => {
                write!(f, "corrupt data: {}", reason)
            },
            Self::InsufficientHistory { frame, capacity } => {
                write!(
                    f,
                    "cannot roll back to frame {}: its snapshot was evicted from a \
                     {}-slot history; raise the session's history capacity to cover \
                     the worst observed input delay",
                    frame, capacity
                )
            },
            Self::MissingLocalInput { frame } => {
                write!(
                    f,
                    "no recorded local input for frame {} during re-simulation \
                     (please report as a bug)",
                    frame
                )
            },
            Self::Truncated { context } => {
                write!(f, "stream ended early while reading {}", context)
            },
            Self::Io { context } => {
                write!(f, "I/O error: {}", context)
            },
        }
    }
}

impl Error for RiposteError {
    /// Returns the lower-level source of this error, if any.
    ///
    /// Error context is stored as fields or strings rather than wrapped
    /// error values, keeping the type `Clone` and `PartialEq` (which
    /// `dyn Error` cannot be). There is therefore never a source.
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
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
    fn invalid_seed_display() {
        let msg = format!("{}", RiposteError::InvalidSeed);
        assert!(msg.contains("non-zero"));
        assert!(msg.contains("absorbing"));
    }

    #[test]
    fn invalid_history_capacity_display() {
        let err = RiposteError::InvalidHistoryCapacity { capacity: 1 };
        let msg = format!("{}", err);
        assert!(msg.contains("at least 2"));
        assert!(msg.contains('1'));
    }

    #[test]
    fn invalid_range_display() {
        let err = RiposteError::InvalidRange { min: 7, max: 7 };
        let msg = format!("{}", err);
        assert!(msg.contains("[7, 7)"));
    }

    #[test]
    fn encode_error_display() {
        let err = RiposteError::EncodeError {
            kind: EncodeErrorKind::FrameCountOutOfRange { count: 33 },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("33"));
        assert!(msg.contains("1..=32"));

        let err = RiposteError::EncodeError {
            kind: EncodeErrorKind::DestinationTooSmall {
                required: 17,
                provided: 4,
            },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("17"));
        assert!(msg.contains('4'));
    }

    #[test]
    fn unsupported_start_frame_display() {
        let err = RiposteError::UnsupportedStartFrame {
            start_frame: Frame::new(30),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("30"));
        assert!(msg.contains("frame 0"));
    }

    #[test]
    fn corrupt_bad_magic_display() {
        let err = RiposteError::Corrupt {
            reason: CorruptReason::BadMagic {
                found: [0xDE, 0xAD, 0xBE, 0xEF],
            },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("DE AD BE EF"));
    }

    #[test]
    fn corrupt_checksum_mismatch_display() {
        let err = RiposteError::Corrupt {
            reason: CorruptReason::ChecksumMismatch {
                declared: 0x12345678,
                computed: 0x9ABCDEF0,
            },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("0x12345678"));
        assert!(msg.contains("0x9ABCDEF0"));
    }

    #[test]
    fn insufficient_history_display_names_the_fix() {
        let err = RiposteError::InsufficientHistory {
            frame: Frame::new(12),
            capacity: 8,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("frame 12"));
        assert!(msg.contains("raise"));
        assert!(msg.contains("history capacity"));
    }

    #[test]
    fn missing_local_input_display() {
        let err = RiposteError::MissingLocalInput {
            frame: Frame::new(4),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("frame 4"));
        assert!(msg.contains("bug"));
    }

    #[test]
    fn truncated_display() {
        let err = RiposteError::Truncated {
            context: "replay payload",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("replay payload"));
    }

    #[test]
    fn errors_are_cloneable_and_comparable() {
        let err = RiposteError::InvalidSeed;
        assert_eq!(err.clone(), err);
        assert_ne!(err, RiposteError::InvalidBound);
    }

    #[test]
    fn error_implements_std_error() {
        let err: Box<dyn Error> = Box::new(RiposteError::InvalidSeed);
        assert!(err.source().is_none());
    }

    #[test]
    fn structured_reasons_are_copy() {
        let reason = CorruptReason::WrongHeaderSize { found: 16 };
        let copy = reason;
        assert_eq!(reason, copy);

        let kind = EncodeErrorKind::FrameCountOutOfRange { count: 0 };
        let copy = kind;
        assert_eq!(kind, copy);
    }
}
