//! The RPLK v1 on-disk replay container.
//!
//! Little-endian throughout, no compression. A fixed 32-byte header is
//! followed by the raw input payload:
//!
//! | Offset | Size | Field       | Value                                  |
//! |--------|------|-------------|----------------------------------------|
//! | 0      | 4    | Magic       | ASCII `"RPLK"`                         |
//! | 4      | 1    | Version     | 1                                      |
//! | 5      | 1    | Flags       | 0 (reserved)                           |
//! | 6      | 2    | Header size | 32                                     |
//! | 8      | 4    | Seed        | u32                                    |
//! | 12     | 4    | Start frame | u32                                    |
//! | 16     | 4    | Frame count | u32                                    |
//! | 20     | 4    | Payload CRC | CRC-32/IEEE over the payload only      |
//! | 24     | 8    | Reserved    | zeros                                  |
//!
//! The payload is `frame_count × 4` bytes: per frame, player 1's buttons as
//! a `u16` then player 2's.
//!
//! A corrupt file is a user-visible condition, so the reader returns typed
//! errors naming the first failed validation step, unlike the wire
//! decoder, which drops malformed datagrams silently.

use std::io::{ErrorKind, Read, Write};

use crate::crc::{crc32, Crc32};
use crate::error::CorruptReason;
use crate::input::{Buttons, InputPair};
use crate::replay::Replay;
use crate::{Frame, RiposteError, RiposteResult};

/// The RPLK magic bytes.
pub const REPLAY_MAGIC: [u8; 4] = *b"RPLK";

/// The container version this build writes and reads.
pub const REPLAY_VERSION: u8 = 1;

/// The fixed header size in bytes.
pub const REPLAY_HEADER_SIZE: usize = 32;

/// Caps the speculative payload preallocation so a corrupt frame count
/// cannot trigger a huge allocation before any byte is read.
const PREALLOC_CAP: usize = 64 * 1024;

fn io_error(error: &std::io::Error, context: &'static str) -> RiposteError {
    if error.kind() == ErrorKind::UnexpectedEof {
        RiposteError::Truncated { context }
    } else {
        RiposteError::Io {
            context: error.to_string(),
        }
    }
}

/// Writes a replay in RPLK v1 form.
///
/// # Errors
///
/// Returns [`RiposteError::UnsupportedStartFrame`] for a replay that does
/// not start at frame 0, and [`RiposteError::Io`] if the writer fails.
pub fn write_replay<W: Write>(writer: &mut W, replay: &Replay) -> RiposteResult<()> {
    if replay.start_frame() != Frame::ZERO {
        return Err(RiposteError::UnsupportedStartFrame {
            start_frame: replay.start_frame(),
        });
    }

    let mut payload = Vec::with_capacity(replay.len() * 4);
    for pair in replay.inputs() {
        payload.extend_from_slice(&pair.p1.bits().to_le_bytes());
        payload.extend_from_slice(&pair.p2.bits().to_le_bytes());
    }

    let mut header = [0u8; REPLAY_HEADER_SIZE];
    header[0..4].copy_from_slice(&REPLAY_MAGIC);
    header[4] = REPLAY_VERSION;
    header[5] = 0; // flags, reserved
    header[6..8].copy_from_slice(&(REPLAY_HEADER_SIZE as u16).to_le_bytes());
    header[8..12].copy_from_slice(&replay.seed().to_le_bytes());
    header[12..16].copy_from_slice(&replay.start_frame().raw().to_le_bytes());
    header[16..20].copy_from_slice(&(replay.len() as u32).to_le_bytes());
    header[20..24].copy_from_slice(&crc32(&payload).to_le_bytes());
    // bytes 24..32 stay zero, reserved

    writer
        .write_all(&header)
        .map_err(|e| io_error(&e, "replay header"))?;
    writer
        .write_all(&payload)
        .map_err(|e| io_error(&e, "replay payload"))?;
    Ok(())
}

/// Reads an RPLK v1 replay.
///
/// Validation order, failing on the first violation: magic bytes, version,
/// header size, payload length against the declared frame count, payload
/// CRC. Trailing bytes after the payload are left unread.
///
/// # Errors
///
/// - [`RiposteError::Truncated`] when the stream ends inside the header or
///   payload;
/// - [`RiposteError::Corrupt`] naming the failed validation step;
/// - [`RiposteError::UnsupportedVersion`] for any version other than 1;
/// - [`RiposteError::Io`] for other reader failures.
pub fn read_replay<R: Read>(reader: &mut R) -> RiposteResult<Replay> {
    let mut header = [0u8; REPLAY_HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .map_err(|e| io_error(&e, "replay header"))?;

    let magic = [header[0], header[1], header[2], header[3]];
    if magic != REPLAY_MAGIC {
        return Err(RiposteError::Corrupt {
            reason: CorruptReason::BadMagic { found: magic },
        });
    }
    let version = header[4];
    if version != REPLAY_VERSION {
        return Err(RiposteError::UnsupportedVersion { version });
    }
    let header_size = u16::from_le_bytes([header[6], header[7]]);
    if header_size != REPLAY_HEADER_SIZE as u16 {
        return Err(RiposteError::Corrupt {
            reason: CorruptReason::WrongHeaderSize { found: header_size },
        });
    }

    let seed = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    let start_frame = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    let frame_count = u32::from_le_bytes([header[16], header[17], header[18], header[19]]);
    let declared_crc = u32::from_le_bytes([header[20], header[21], header[22], header[23]]);

    let payload_len = frame_count as u64 * 4;
    let mut payload = Vec::with_capacity(payload_len.min(PREALLOC_CAP as u64) as usize);
    let mut limited = reader.take(payload_len);
    limited
        .read_to_end(&mut payload)
        .map_err(|e| io_error(&e, "replay payload"))?;
    if payload.len() as u64 != payload_len {
        return Err(RiposteError::Truncated {
            context: "replay payload",
        });
    }

    let mut crc = Crc32::new();
    crc.update(&payload);
    let computed = crc.finish();
    if computed != declared_crc {
        return Err(RiposteError::Corrupt {
            reason: CorruptReason::ChecksumMismatch {
                declared: declared_crc,
                computed,
            },
        });
    }

    let mut inputs = Vec::with_capacity(frame_count as usize);
    for chunk in payload.chunks_exact(4) {
        let p1 = Buttons::from_bits(u16::from_le_bytes([chunk[0], chunk[1]]));
        let p2 = Buttons::from_bits(u16::from_le_bytes([chunk[2], chunk[3]]));
        inputs.push(InputPair::new(p1, p2));
    }
    Replay::new(seed, Frame::new(start_frame), inputs)
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
    use crate::replay::ReplayRecorder;

    fn sample_replay() -> Replay {
        let mut recorder = ReplayRecorder::new(0xC0FF_EE01).unwrap();
        recorder.append(Buttons::RIGHT, Buttons::LEFT);
        recorder.append(Buttons::RIGHT | Buttons::JUMP, Buttons::NEUTRAL);
        recorder.append(Buttons::ATTACK, Buttons::from_bits(0xFFFF));
        recorder.build()
    }

    fn encode(replay: &Replay) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_replay(&mut bytes, replay).unwrap();
        bytes
    }

    #[test]
    fn header_layout_is_pinned() {
        let bytes = encode(&sample_replay());
        assert_eq!(&bytes[0..4], b"RPLK");
        assert_eq!(bytes[4], 1); // version
        assert_eq!(bytes[5], 0); // flags
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 32);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            0xC0FF_EE01
        );
        assert_eq!(
            u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            0
        );
        assert_eq!(
            u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            3
        );
        assert_eq!(&bytes[24..32], &[0u8; 8]);
        assert_eq!(bytes.len(), 32 + 3 * 4);
        // First frame's buttons, little-endian u16 pair.
        assert_eq!(
            u16::from_le_bytes([bytes[32], bytes[33]]),
            Buttons::RIGHT.bits()
        );
        assert_eq!(
            u16::from_le_bytes([bytes[34], bytes[35]]),
            Buttons::LEFT.bits()
        );
    }

    #[test]
    fn round_trip_preserves_everything() {
        let replay = sample_replay();
        let bytes = encode(&replay);
        let decoded = read_replay(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, replay);
    }

    #[test]
    fn empty_replay_round_trips() {
        let replay = ReplayRecorder::new(1).unwrap().build();
        let bytes = encode(&replay);
        assert_eq!(bytes.len(), REPLAY_HEADER_SIZE);
        let decoded = read_replay(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, replay);
    }

    #[test]
    fn bad_magic_is_rejected_first() {
        let mut bytes = encode(&sample_replay());
        bytes[0] = b'X';
        // Also break the version; magic must win.
        bytes[4] = 9;
        let err = read_replay(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            RiposteError::Corrupt {
                reason: CorruptReason::BadMagic { .. }
            }
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes = encode(&sample_replay());
        bytes[4] = 2;
        assert_eq!(
            read_replay(&mut bytes.as_slice()).unwrap_err(),
            RiposteError::UnsupportedVersion { version: 2 }
        );
    }

    #[test]
    fn wrong_header_size_is_rejected() {
        let mut bytes = encode(&sample_replay());
        bytes[6] = 16;
        assert_eq!(
            read_replay(&mut bytes.as_slice()).unwrap_err(),
            RiposteError::Corrupt {
                reason: CorruptReason::WrongHeaderSize { found: 16 }
            }
        );
    }

    #[test]
    fn any_payload_bit_flip_is_caught() {
        let clean = encode(&sample_replay());
        for index in REPLAY_HEADER_SIZE..clean.len() {
            for bit in 0..8 {
                let mut corrupted = clean.clone();
                corrupted[index] ^= 1 << bit;
                let err = read_replay(&mut corrupted.as_slice()).unwrap_err();
                assert!(
                    matches!(
                        err,
                        RiposteError::Corrupt {
                            reason: CorruptReason::ChecksumMismatch { .. }
                        }
                    ),
                    "flip at byte {} bit {} was not caught",
                    index,
                    bit
                );
            }
        }
    }

    #[test]
    fn truncated_header_is_reported() {
        let bytes = encode(&sample_replay());
        let err = read_replay(&mut bytes[..10].as_ref()).unwrap_err();
        assert_eq!(
            err,
            RiposteError::Truncated {
                context: "replay header"
            }
        );
    }

    #[test]
    fn truncated_payload_is_reported() {
        let bytes = encode(&sample_replay());
        let err = read_replay(&mut bytes[..bytes.len() - 1].as_ref()).unwrap_err();
        assert_eq!(
            err,
            RiposteError::Truncated {
                context: "replay payload"
            }
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = encode(&sample_replay());
        bytes.extend_from_slice(b"garbage after the payload");
        let decoded = read_replay(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, sample_replay());
    }

    #[test]
    fn nonzero_start_frame_cannot_be_written() {
        let replay = Replay::new(1, Frame::new(60), Vec::new()).unwrap();
        let mut sink = Vec::new();
        assert_eq!(
            write_replay(&mut sink, &replay).unwrap_err(),
            RiposteError::UnsupportedStartFrame {
                start_frame: Frame::new(60)
            }
        );
        assert!(sink.is_empty());
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
    use crate::replay::ReplayRecorder;
    use proptest::prelude::*;

    proptest! {
        /// Write-then-read returns the identical replay for arbitrary
        /// seeds and button patterns, reserved bits included.
        #[test]
        fn prop_round_trip(
            seed in 1u32..,
            frames in proptest::collection::vec((any::<u16>(), any::<u16>()), 0..200),
        ) {
            let mut recorder = ReplayRecorder::new(seed).unwrap();
            for &(p1, p2) in &frames {
                recorder.append(Buttons::from_bits(p1), Buttons::from_bits(p2));
            }
            let replay = recorder.build();
            let mut bytes = Vec::new();
            write_replay(&mut bytes, &replay).unwrap();
            let decoded = read_replay(&mut bytes.as_slice()).unwrap();
            prop_assert_eq!(decoded, replay);
        }
    }
}
