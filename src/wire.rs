//! The RBN1 v1 wire packet codec.
//!
//! One packet carries up to 32 redundant input frames plus an optional
//! state-hash attachment, little-endian throughout:
//!
//! | Offset   | Size | Field          | Notes                               |
//! |----------|------|----------------|-------------------------------------|
//! | 0        | 4    | Magic          | ASCII `"RBN1"`                      |
//! | 4        | 1    | Version        | 1                                   |
//! | 5        | 1    | Flags          | bit 0 = has checksum; rest zero     |
//! | 6        | 4    | Start frame    | frame of the first input            |
//! | 10       | 1    | Count          | u8 in `[1, 32]`                     |
//! | 11       | 4    | Ack frame      | highest frame received from peer    |
//! | *15*     | *4*  | Checksum frame | present iff the checksum flag is set|
//! | *19*     | *4*  | Checksum       | present iff the checksum flag is set|
//! | 15 or 23 | 2·N  | Buttons        | one u16 per frame                   |
//!
//! The maximum encoded size is 87 bytes (23-byte header plus 32 two-byte
//! inputs), small enough to live on the stack.
//!
//! # Redundancy
//!
//! Each packet carries the frames `current − (count − 1) ..= current`, so a
//! single datagram loss never stalls the receiver: the next packet subsumes
//! the gap. The codec itself is transport-agnostic.
//!
//! # Failure contract
//!
//! Decoding returns `Option`: a malformed datagram yields `None` and is
//! expected to be dropped silently, so garbage on the wire cannot
//! destabilise a session. The checksum field is opaque here: the codec
//! neither computes nor interprets it, which keeps the codec and the
//! simulation testable in isolation.

use smallvec::SmallVec;

use crate::error::EncodeErrorKind;
use crate::input::Buttons;
use crate::{Frame, RiposteError, RiposteResult};

/// The RBN1 magic bytes.
pub const PACKET_MAGIC: [u8; 4] = *b"RBN1";

/// The packet version this build encodes and decodes.
pub const PACKET_VERSION: u8 = 1;

/// Flag bit 0: the checksum block is present.
pub const FLAG_HAS_CHECKSUM: u8 = 0x01;

/// The maximum number of input frames one packet may carry.
pub const MAX_FRAMES_PER_PACKET: usize = 32;

/// Header size without the checksum block.
pub const BASE_HEADER_SIZE: usize = 15;

/// Header size with the checksum block.
pub const CHECKSUM_HEADER_SIZE: usize = 23;

/// The largest possible encoded packet.
pub const MAX_PACKET_SIZE: usize = CHECKSUM_HEADER_SIZE + 2 * MAX_FRAMES_PER_PACKET;

/// Inline storage for a packet's inputs; never spills for valid packets.
pub type PacketInputs = SmallVec<[Buttons; MAX_FRAMES_PER_PACKET]>;

/// A state fingerprint attached to a packet for desync detection.
///
/// The value comes from [`state_checksum`](crate::hash::state_checksum) on
/// the sender; the codec carries it as an opaque `u32`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChecksumReport {
    /// The frame the checksum was computed at.
    pub frame: Frame,
    /// The fingerprint value.
    pub checksum: u32,
}

/// The fixed fields of a packet, separate from its input payload.
///
/// Returned by [`decode_into`] so zero-allocation callers get the metadata
/// without the codec touching the heap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    /// Frame of the first input in the payload.
    pub start_frame: Frame,
    /// Highest frame this peer has received from the other side.
    pub ack_frame: Frame,
    /// Optional desync-detection attachment.
    pub checksum: Option<ChecksumReport>,
    /// Number of inputs in the payload, in `[1, 32]`.
    pub count: u8,
}

/// A decoded (or to-be-encoded) RBN1 input packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPacket {
    /// Frame of the first input in `inputs`.
    pub start_frame: Frame,
    /// Highest frame this peer has received from the other side.
    pub ack_frame: Frame,
    /// Optional desync-detection attachment.
    pub checksum: Option<ChecksumReport>,
    /// The redundant input run: `inputs[i]` is the buttons for
    /// `start_frame + i`.
    pub inputs: PacketInputs,
}

impl InputPacket {
    /// The number of bytes [`encode`](Self::encode) will produce.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let header = if self.checksum.is_some() {
            CHECKSUM_HEADER_SIZE
        } else {
            BASE_HEADER_SIZE
        };
        header + 2 * self.inputs.len()
    }

    /// Encodes the packet into `dst`, returning the number of bytes
    /// written.
    ///
    /// The checksum value, if any, is written verbatim; computing it is the
    /// caller's business.
    ///
    /// # Errors
    ///
    /// Returns [`RiposteError::EncodeError`] when the input count is
    /// outside `[1, 32]` or `dst` is too small.
    pub fn encode(&self, dst: &mut [u8]) -> RiposteResult<usize> {
        let count = self.inputs.len();
        if count == 0 || count > MAX_FRAMES_PER_PACKET {
            return Err(RiposteError::EncodeError {
                kind: EncodeErrorKind::FrameCountOutOfRange { count },
            });
        }
        let required = self.encoded_len();
        if dst.len() < required {
            return Err(RiposteError::EncodeError {
                kind: EncodeErrorKind::DestinationTooSmall {
                    required,
                    provided: dst.len(),
                },
            });
        }

        dst[0..4].copy_from_slice(&PACKET_MAGIC);
        dst[4] = PACKET_VERSION;
        dst[5] = if self.checksum.is_some() {
            FLAG_HAS_CHECKSUM
        } else {
            0
        };
        dst[6..10].copy_from_slice(&self.start_frame.raw().to_le_bytes());
        dst[10] = count as u8;
        dst[11..15].copy_from_slice(&self.ack_frame.raw().to_le_bytes());

        let mut offset = BASE_HEADER_SIZE;
        if let Some(report) = self.checksum {
            dst[15..19].copy_from_slice(&report.frame.raw().to_le_bytes());
            dst[19..23].copy_from_slice(&report.checksum.to_le_bytes());
            offset = CHECKSUM_HEADER_SIZE;
        }
        for input in &self.inputs {
            dst[offset..offset + 2].copy_from_slice(&input.bits().to_le_bytes());
            offset += 2;
        }
        Ok(offset)
    }
}

fn read_u32_le(src: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = src.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

fn read_u16_le(src: &[u8], offset: usize) -> Option<u16> {
    let bytes: [u8; 2] = src.get(offset..offset + 2)?.try_into().ok()?;
    Some(u16::from_le_bytes(bytes))
}

/// Decodes a packet's header and writes its inputs into `inputs`.
///
/// This is the zero-allocation variant of [`decode`]: `inputs` must hold at
/// least `count` entries (providing [`MAX_FRAMES_PER_PACKET`] always
/// suffices); entries beyond the count are left untouched.
///
/// Validation runs strictly in order, failing at the first violation:
/// buffer at least 15 bytes, magic, version, no reserved flag bits, count
/// in `[1, 32]`, and an exact total length. `None` means "drop the
/// datagram".
#[must_use]
pub fn decode_into(src: &[u8], inputs: &mut [Buttons]) -> Option<PacketHeader> {
    if src.len() < BASE_HEADER_SIZE {
        return None;
    }
    let magic: [u8; 4] = src.get(0..4)?.try_into().ok()?;
    if magic != PACKET_MAGIC {
        return None;
    }
    if *src.get(4)? != PACKET_VERSION {
        return None;
    }
    let flags = *src.get(5)?;
    if flags & !FLAG_HAS_CHECKSUM != 0 {
        return None;
    }
    let has_checksum = flags & FLAG_HAS_CHECKSUM != 0;
    let count = *src.get(10)? as usize;
    if count == 0 || count > MAX_FRAMES_PER_PACKET {
        return None;
    }
    let header_size = if has_checksum {
        CHECKSUM_HEADER_SIZE
    } else {
        BASE_HEADER_SIZE
    };
    if src.len() != header_size + 2 * count {
        return None;
    }

    // Layout is fully validated; parse the fields.
    let start_frame = Frame::new(read_u32_le(src, 6)?);
    let ack_frame = Frame::new(read_u32_le(src, 11)?);
    let checksum = if has_checksum {
        Some(ChecksumReport {
            frame: Frame::new(read_u32_le(src, 15)?),
            checksum: read_u32_le(src, 19)?,
        })
    } else {
        None
    };

    let destination = inputs.get_mut(..count)?;
    for (index, slot) in destination.iter_mut().enumerate() {
        *slot = Buttons::from_bits(read_u16_le(src, header_size + 2 * index)?);
    }

    Some(PacketHeader {
        start_frame,
        ack_frame,
        checksum,
        count: count as u8,
    })
}

/// Decodes a packet.
///
/// Same validation as [`decode_into`]; the inputs land in an
/// inline-capacity vector, so this path does not allocate either for any
/// valid packet.
#[must_use]
pub fn decode(src: &[u8]) -> Option<InputPacket> {
    let mut inputs = [Buttons::NEUTRAL; MAX_FRAMES_PER_PACKET];
    let header = decode_into(src, &mut inputs)?;
    Some(InputPacket {
        start_frame: header.start_frame,
        ack_frame: header.ack_frame,
        checksum: header.checksum,
        inputs: PacketInputs::from_slice(&inputs[..header.count as usize]),
    })
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

    fn sample_packet() -> InputPacket {
        InputPacket {
            start_frame: Frame::new(120),
            ack_frame: Frame::new(118),
            checksum: None,
            inputs: PacketInputs::from_slice(&[
                Buttons::LEFT,
                Buttons::LEFT | Buttons::JUMP,
                Buttons::NEUTRAL,
            ]),
        }
    }

    #[test]
    fn pinned_minimal_layout() {
        // One input frame, no checksum: exactly 17 bytes with this layout.
        let packet = InputPacket {
            start_frame: Frame::new(1),
            ack_frame: Frame::new(2),
            checksum: None,
            inputs: PacketInputs::from_slice(&[Buttons::from_bits(0x0003)]),
        };
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        assert_eq!(written, 17);
        assert_eq!(
            &buffer[..written],
            &[
                0x52, 0x42, 0x4E, 0x31, // "RBN1"
                0x01, // version
                0x00, // flags
                0x01, 0x00, 0x00, 0x00, // start frame
                0x01, // count
                0x02, 0x00, 0x00, 0x00, // ack frame
                0x03, 0x00, // buttons
            ]
        );
    }

    #[test]
    fn round_trip_without_checksum() {
        let packet = sample_packet();
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        assert_eq!(written, packet.encoded_len());
        assert_eq!(decode(&buffer[..written]).unwrap(), packet);
    }

    #[test]
    fn round_trip_with_checksum() {
        let mut packet = sample_packet();
        packet.checksum = Some(ChecksumReport {
            frame: Frame::new(110),
            checksum: 0xDEAD_BEEF,
        });
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        assert_eq!(written, CHECKSUM_HEADER_SIZE + 2 * 3);
        assert_eq!(buffer[5], FLAG_HAS_CHECKSUM);
        assert_eq!(decode(&buffer[..written]).unwrap(), packet);
    }

    #[test]
    fn max_size_packet_fits_the_advertised_bound() {
        let packet = InputPacket {
            start_frame: Frame::new(1000),
            ack_frame: Frame::new(990),
            checksum: Some(ChecksumReport {
                frame: Frame::new(995),
                checksum: 7,
            }),
            inputs: PacketInputs::from_slice(&[Buttons::ATTACK; MAX_FRAMES_PER_PACKET]),
        };
        assert_eq!(packet.encoded_len(), MAX_PACKET_SIZE);
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        assert_eq!(written, 87);
        assert_eq!(decode(&buffer[..written]).unwrap(), packet);
    }

    #[test]
    fn encode_rejects_empty_and_oversized_counts() {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        let mut packet = sample_packet();
        packet.inputs.clear();
        assert_eq!(
            packet.encode(&mut buffer).unwrap_err(),
            RiposteError::EncodeError {
                kind: EncodeErrorKind::FrameCountOutOfRange { count: 0 }
            }
        );

        packet.inputs = PacketInputs::from_elem(Buttons::NEUTRAL, 33);
        assert_eq!(
            packet.encode(&mut buffer).unwrap_err(),
            RiposteError::EncodeError {
                kind: EncodeErrorKind::FrameCountOutOfRange { count: 33 }
            }
        );
    }

    #[test]
    fn encode_rejects_short_destination() {
        let packet = sample_packet();
        let mut tiny = [0u8; 8];
        assert_eq!(
            packet.encode(&mut tiny).unwrap_err(),
            RiposteError::EncodeError {
                kind: EncodeErrorKind::DestinationTooSmall {
                    required: 21,
                    provided: 8,
                }
            }
        );
    }

    fn encoded_sample() -> Vec<u8> {
        let packet = sample_packet();
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        buffer[..written].to_vec()
    }

    #[test]
    fn decode_rejects_short_buffers() {
        let bytes = encoded_sample();
        for len in 0..BASE_HEADER_SIZE {
            assert_eq!(decode(&bytes[..len]), None, "length {} accepted", len);
        }
    }

    #[test]
    fn decode_rejects_bad_magic() {
        for index in 0..4 {
            let mut bytes = encoded_sample();
            bytes[index] ^= 0x01;
            assert_eq!(decode(&bytes), None, "magic byte {} accepted", index);
        }
    }

    #[test]
    fn decode_rejects_wrong_version() {
        let mut bytes = encoded_sample();
        bytes[4] = 2;
        assert_eq!(decode(&bytes), None);
    }

    #[test]
    fn decode_rejects_every_reserved_flag_bit() {
        for bit in 1..8 {
            let mut bytes = encoded_sample();
            bytes[5] |= 1 << bit;
            assert_eq!(decode(&bytes), None, "reserved flag bit {} accepted", bit);
        }
    }

    #[test]
    fn decode_rejects_bad_counts() {
        let mut bytes = encoded_sample();
        bytes[10] = 0;
        assert_eq!(decode(&bytes), None);
        let mut bytes = encoded_sample();
        bytes[10] = 33;
        assert_eq!(decode(&bytes), None);
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        // Truncating by one byte breaks the exact-length rule.
        let bytes = encoded_sample();
        assert_eq!(decode(&bytes[..bytes.len() - 1]), None);
        // So does a trailing extra byte.
        let mut padded = encoded_sample();
        padded.push(0);
        assert_eq!(decode(&padded), None);
        // And a count that disagrees with the actual payload length.
        let mut mislabeled = encoded_sample();
        mislabeled[10] = 2;
        assert_eq!(decode(&mislabeled), None);
    }

    #[test]
    fn decode_into_writes_only_count_entries() {
        let bytes = encoded_sample();
        let mut inputs = [Buttons::ATTACK; MAX_FRAMES_PER_PACKET];
        let header = decode_into(&bytes, &mut inputs).unwrap();
        assert_eq!(header.count, 3);
        assert_eq!(header.start_frame, Frame::new(120));
        assert_eq!(header.ack_frame, Frame::new(118));
        assert_eq!(header.checksum, None);
        assert_eq!(inputs[0], Buttons::LEFT);
        assert_eq!(inputs[1], Buttons::LEFT | Buttons::JUMP);
        assert_eq!(inputs[2], Buttons::NEUTRAL);
        // Untouched beyond the count.
        assert_eq!(inputs[3], Buttons::ATTACK);
    }

    #[test]
    fn decode_into_rejects_undersized_buffer() {
        let bytes = encoded_sample();
        let mut too_small = [Buttons::NEUTRAL; 2];
        assert_eq!(decode_into(&bytes, &mut too_small), None);
    }

    #[test]
    fn reserved_button_bits_survive_the_wire() {
        let packet = InputPacket {
            start_frame: Frame::new(0),
            ack_frame: Frame::NONE,
            checksum: None,
            inputs: PacketInputs::from_slice(&[Buttons::from_bits(0xABCD)]),
        };
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let written = packet.encode(&mut buffer).unwrap();
        let decoded = decode(&buffer[..written]).unwrap();
        assert_eq!(decoded.inputs[0].bits(), 0xABCD);
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

    fn arbitrary_packet() -> impl Strategy<Value = InputPacket> {
        (
            any::<u32>(),
            any::<u32>(),
            proptest::option::of((any::<u32>(), any::<u32>())),
            proptest::collection::vec(any::<u16>(), 1..=MAX_FRAMES_PER_PACKET),
        )
            .prop_map(|(start, ack, checksum, inputs)| InputPacket {
                start_frame: Frame::new(start),
                ack_frame: Frame::new(ack),
                checksum: checksum.map(|(frame, value)| ChecksumReport {
                    frame: Frame::new(frame),
                    checksum: value,
                }),
                inputs: inputs.into_iter().map(Buttons::from_bits).collect(),
            })
    }

    proptest! {
        /// Every valid packet survives encode → decode unchanged.
        #[test]
        fn prop_round_trip(packet in arbitrary_packet()) {
            let mut buffer = [0u8; MAX_PACKET_SIZE];
            let written = packet.encode(&mut buffer).unwrap();
            prop_assert_eq!(written, packet.encoded_len());
            let decoded = decode(&buffer[..written]).unwrap();
            prop_assert_eq!(decoded, packet);
        }

        /// The decoder never panics on arbitrary bytes.
        #[test]
        fn prop_decode_total(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let _ = decode(&bytes);
        }
    }
}
