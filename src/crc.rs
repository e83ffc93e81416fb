//! CRC-32/IEEE (the zlib/PNG polynomial).
//!
//! A small internal implementation that replaces a `crc32fast` dependency:
//! the replay container needs exactly one well-known checksum, computed off
//! the hot path, so a 256-entry table built at compile time is plenty.
//!
//! Parameters: reflected polynomial `0xEDB88320`, initial value
//! `0xFFFFFFFF`, final XOR `0xFFFFFFFF`.

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = index as u32;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 1 != 0 {
                (value >> 1) ^ 0xEDB8_8320
            } else {
                value >> 1
            };
            bit += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

const CRC_TABLE: [u32; 256] = build_table();

/// An incremental CRC-32/IEEE computation.
///
/// # Examples
///
/// ```
/// use riposte_netcode::crc::{crc32, Crc32};
///
/// let mut incremental = Crc32::new();
/// incremental.update(b"1234");
/// incremental.update(b"56789");
/// assert_eq!(incremental.finish(), crc32(b"123456789"));
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Starts a new computation.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Feeds bytes into the computation.
    pub fn update(&mut self, bytes: &[u8]) {
        let mut state = self.state;
        for &byte in bytes {
            let index = ((state ^ u32::from(byte)) & 0xFF) as usize;
            state = (state >> 8) ^ CRC_TABLE[index];
        }
        self.state = state;
    }

    /// Returns the checksum of everything fed so far.
    #[inline]
    #[must_use]
    pub const fn finish(&self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the CRC-32/IEEE checksum of `bytes` in one call.
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finish()
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
    fn empty_input() {
        assert_eq!(crc32(&[]), 0);
    }

    // The standard check value for CRC-32/IEEE.
    #[test]
    fn check_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn incremental_matches_oneshot() {
        let data: Vec<u8> = (0u16..1024).map(|value| (value % 251) as u8).collect();
        let mut incremental = Crc32::new();
        for chunk in data.chunks(7) {
            incremental.update(chunk);
        }
        assert_eq!(incremental.finish(), crc32(&data));
    }

    #[test]
    fn single_bit_flip_changes_checksum() {
        let data = b"riposte".to_vec();
        let reference = crc32(&data);
        for index in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.clone();
                corrupted[index] ^= 1 << bit;
                assert_ne!(crc32(&corrupted), reference);
            }
        }
    }
}
