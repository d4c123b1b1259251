//! zlib payload compression
//!
//! Framing: `[4 bytes: uncompressed length, big-endian][zlib stream]`.
//! Empty input is encoded as four zero bytes and no stream.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use zeroize::Zeroizing;

use crate::error::{EnvelopeError, EnvelopeResult};

const LENGTH_PREFIX: usize = 4;

/// Highest zlib level accepted.
pub const MAX_LEVEL: u32 = 9;

/// Whether and how hard to compress the payload before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Off,
    Zlib(u32),
}

impl Compression {
    /// Map a configured level to a setting: 0 disables compression.
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => Self::Off,
            n => Self::Zlib(n.min(MAX_LEVEL)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Zlib(_))
    }
}

/// Compress `data` at `level` (clamped to 1..=9).
pub fn compress(data: &[u8], level: u32) -> EnvelopeResult<Zeroizing<Vec<u8>>> {
    let len = u32::try_from(data.len())
        .map_err(|_| EnvelopeError::Compression(format!("payload too large: {} bytes", data.len())))?;

    let mut out = Zeroizing::new(Vec::with_capacity(data.len() / 2 + 64));
    out.extend_from_slice(&len.to_be_bytes());
    if data.is_empty() {
        return Ok(out);
    }

    let level = flate2::Compression::new(level.clamp(1, MAX_LEVEL));
    let mut encoder = ZlibEncoder::new(std::mem::take(&mut *out), level);
    encoder
        .write_all(data)
        .map_err(|e| EnvelopeError::Compression(e.to_string()))?;
    let stream = encoder
        .finish()
        .map_err(|e| EnvelopeError::Compression(e.to_string()))?;

    Ok(Zeroizing::new(stream))
}

/// Reverse of [`compress`]. Any malformed input is reported as the opaque
/// `PaddingInvalid`, since it only happens after a decryption with the
/// wrong key slipped through the padding check.
pub fn decompress(data: &[u8]) -> EnvelopeResult<Zeroizing<Vec<u8>>> {
    if data.len() < LENGTH_PREFIX {
        return Err(EnvelopeError::PaddingInvalid);
    }
    let (prefix, stream) = data.split_at(LENGTH_PREFIX);
    let expected = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

    if stream.is_empty() {
        return if expected == 0 {
            Ok(Zeroizing::new(Vec::new()))
        } else {
            Err(EnvelopeError::PaddingInvalid)
        };
    }

    // Cap the up-front allocation; a garbage prefix may claim gigabytes.
    let mut out = Zeroizing::new(Vec::with_capacity(expected.min(stream.len() * 16)));
    ZlibDecoder::new(stream)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| EnvelopeError::PaddingInvalid)?;

    if out.len() != expected {
        return Err(EnvelopeError::PaddingInvalid);
    }
    Ok(out)
}
