//! The opaque compression primitive, with size-ceiling enforcement.
//!
//! Saves carry zlib streams at maximum compression. Decompression is
//! bounded before and during inflation so a hostile header can never make
//! the decoder allocate past the ceiling.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{DecodeError, EncodeError};

/// Refuse payloads whose declared or actual decompressed size exceeds
/// this many bytes (200 MiB).
pub const PAYLOAD_CEILING: usize = 209_715_200;

/// Compress at maximum level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 64), Compression::best());
    enc.write_all(data)
        .map_err(|e| EncodeError::Compress(e.to_string()))?;
    enc.finish().map_err(|e| EncodeError::Compress(e.to_string()))
}

/// Decompress a payload whose uncompressed size was declared up front.
/// The declared size is validated against the ceiling before any
/// allocation; output longer than declared is treated as corruption.
pub fn decompress_declared(data: &[u8], declared_len: usize) -> Result<Vec<u8>, DecodeError> {
    if declared_len == 0 || declared_len > PAYLOAD_CEILING {
        return Err(DecodeError::PayloadTooLarge);
    }
    match inflate(data, declared_len) {
        // Output longer than declared is corruption, not a resource
        // limit -- the ceiling was already checked above.
        Err(DecodeError::PayloadTooLarge) => Err(DecodeError::Truncated),
        other => other,
    }
}

/// Decompress a payload of unknown uncompressed size, bounded only by the
/// ceiling.
pub fn decompress_bounded(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    inflate(data, PAYLOAD_CEILING)
}

fn inflate(data: &[u8], limit: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    let mut dec = ZlibDecoder::new(data).take(limit as u64 + 1);
    dec.read_to_end(&mut out).map_err(|_| DecodeError::Truncated)?;
    if out.len() > limit {
        return Err(DecodeError::PayloadTooLarge);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let packed = compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decompress_declared(&packed, data.len()).unwrap(), data);
        assert_eq!(decompress_bounded(&packed).unwrap(), data);
    }

    #[test]
    fn oversized_declaration_is_rejected_up_front() {
        let err = decompress_declared(&[], PAYLOAD_CEILING + 1).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadTooLarge));
        assert!(matches!(
            decompress_declared(&[], 0),
            Err(DecodeError::PayloadTooLarge)
        ));
    }

    #[test]
    fn garbage_stream_is_truncation() {
        let err = decompress_declared(&[1, 2, 3, 4], 100).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated));
    }

    #[test]
    fn output_longer_than_declared_is_corruption() {
        let data = vec![7u8; 4096];
        let packed = compress(&data).unwrap();
        assert!(matches!(
            decompress_declared(&packed, 16),
            Err(DecodeError::Truncated)
        ));
    }
}
