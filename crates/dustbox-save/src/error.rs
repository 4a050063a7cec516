//! Error taxonomy for the save codec.
//!
//! Decode errors form a small closed set; semantically invalid but
//! well-formed content (bad element numbers, out-of-range enums, malformed
//! document substructures) is never an error -- those are coerced to safe
//! defaults and logged.

use crate::compress::PAYLOAD_CEILING;

/// Errors that can occur while decoding a save blob.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The leading magic bytes match no known container format.
    #[error("unrecognized save format")]
    UnrecognizedFormat,

    /// The save was written with a different coarse cell size. Retrying
    /// cannot help; the save is for an incompatible build.
    #[error("cell size mismatch: this build uses {expected}, save uses {found}")]
    IncompatibleCellSize { expected: i32, found: u8 },

    /// The buffer ran out mid-parse, or the payload failed to
    /// decompress.
    #[error("save data truncated or corrupt")]
    Truncated,

    /// The declared or decompressed payload exceeds the safety ceiling.
    /// Rejected before allocating.
    #[error("payload exceeds the {PAYLOAD_CEILING}-byte safety ceiling")]
    PayloadTooLarge,

    /// The save's block dimensions do not fit the simulation bounds.
    #[error("save of {w}x{h} blocks does not fit the simulation bounds")]
    SaveTooLarge { w: i32, h: i32 },
}

/// Errors that can occur while encoding a save blob.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The requested region does not intersect the simulation bounds in a
    /// way that can be snapped to whole cells.
    #[error("save region lies outside the simulation bounds")]
    RegionOutOfBounds,

    /// The compressor reported a failure.
    #[error("compression failed: {0}")]
    Compress(String),
}

/// Errors that can occur while transforming a save.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_problem() {
        let e = DecodeError::IncompatibleCellSize {
            expected: 4,
            found: 8,
        };
        assert!(e.to_string().contains("cell size"));
        assert!(
            DecodeError::Truncated
                .to_string()
                .contains("truncated")
        );
        let e = DecodeError::SaveTooLarge { w: 200, h: 100 };
        assert!(e.to_string().contains("200x100"));
    }
}
