//! Dustbox Save -- the save-state codec for the particle sandbox.
//!
//! Serializes and deserializes the full simulation state (particle array,
//! per-cell wall/air-velocity/pressure grids, signs, metadata) to and
//! from portable binary containers, across every historical format
//! revision:
//!
//! - the **legacy container** (two magic variants), a fixed-layout format
//!   read across roughly fifty minor revisions and never written;
//! - the **document container**, a self-describing compressed document of
//!   independently optional sections, used for all new saves.
//!
//! # Entry points
//!
//! - [`sniff_format`] -- identify a blob by its magic bytes.
//! - [`parse_save`] -- decode a blob into a caller-owned
//!   [`SimulationState`], honoring a replace mode (none / partial /
//!   full).
//! - [`build_save`] -- encode a region of a [`SimulationState`] into a
//!   document-container blob.
//! - [`thumbnail::prerender`] -- render a preview without a full decode.
//! - [`transform_save`] -- rotate/flip/translate a save and re-encode it.
//!
//! The codec is single-threaded and synchronous, operates only on
//! caller-owned buffers and state, and retains nothing across calls.
//! Decode never panics on hostile input: every read is bounds-checked
//! and truncation surfaces as [`error::DecodeError::Truncated`].

use dustbox_core::element::ElementRegistry;
use dustbox_core::state::{Region, SimulationState};

pub mod compress;
pub mod cursor;
pub mod document;
pub mod error;
pub mod identity;
pub mod meta;
pub mod spatial;
pub mod thumbnail;
pub mod transform;
pub mod tree;

mod compat;
mod legacy;

pub use error::{DecodeError, EncodeError, TransformError};
pub use meta::SaveInfo;
pub use thumbnail::Image;

/// Version stamped into new saves.
pub const SAVE_VERSION: i32 = 92;

/// Minor revision of the writer.
pub const MINOR_VERSION: i32 = 0;

/// Build number recorded in the origin block.
pub const BUILD_NUM: i32 = 3412;

/// Current mod save revision recorded in the document container.
pub const MOD_SAVE_VERSION: i32 = 21;

/// The two container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Fixed-layout format, read-only.
    Legacy,
    /// Self-describing document format, read and written.
    Document,
}

/// How much caller-visible state a decode may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    /// Transform-only decode: populate particles, grids and signs but
    /// apply no global flags and no element bookkeeping side effects.
    None,
    /// Stamp paste: spatial data merges into the existing simulation;
    /// global flags stay untouched.
    Partial,
    /// Fresh load: the simulation is cleared first and global flags come
    /// from the save.
    #[default]
    Full,
}

/// Decode behavior switches.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub replace: ReplaceMode,
    /// Apply pressure, air-velocity and ambient-heat grids.
    pub include_pressure: bool,
    /// With [`ReplaceMode::Full`], also replace session metadata: save
    /// info, tool selections, renderer modes.
    pub session_metadata: bool,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions {
            replace: ReplaceMode::Full,
            include_pressure: true,
            session_metadata: false,
        }
    }
}

/// Encode behavior switches.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Emit pressure, air-velocity and ambient-heat grids.
    pub include_pressure: bool,
    /// Session metadata to embed, for tab-state saves.
    pub session: Option<SaveInfo>,
    /// Authorship tree to embed.
    pub authors: Option<serde_json::Value>,
}

impl Default for EncodeOptions {
    fn default() -> EncodeOptions {
        EncodeOptions {
            include_pressure: true,
            session: None,
            authors: None,
        }
    }
}

/// What a decode found out about the blob.
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub format: SaveFormat,
    /// Format version the save was written with.
    pub version: i32,
    /// Mod revision, zero for plain saves.
    pub mod_version: i32,
    /// Block dimensions from the header.
    pub block_w: i32,
    pub block_h: i32,
    /// Set when the save declares a newer version than this reader; the
    /// load proceeds anyway and this carries the advisory.
    pub newer: Option<(i32, i32)>,
    /// Session metadata, when present and requested.
    pub save_info: Option<SaveInfo>,
    /// Authorship tree, when present.
    pub authors: Option<serde_json::Value>,
}

/// Identify a blob by its magic bytes without decoding it.
pub fn sniff_format(data: &[u8]) -> Option<SaveFormat> {
    if thumbnail::looks_like_document(data) {
        Some(SaveFormat::Document)
    } else if thumbnail::looks_like_legacy(data) {
        Some(SaveFormat::Legacy)
    } else {
        None
    }
}

/// Decode a save blob into `state`, pasting its top-left corner at pixel
/// position (`paste_x`, `paste_y`) snapped to the cell grid.
///
/// With [`ReplaceMode::Full`] the state is cleared first, so a
/// truncation error part-way leaves a valid partially-filled simulation
/// rather than corrupt mixed state.
pub fn parse_save(
    data: &[u8],
    paste_x: i32,
    paste_y: i32,
    state: &mut SimulationState,
    registry: &ElementRegistry,
    opts: &DecodeOptions,
) -> Result<DecodeReport, DecodeError> {
    if data.len() < 16 {
        return Err(DecodeError::Truncated);
    }
    match sniff_format(data).ok_or(DecodeError::UnrecognizedFormat)? {
        SaveFormat::Document => document::decode(data, paste_x, paste_y, state, registry, opts),
        SaveFormat::Legacy => legacy::decode(data, paste_x, paste_y, state, registry, opts),
    }
}

/// Encode the given region of `state` as a document-container blob.
/// The region is snapped outward to whole coarse cells.
pub fn build_save(
    state: &SimulationState,
    region: Region,
    registry: &ElementRegistry,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    document::encode(state, region, registry, opts)
}

/// Apply an affine transform plus translation to a save and re-encode
/// it. The result is anchored at the origin and clipped to the
/// simulation bounds.
pub fn transform_save(
    data: &[u8],
    registry: &ElementRegistry,
    matrix: transform::Matrix,
    translate: (f32, f32),
) -> Result<Vec<u8>, TransformError> {
    transform::transform(data, registry, matrix, translate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffing_magic_bytes() {
        assert_eq!(sniff_format(b"OPS1...."), Some(SaveFormat::Document));
        assert_eq!(sniff_format(b"OPJ1...."), Some(SaveFormat::Document));
        assert_eq!(
            sniff_format(&[0x66, 0x75, 0x43, 0, 0]),
            Some(SaveFormat::Legacy)
        );
        assert_eq!(
            sniff_format(&[0x50, 0x53, 0x76, 0, 0]),
            Some(SaveFormat::Legacy)
        );
        assert_eq!(sniff_format(b"OPS2...."), None);
        assert_eq!(sniff_format(b"xx"), None);
    }

    #[test]
    fn short_input_is_truncation_not_panic() {
        let registry = ElementRegistry::builtin();
        let mut state = SimulationState::new();
        let err = parse_save(
            b"OPS1",
            0,
            0,
            &mut state,
            &registry,
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Truncated));
    }
}
