//! Element identity resolution across format revisions.
//!
//! Newer saves embed a palette mapping on-disk numeric IDs to stable
//! string identifiers; those resolve against the live registry. Older
//! saves carry no palette and instead go through a cascade of
//! version-gated numeric shifts that model historical element insertions,
//! removals and merges. Every rule is a pure function of
//! (on-disk ID, save version, mod version); resolution never fails, it
//! always produces *some* ID and leaves validity checking to the caller.

use dustbox_core::element::{
    ids, ElementRegistry, DEFAULT_IDENTIFIER_PREFIX, ELEMENT_COUNT, NORMAL_ELEMENT_COUNT,
};

/// One palette entry as stored in a save.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub identifier: String,
    pub on_disk: i32,
}

/// A row of the shift-threshold table. The first matching row decides
/// `max`: on-disk IDs at or above `max` shift by
/// `NORMAL_ELEMENT_COUNT - max` into the mod-element region.
struct ShiftRow {
    /// Matches when the save version is at least this (never, if `None`).
    min_version: Option<i32>,
    /// Matches when the mod version is at least this.
    min_mod: Option<i32>,
    /// Matches when the mod version is exactly this.
    exact_mod: Option<i32>,
    max: i32,
}

/// Historical element-count thresholds, newest first. Each row records
/// the size of the standard element set at one release breakpoint.
const SHIFT_TABLE: &[ShiftRow] = &[
    ShiftRow { min_version: Some(90), min_mod: None, exact_mod: None, max: 179 },
    ShiftRow { min_version: Some(89), min_mod: Some(16), exact_mod: None, max: 177 },
    ShiftRow { min_version: Some(87), min_mod: None, exact_mod: None, max: 173 },
    ShiftRow { min_version: Some(86), min_mod: None, exact_mod: Some(14), max: 170 },
    ShiftRow { min_version: Some(84), min_mod: None, exact_mod: Some(13), max: 167 },
    ShiftRow { min_version: None, min_mod: None, exact_mod: Some(12), max: 165 },
    ShiftRow { min_version: Some(83), min_mod: None, exact_mod: None, max: 163 },
    ShiftRow { min_version: Some(82), min_mod: None, exact_mod: None, max: 162 },
];

fn shift_threshold(version: i32, mod_version: i32) -> i32 {
    for row in SHIFT_TABLE {
        let by_version = row.min_version.is_some_and(|v| version >= v);
        let by_min_mod = row.min_mod.is_some_and(|m| mod_version >= m);
        let by_exact_mod = row.exact_mod.is_some_and(|m| mod_version == m);
        if by_version || by_min_mod || by_exact_mod {
            return row.max;
        }
    }
    NORMAL_ELEMENT_COUNT // no shift
}

/// Apply the paletteless numeric-shift cascade.
pub fn legacy_shift(on_disk: i32, version: i32, mod_version: i32) -> i32 {
    let n = NORMAL_ELEMENT_COUNT;

    // One mod release renumbered a block of novelty elements wholesale.
    if mod_version == 18 && (190..=204).contains(&on_disk) {
        return ids::LOLZ;
    }

    let max = shift_threshold(version, mod_version);
    let mut t = on_disk;
    if t >= max {
        t += n - max;
    }

    // Mod-element merges into the standard set, oldest mods first.
    if mod_version > 0 {
        if mod_version <= 15 {
            // Three infection elements and the cleaning agent became
            // standard; later mod IDs close the gap.
            if (n + 6..=n + 8).contains(&t) {
                t = ids::VIRS + (t - (n + 6));
            } else if t == n + 9 {
                t = ids::SOAP;
            } else if t > n + 9 {
                t -= 4;
            }
        }
        if mod_version <= 19 && (n + 12..=n + 13).contains(&t) {
            // Gravity and duplication rays became standard.
            t -= 14;
        }
        if mod_version <= 20 {
            // Two conductor variants folded into the standard metal.
            if t == n + 3 || t == n + 9 {
                t = ids::METL;
            } else if t > n + 3 && t < n + 9 {
                t -= 1;
            } else if t > n + 9 {
                t -= 2;
            }
        }
    }
    t
}

enum Mapping {
    /// Palette-driven: direct per-ID lookup table.
    Palette(Vec<i32>),
    /// Paletteless: version-gated shift cascade.
    Shift { version: i32, mod_version: i32 },
}

/// Resolves on-disk element IDs to runtime IDs for one save.
pub struct ElementIdentityMap {
    mapping: Mapping,
}

impl ElementIdentityMap {
    /// Build from an embedded palette. Identifiers unknown to the live
    /// registry map to the empty element, unless they carry the built-in
    /// identifier prefix -- those name permanently absent slots and keep
    /// their on-disk ID.
    pub fn from_palette(entries: &[PaletteEntry], registry: &ElementRegistry) -> Self {
        let mut map: Vec<i32> = (0..ELEMENT_COUNT).collect();
        for entry in entries {
            if entry.on_disk <= 0 || entry.on_disk >= ELEMENT_COUNT {
                continue;
            }
            let resolved = registry.lookup_identifier(&entry.identifier);
            match resolved {
                Some(id) => map[entry.on_disk as usize] = id,
                None => {
                    if !entry.identifier.starts_with(DEFAULT_IDENTIFIER_PREFIX) {
                        log::warn!(
                            "unknown element identifier {:?}, mapping to empty",
                            entry.identifier
                        );
                        map[entry.on_disk as usize] = ids::NONE;
                    }
                }
            }
        }
        ElementIdentityMap {
            mapping: Mapping::Palette(map),
        }
    }

    /// Build for a paletteless save.
    pub fn from_versions(version: i32, mod_version: i32) -> Self {
        ElementIdentityMap {
            mapping: Mapping::Shift {
                version,
                mod_version,
            },
        }
    }

    /// Resolve one on-disk ID. Out-of-range IDs pass through unchanged;
    /// the caller validates before use.
    pub fn resolve(&self, on_disk: i32) -> i32 {
        if !(0..ELEMENT_COUNT).contains(&on_disk) {
            return on_disk;
        }
        match &self.mapping {
            Mapping::Palette(map) => map[on_disk as usize],
            Mapping::Shift {
                version,
                mod_version,
            } => legacy_shift(on_disk, *version, *mod_version),
        }
    }
}
