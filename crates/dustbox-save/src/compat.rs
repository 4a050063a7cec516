//! Historical element rewrite rules shared by both container decoders.
//!
//! Old saves carry element state laid out for rules that have since
//! changed. After all property passes complete, each decoded particle
//! walks an ordered table of version-gated rewrites that translate it to
//! the current representation. Rules are keyed on the version the change
//! shipped in and apply when the save predates it.

use dustbox_core::element::{ids, ElementRegistry};
use dustbox_core::particle::{Particle, FLAG_PHOT_DECO};
use dustbox_core::state::SimulationState;

/// Highest number of concurrently live fighter entities.
const MAX_FIGHTERS: u32 = 100;

/// On-disk IDs of the retired dedicated cellular-automaton elements, in
/// rule order. The first block predates the extended ruleset; the second
/// block reused a later ID range (skipping one unrelated slot).
pub(crate) const OLD_GOL_IDS: [i32; 24] = [
    78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89, //
    134, 135, 136, 137, 138, 139, 140, 142, 143, 144, 145, 146,
];

/// Whether each automaton rule is a plain two-state rule. Two-state rules
/// ran with an implicit live counter of 1 before per-particle state was
/// stored.
pub(crate) const GOL_TWO_STATE: [bool; 24] = [
    true, true, true, true, false, false, true, true, true, false, true, true, //
    true, false, true, true, true, true, false, true, true, true, true, true,
];

/// On-disk ID of the invisible wind tool in saves older than version 48.
pub(crate) const OLD_WIND: i32 = 147;

/// Rule index for a retired automaton element ID.
pub(crate) fn gol_rule_index(on_disk: i32) -> Option<usize> {
    OLD_GOL_IDS.iter().position(|&id| id == on_disk)
}

/// Spark colors of the legacy firework element, indexed along its 0..200
/// hue ramp. Packed RGB.
pub(crate) fn firw_colour(index: i32) -> i32 {
    let hue = (index.clamp(0, 199) as f32) * 360.0 / 200.0;
    let sector = (hue / 60.0) as i32 % 6;
    let f = hue / 60.0 - (hue / 60.0).floor();
    let q = ((1.0 - f) * 255.0) as i32;
    let t = (f * 255.0) as i32;
    let (r, g, b) = match sector {
        0 => (255, t, 0),
        1 => (q, 255, 0),
        2 => (0, 255, t),
        3 => (0, q, 255),
        4 => (t, 0, 255),
        _ => (255, 0, q),
    };
    (r << 16) | (g << 8) | b
}

/// One version-gated rewrite. Applies when the save version is below
/// `below`.
struct RewriteRule {
    below: i32,
    apply: fn(&mut Particle),
}

/// Rewrites shared by both containers, in version-ascending order.
const REWRITES: &[RewriteRule] = &[
    RewriteRule {
        below: 81,
        apply: |p| {
            // Exploding fragments unified into the ember element.
            if p.ptype == ids::BOMB && p.tmp != 0 {
                p.ptype = ids::EMBR;
                p.ctype = 0;
                if p.tmp == 1 {
                    p.tmp = 0;
                }
            }
            if p.ptype == ids::DUST && p.life > 0 {
                p.ptype = ids::EMBR;
                p.ctype = (p.tmp2 << 16) | (p.tmp << 8) | p.ctype;
                p.tmp = 1;
            }
            if p.ptype == ids::FIRW && p.tmp >= 2 {
                p.ptype = ids::EMBR;
                p.ctype = firw_colour(p.tmp - 4);
                p.tmp = 1;
            }
        },
    },
    RewriteRule {
        below: 87,
        apply: |p| {
            if p.ptype == ids::PSTN && p.ctype != 0 {
                p.life = 1;
            }
        },
    },
    RewriteRule {
        below: 89,
        apply: |p| {
            if p.ptype == ids::FILT {
                if p.tmp < 0 || p.tmp > 3 {
                    p.tmp = 6;
                }
                p.ctype = 0;
            }
            if p.ptype == ids::QRTZ || p.ptype == ids::PQRT {
                // Growth state moved from ctype/tmp to tmp/tmp2.
                p.tmp2 = p.tmp;
                p.tmp = p.ctype;
                p.ctype = 0;
            }
        },
    },
    RewriteRule {
        below: 90,
        apply: |p| {
            if p.ptype == ids::PHOT {
                p.flags |= FLAG_PHOT_DECO;
            }
        },
    },
    RewriteRule {
        below: 91,
        apply: |p| {
            if p.ptype == ids::VINE {
                p.tmp = 1;
            } else if p.ptype == ids::PSTN {
                p.temp = 283.15;
            } else if p.ptype == ids::DLAY {
                p.temp -= 1.0;
            } else if p.ptype == ids::CRAY {
                if p.tmp2 != 0 {
                    p.ctype |= p.tmp2 << 8;
                }
            } else if p.ptype == ids::CONV && p.tmp != 0 {
                p.ctype |= p.tmp << 8;
            }
        },
    },
];

/// Apply every rewrite the save version predates, oldest rule first.
pub(crate) fn apply_shared_rewrites(p: &mut Particle, version: i32) {
    for rule in REWRITES {
        if version < rule.below {
            (rule.apply)(p);
        }
    }
}

/// Drop duplicate singleton entities: only one of each player, one of
/// each spawn pad, and a bounded number of fighters may exist.
pub(crate) fn enforce_singletons(state: &mut SimulationState, live: usize) {
    let ptype = state.parts[live].ptype;
    let drop = match ptype {
        t if t == ids::STKM || t == ids::STKM2 => state.count_of(t) > 0,
        t if t == ids::SPWN || t == ids::SPWN2 => state.count_of(t) > 0,
        t if t == ids::FIGH => state.count_of(t) >= MAX_FIGHTERS,
        _ => false,
    };
    if drop {
        state.parts[live].ptype = ids::NONE;
    }
}

/// Replace disabled or out-of-range element types with the empty element.
pub(crate) fn coerce_disabled(p: &mut Particle, registry: &ElementRegistry) {
    if p.ptype != ids::NONE && !registry.is_enabled(p.ptype) {
        log::debug!("invalid element number {}, coercing to empty", p.ptype);
        p.ptype = ids::NONE;
    }
}
