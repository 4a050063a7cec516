//! Decoder for the legacy fixed-layout container.
//!
//! The legacy format is a linear sequence of sections: header, wall grid,
//! fan velocity passes, particle type grid, then one synchronized pass per
//! particle property over all occupied pixels. Which passes exist, and how
//! wide their fields are, depends on the version byte and a mod-version
//! side channel encoded in the high version range. Each breakpoint is an
//! explicit, documented gate below; the enumerated fixtures in the tests
//! are the source of truth for their interactions.
//!
//! The legacy container is read-only: no new saves are written in this
//! format, the self-describing container handles all encoding.

use dustbox_core::element::{ids, ElementRegistry, ELEMENT_COUNT, NORMAL_ELEMENT_COUNT};
use dustbox_core::sign::{Justification, Sign, MAX_SIGNS};
use dustbox_core::state::SimulationState;
use dustbox_core::wall::{walls, WALL_TYPE_COUNT};
use dustbox_core::{
    BLOCK_H, BLOCK_W, CELL, MAX_TEMP, MIN_TEMP, OLD_MAX_TEMP, OLD_MIN_TEMP,
};

use crate::compat::{
    apply_shared_rewrites, coerce_disabled, enforce_singletons, gol_rule_index, OLD_GOL_IDS,
    GOL_TWO_STATE, OLD_WIND,
};
use crate::compress::decompress_declared;
use crate::cursor::Reader;
use crate::error::DecodeError;
use crate::{
    DecodeOptions, DecodeReport, ReplaceMode, SaveFormat, MOD_SAVE_VERSION, SAVE_VERSION,
};

/// Magic of the oldest container revision.
pub(crate) const MAGIC_OLD: [u8; 3] = [0x66, 0x75, 0x43];

/// Magic of the later revision that switched to raw 16-bit temperatures.
pub(crate) const MAGIC_NEW: [u8; 3] = [0x50, 0x53, 0x76];

/// Wall IDs used on disk from version 44 onward, mapped to canonical
/// values. Versions before 44 stored canonical IDs directly.
const LEGACY_WALL_IDS: &[(i32, u8)] = &[
    (122, walls::WALLELEC),
    (123, walls::EWALL),
    (124, walls::DETECT),
    (125, walls::STREAM),
    (127, walls::FAN),
    (128, walls::ALLOWLIQUID),
    (129, walls::DESTROYALL),
    (130, walls::WALL),
    (131, walls::ALLOWAIR),
    (132, walls::ALLOWPOWDER),
    (133, walls::ALLOWALLELEC),
    (134, walls::EHOLE),
    (140, walls::ALLOWGAS),
    (142, walls::GRAV),
    (145, walls::ALLOWENERGY),
];

/// On-disk wall ID the sign tool wrote by mistake in versions 44..71.
const LEGACY_WALL_SIGN: i32 = 126;

/// On-disk fan wall values: canonical before version 44, historic after.
const RAW_FAN_OLD: i32 = walls::FAN as i32;
const RAW_FAN_NEW: i32 = 127;

pub(crate) fn from_legacy_wall(raw: i32, version: i32) -> i32 {
    if version < 44 {
        return raw;
    }
    LEGACY_WALL_IDS
        .iter()
        .find(|(disk, _)| *disk == raw)
        .map(|(_, canon)| *canon as i32)
        .unwrap_or(raw)
}

/// Mod builds reused the high version range; map an encoded version byte
/// to (base version, mod version).
const MOD_VERSION_MAP: &[(i32, i32, i32)] = &[
    (240, 65, 3),
    (242, 66, 5),
    (243, 68, 6),
    (244, 69, 7),
];

pub(crate) fn split_version(raw: i32) -> (i32, i32) {
    for &(encoded, version, mod_version) in MOD_VERSION_MAP {
        if raw == encoded {
            return (version, mod_version);
        }
    }
    if raw >= 200 {
        return (71, 8);
    }
    (raw, 0)
}

/// Elements whose ctype byte exists in the stream, with the version that
/// introduced it.
const CTYPE_GATES: &[(i32, i32)] = &[
    (ids::CLNE, 0),
    (ids::PCLN, 43),
    (ids::BCLN, 44),
    (ids::SPRK, 21),
    (ids::LAVA, 34),
    (ids::PIPE, 43),
    (ids::LIFE, 51),
    (ids::PBCN, 52),
    (ids::WIRE, 55),
    (ids::STOR, 59),
    (ids::CONV, 60),
];

fn ctype_gate(on_disk_type: i32, version: i32) -> bool {
    CTYPE_GATES
        .iter()
        .any(|&(id, min)| id == on_disk_type && version >= min)
}

/// Grid slot with data in the stream but no live particle to receive it.
const DROPPED: u32 = u32::MAX;

pub(crate) fn decode(
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
    let new_format = data[..3] == MAGIC_NEW;
    if !new_format && data[..3] != MAGIC_OLD {
        return Err(DecodeError::UnrecognizedFormat);
    }

    let raw_version = data[4] as i32;
    let mut newer = None;
    if (raw_version > SAVE_VERSION && raw_version < 200)
        || (raw_version < 237 && raw_version > 200 + MOD_SAVE_VERSION)
    {
        log::warn!("save is from a newer version ({raw_version}), attempting to load anyway");
        newer = Some((raw_version, 0));
    }
    let (ver, modver) = split_version(raw_version);

    if data[5] as i32 != CELL {
        return Err(DecodeError::IncompatibleCellSize {
            expected: CELL,
            found: data[5],
        });
    }
    let bw = data[6] as i32;
    let bh = data[7] as i32;
    if bw > BLOCK_W || bh > BLOCK_H || bw == 0 || bh == 0 {
        return Err(DecodeError::SaveTooLarge { w: bw, h: bh });
    }
    let bx0 = (paste_x / CELL).clamp(0, BLOCK_W - bw);
    let by0 = (paste_y / CELL).clamp(0, BLOCK_H - bh);

    let declared = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let payload = decompress_declared(&data[12..], declared)?;
    if payload.len() < (bw * bh) as usize {
        return Err(DecodeError::Truncated);
    }

    let full = opts.replace == ReplaceMode::Full;
    if full {
        state.clear();
        if ver < 46 {
            state.flags.gravity_mode = 0;
            state.flags.air_mode = 0;
        }
    }

    // Header flag byte. Versions before 34 predate the heat simulation
    // entirely; 34..44 used the byte as a bare legacy-heat toggle; 44+
    // packed several modes in.
    let c3 = data[3] as i32;
    let mut legacy_beta = false;
    if ver < 34 {
        if full {
            state.flags.legacy_heat = true;
        }
    } else if ver >= 44 {
        if full {
            state.flags.legacy_heat = c3 & 0x01 != 0;
            state.flags.paused = (c3 >> 1) & 0x01 != 0;
            if ver >= 46 {
                state.flags.gravity_mode = (c3 >> 2) & 0x03;
                state.flags.air_mode = (c3 >> 4) & 0x07;
            }
            if ver >= 49 {
                state.flags.gravity_enable = (c3 >> 7) & 0x01 != 0;
            }
        }
    } else if c3 <= 1 {
        if full {
            state.flags.legacy_heat = c3 == 1;
        }
    } else {
        // Beta builds stored junk here and also predate temperatures.
        legacy_beta = true;
    }

    state.rebuild_indices();
    let mut free: Vec<u32> = state
        .parts
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_empty())
        .map(|(i, _)| i as u32)
        .collect();
    free.reverse(); // pop() yields ascending indices
    let mut r = Reader::new(&payload);

    // -- Wall grid --
    let wall_raw: Vec<u8> = payload[..(bw * bh) as usize].to_vec();
    for by in 0..bh {
        for bx in 0..bw {
            let raw = r.read_u8()? as i32;
            if raw == 0 {
                continue;
            }
            if (44..71).contains(&ver) && raw == LEGACY_WALL_SIGN {
                continue;
            }
            let wall = from_legacy_wall(raw, ver);
            if !(0..WALL_TYPE_COUNT as i32).contains(&wall) {
                continue;
            }
            state.walls[SimulationState::cell_index(bx0 + bx, by0 + by)] = wall as u8;
        }
    }

    // -- Fan velocities: all x components, then all y components --
    let fan_cell = |raw: u8| {
        let raw = raw as i32;
        raw == RAW_FAN_OLD || (ver >= 44 && raw == RAW_FAN_NEW)
    };
    for pass in 0..2 {
        for by in 0..bh {
            for bx in 0..bw {
                if !fan_cell(wall_raw[(by * bw + bx) as usize]) {
                    continue;
                }
                let v = (r.read_u8()? as f32 - 127.0) / 64.0;
                let cell = SimulationState::cell_index(bx0 + bx, by0 + by);
                if pass == 0 {
                    state.fan_vx[cell] = v;
                } else {
                    state.fan_vy[cell] = v;
                }
            }
        }
    }

    // -- Particle type grid --
    let x0 = bx0 * CELL;
    let y0 = by0 * CELL;
    let w = bw * CELL;
    let h = bh * CELL;
    let area = (w * h) as usize;
    let mut type_grid = vec![0i32; area];
    let mut placed = vec![0u32; area];

    for y in 0..h {
        for x in 0..w {
            let mut j = r.read_u8()? as i32;
            if j >= ELEMENT_COUNT {
                // Coerce rather than reject; old servers shipped saves
                // with out-of-range types.
                j = ids::DUST;
            }
            if j == 0 {
                continue;
            }
            if (1..=5).contains(&modver) {
                if (136..=140).contains(&j) {
                    j += NORMAL_ELEMENT_COUNT - 136;
                } else if (142..=146).contains(&j) {
                    j += NORMAL_ELEMENT_COUNT - 137;
                }
            }
            let idx = (y * w + x) as usize;
            type_grid[idx] = j;

            let gx = x0 + x;
            let gy = y0 + y;
            let entry = state.pmap_get(gx, gy);
            let k = if entry != 0 {
                let k = (entry >> 8) as usize;
                state.bump_count(state.parts[k].ptype, -1);
                state.pmap_set(gx, gy, 0);
                k
            } else if let Some(k) = free.pop() {
                k as usize
            } else {
                placed[idx] = DROPPED;
                continue;
            };

            let p = &mut state.parts[k];
            p.clear();
            p.ptype = j;
            p.x = gx as f32;
            p.y = gy as f32;
            // Element-specific spawn defaults that predate their
            // dedicated property passes.
            match j {
                t if t == ids::COAL || t == ids::FUSE => p.tmp = 50,
                t if t == ids::PHOT => p.ctype = 0x3FFFFFFF,
                t if t == ids::BIZR || t == ids::BIZRG || t == ids::BIZRS => {
                    p.ctype = 0x47FFFF
                }
                _ => {}
            }
            placed[idx] = k as u32 + 1;
        }
    }

    let live = |slot: u32| -> Option<usize> {
        if slot == 0 || slot == DROPPED {
            None
        } else {
            Some((slot - 1) as usize)
        }
    };

    // -- Velocity pass --
    for idx in 0..area {
        if placed[idx] == 0 {
            continue;
        }
        let vx = (r.read_u8()? as f32 - 127.0) / 16.0;
        let vy = (r.read_u8()? as f32 - 127.0) / 16.0;
        if let Some(k) = live(placed[idx]) {
            state.parts[k].vx = vx;
            state.parts[k].vy = vy;
        }
    }

    // -- Life pass: 16-bit from version 44, quarter-resolution byte before --
    for idx in 0..area {
        if placed[idx] == 0 {
            continue;
        }
        let life = if ver >= 44 {
            r.read_u16be()? as i32
        } else {
            r.read_u8()? as i32 * 4
        };
        if let Some(k) = live(placed[idx]) {
            state.parts[k].life = life;
        }
    }

    // -- Tmp pass, added in version 44 --
    if ver >= 44 {
        for idx in 0..area {
            if placed[idx] == 0 {
                continue;
            }
            let mut tmp = r.read_u16be()? as i32;
            let ty = type_grid[idx];
            if ver < 53 && tmp == 0 {
                // Two-state automata ran with an implicit live counter
                // before it was stored.
                if let Some(rule) = gol_rule_index(ty) {
                    if GOL_TWO_STATE[rule] {
                        tmp = 1;
                    }
                }
            }
            if let Some(k) = live(placed[idx]) {
                let p = &mut state.parts[k];
                p.tmp = tmp;
                if (51..53).contains(&ver) && ty == ids::PBCN {
                    p.tmp2 = p.tmp;
                    p.tmp = 0;
                }
            }
        }
    }

    // -- Tmp2 pass, version 53+, only for the element types that used it --
    if ver >= 53 {
        for idx in 0..area {
            let ty = type_grid[idx];
            if placed[idx] == 0 || !(ty == ids::PBCN || (ty == ids::TRON && ver >= 77)) {
                continue;
            }
            let tmp2 = r.read_u8()? as i32;
            if let Some(k) = live(placed[idx]) {
                state.parts[k].tmp2 = tmp2;
            }
        }
    }

    // -- Decoration passes (alpha, red, green, blue), version 49+ --
    if ver >= 49 {
        for shift in [24u32, 16, 8, 0] {
            for idx in 0..area {
                if placed[idx] == 0 {
                    continue;
                }
                let component = r.read_u8()? as u32;
                if let Some(k) = live(placed[idx]) {
                    state.parts[k].dcolour |= component << shift;
                }
            }
        }
    }

    // -- Temperature pass --
    for idx in 0..area {
        if placed[idx] == 0 {
            continue;
        }
        if ver >= 34 && !legacy_beta {
            let temp = if ver >= 42 {
                if new_format {
                    let raw = r.read_u16be()? as f32;
                    if type_grid[idx] == ids::PUMP {
                        // Pumps saved at 0 K reload at their working floor.
                        raw + 0.15
                    } else {
                        raw
                    }
                } else {
                    r.read_u8()? as f32 * ((MAX_TEMP - MIN_TEMP) / 255.0) + MIN_TEMP
                }
            } else {
                r.read_u8()? as f32 * ((OLD_MAX_TEMP - OLD_MIN_TEMP) / 255.0)
                    + OLD_MIN_TEMP
                    + 273.0
            };
            if let Some(k) = live(placed[idx]) {
                state.parts[k].temp = temp;
            }
        } else if let Some(k) = live(placed[idx]) {
            state.parts[k].temp = registry.default_temp(type_grid[idx]);
        }
    }

    // -- Ctype pass, gated per element introduction version --
    for idx in 0..area {
        if placed[idx] == 0 || !ctype_gate(type_grid[idx], ver) {
            continue;
        }
        let ctype = r.read_u8()? as i32;
        if let Some(k) = live(placed[idx]) {
            state.parts[k].ctype = ctype;
        }
    }

    // -- Post-pass rewrites, version-ascending --
    for idx in 0..area {
        let Some(k) = live(placed[idx]) else { continue };
        let ty = type_grid[idx];

        enforce_singletons(state, k);
        let p = &mut state.parts[k];

        // Moving solids kept their group data in the general-purpose
        // fields before the side table existed.
        if p.ptype == ids::MOVS {
            p.pavg = [p.tmp as f32, p.tmp2 as f32];
            p.tmp2 = p.life;
            p.tmp = 0;
        }
        if ver < 48 && (ty == OLD_WIND || (ty == ids::BRAY && p.life == 0)) {
            // Invisible tool particles become decorated diamond.
            p.dcolour = dustbox_core::colour::argb(255, 0, 0, 0);
            p.ptype = ids::DMND;
        }
        if ver < 51 {
            if let Some(rule) = gol_rule_index(ty) {
                p.ptype = ids::LIFE;
                p.ctype = rule as i32;
            }
        }
        if ver < 52 && (ty == ids::CLNE || ty == ids::PCLN || ty == ids::BCLN) {
            if let Some(rule) = gol_rule_index(p.ctype) {
                p.ctype = ids::LIFE;
                p.tmp = rule as i32;
            }
        }
        if ty == ids::LCRY {
            if ver < 67 {
                // The crystal moved its switching state out of life.
                if p.life >= 10 {
                    p.life = 10;
                    p.tmp2 = 10;
                    p.tmp = 3;
                } else if p.life <= 0 {
                    p.life = 0;
                    p.tmp2 = 0;
                    p.tmp = 0;
                } else {
                    p.tmp = 1;
                }
            } else {
                p.tmp2 = p.life;
            }
        }
        coerce_disabled(p, registry);
        apply_shared_rewrites(p, ver);
        let final_type = state.parts[k].ptype;
        state.bump_count(final_type, 1);
    }

    // -- Optional trailing sections: absence is not an error --
    if !r.is_empty() {
        let count = r.read_u8()? as usize;
        for _ in 0..count {
            if r.remaining() < 6 {
                return Err(DecodeError::Truncated);
            }
            let sx = r.read_u16le()? as i32;
            let sy = r.read_u16le()? as i32;
            let ju = r.read_u8()? as i32;
            let len = r.read_u8()? as usize;
            let text = String::from_utf8_lossy(r.take(len)?).into_owned();
            if state.signs.len() < MAX_SIGNS {
                state
                    .signs
                    .push(Sign::new(&text, sx, sy, Justification::from_raw(ju)));
            }
        }
    }
    if modver >= 3 && !r.is_empty() {
        let b = r.read_u8()? as i32;
        if full {
            state.flags.decorations_enable = b & 0x01 != 0;
            state.flags.aheat_enable = (b >> 1) & 0x01 != 0;
            state.flags.hud_enable = (b >> 2) & 0x01 != 0;
            state.flags.water_equalization = (b >> 3) & 0x01 != 0;
        }
    }

    state.rebuild_indices();
    Ok(DecodeReport {
        format: SaveFormat::Legacy,
        version: ver,
        mod_version: modver,
        block_w: bw,
        block_h: bh,
        newer,
        save_info: None,
        authors: None,
    })
}

// Keep the rule tables honest against each other.
const _: () = assert!(OLD_GOL_IDS.len() == GOL_TWO_STATE.len());
