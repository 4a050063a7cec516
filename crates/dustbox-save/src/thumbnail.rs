//! Preview rendering straight from save blobs.
//!
//! Previews must never require a successful full decode: corrupt or
//! partial geometry produces `None`, and cost stays proportional to the
//! occupied pixels because particle records are read with the shared
//! descriptor walk and then discarded. Colors go through the same
//! element identity mapping as a real load so previews match.
//!
//! Also implements the companion catalog-thumbnail format: the same
//! 8-byte header style over a compressed per-pixel element-ID map.

use dustbox_core::colour;
use dustbox_core::element::{ids, ElementRegistry};
use dustbox_core::state::SimulationState;
use dustbox_core::wall::{wall_def, walls, WALL_TYPE_COUNT};
use dustbox_core::{BLOCK_H, BLOCK_W, CELL, XRES, YRES};

use crate::compress::{compress, decompress_bounded, decompress_declared};
use crate::cursor::{Reader, Writer};
use crate::document::{read_record, MAGIC as DOC_MAGIC};
use crate::error::{DecodeError, EncodeError};
use crate::identity::ElementIdentityMap;
use crate::legacy::{MAGIC_NEW, MAGIC_OLD};
use crate::tree::Document;
use crate::SaveFormat;

/// Magic of the companion catalog-thumbnail format.
pub const THUMB_MAGIC: [u8; 4] = [0x53, 0x68, 0x54, 0x62];

/// A small RGB image, row-major packed `0xRRGGBB`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u32>,
}

impl Image {
    pub fn new(width: i32, height: i32) -> Image {
        Image {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    pub fn get(&self, x: i32, y: i32) -> u32 {
        if (0..self.width).contains(&x) && (0..self.height).contains(&y) {
            self.pixels[(y * self.width + x) as usize]
        } else {
            0
        }
    }

    pub fn put(&mut self, x: i32, y: i32, c: u32) {
        if (0..self.width).contains(&x) && (0..self.height).contains(&y) {
            self.pixels[(y * self.width + x) as usize] = c;
        }
    }

    pub fn blend_over(&mut self, x: i32, y: i32, c: u32) {
        let base = self.get(x, y);
        let a = colour::alpha(c) as u32;
        let r = (a * colour::red(c) as u32 + (255 - a) * colour::red(base) as u32) >> 8;
        let g = (a * colour::green(c) as u32 + (255 - a) * colour::green(base) as u32) >> 8;
        let b = (a * colour::blue(c) as u32 + (255 - a) * colour::blue(base) as u32) >> 8;
        self.put(x, y, colour::rgb(r as u8, g as u8, b as u8));
    }
}

fn draw_line(img: &mut Image, x1: i32, y1: i32, x2: i32, y2: i32, c: u32) {
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let steps = dx.max(dy).max(1);
    for step in 0..=steps {
        let x = x1 + (x2 - x1) * step / steps;
        let y = y1 + (y2 - y1) * step / steps;
        img.put(x, y, c);
    }
}

/// Draw one coarse cell's wall pattern at block position (bx, by).
fn draw_wall(img: &mut Image, bx: i32, by: i32, wall: u8) {
    let def = wall_def(wall);
    let pc = def.colour;
    let gc = def.glow;
    let ox = bx * CELL;
    let oy = by * CELL;
    match def.draw_style {
        1 => {
            for i in (0..CELL).step_by(2) {
                for j in (((i >> 1) & 1)..CELL).step_by(2) {
                    img.put(ox + j, oy + i, pc);
                }
            }
        }
        2 => {
            for i in (0..CELL).step_by(2) {
                for j in (0..CELL).step_by(2) {
                    img.put(ox + j, oy + i, pc);
                }
            }
        }
        3 => {
            for i in 0..CELL {
                for j in 0..CELL {
                    img.put(ox + j, oy + i, pc);
                }
            }
        }
        4 => {
            for i in 0..CELL {
                for j in 0..CELL {
                    if i == j {
                        img.put(ox + j, oy + i, pc);
                    } else if j == i + 1 || (j == 0 && i == CELL - 1) {
                        img.put(ox + j, oy + i, gc);
                    } else {
                        img.put(ox + j, oy + i, 0x202020);
                    }
                }
            }
        }
        _ => {}
    }
    // Walls with distinctive pixel signatures on top of the base style.
    if wall == walls::EWALL {
        for i in 0..CELL {
            for j in 0..CELL {
                if i & j & 1 == 0 {
                    img.put(ox + j, oy + i, pc);
                }
            }
        }
    } else if wall == walls::WALLELEC {
        for i in 0..CELL {
            for j in 0..CELL {
                if (oy + j) % 2 == 0 && (ox + i) % 2 == 0 {
                    img.put(ox + j, oy + i, pc);
                } else {
                    img.put(ox + j, oy + i, 0x808080);
                }
            }
        }
    } else if wall == walls::EHOLE {
        for i in (0..CELL).step_by(2) {
            for j in (0..CELL).step_by(2) {
                img.put(ox + j, oy + i, 0x242424);
            }
        }
    }
}

/// Player and fighter entities render as a multi-pixel figure, not a
/// flat color.
fn draw_figure(img: &mut Image, x: i32, y: i32, ptype: i32) {
    let head = colour::rgb(255, 224, 178);
    let limbs = if ptype == ids::STKM2 {
        colour::rgb(100, 100, 255)
    } else {
        colour::rgb(255, 255, 255)
    };
    if ptype == ids::FIGH {
        draw_line(img, x - 2, y, x, y - 2, head);
        draw_line(img, x - 2, y, x, y + 2, head);
        draw_line(img, x, y - 2, x + 2, y, head);
        draw_line(img, x, y + 2, x + 2, y, head);
    } else {
        draw_line(img, x - 2, y - 2, x + 2, y - 2, head);
        draw_line(img, x - 2, y + 2, x + 2, y + 2, head);
        draw_line(img, x - 2, y - 2, x - 2, y + 2, head);
        draw_line(img, x + 2, y - 2, x + 2, y + 2, head);
    }
    draw_line(img, x, y + 3, x - 1, y + 6, limbs);
    draw_line(img, x, y + 3, x + 1, y + 6, limbs);
    draw_line(img, x - 1, y + 6, x - 3, y + 12, limbs);
    draw_line(img, x + 1, y + 6, x + 3, y + 12, limbs);
}

fn is_figure(ptype: i32) -> bool {
    ptype == ids::STKM || ptype == ids::STKM2 || ptype == ids::FIGH
}

/// Render a preview for a blob in either container format.
pub fn prerender(data: &[u8], registry: &ElementRegistry) -> Option<Image> {
    match crate::sniff_format(data)? {
        SaveFormat::Document => render_document(data, registry).ok(),
        SaveFormat::Legacy => render_legacy(data, registry).ok(),
    }
}

fn render_document(data: &[u8], registry: &ElementRegistry) -> Result<Image, DecodeError> {
    if data.len() < 16 {
        return Err(DecodeError::Truncated);
    }
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
    let packed_len = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    if data.len() - 12 < packed_len {
        return Err(DecodeError::Truncated);
    }
    let payload = decompress_bounded(&data[12..12 + packed_len])?;
    let doc = Document::decode(&payload)?;

    let version = data[4] as i32;
    let mod_version = doc.int_of("modVersion").unwrap_or(0);
    let identity = match crate::document::palette_entries(&doc) {
        Some(entries) => ElementIdentityMap::from_palette(&entries, registry),
        None => ElementIdentityMap::from_versions(version, mod_version),
    };

    let (w, h) = (bw * CELL, bh * CELL);
    let mut img = Image::new(w, h);

    if let Some(wall_data) = doc.binary_of("wallMap") {
        if (bw * bh) as usize > wall_data.len() {
            return Err(DecodeError::Truncated);
        }
        for bx in 0..bw {
            for by in 0..bh {
                let wall = wall_data[(by * bw + bx) as usize];
                if wall != 0 && wall < WALL_TYPE_COUNT {
                    draw_wall(&mut img, bx, by, wall);
                }
            }
        }
    }

    if let (Some(parts), Some(pos)) = (doc.binary_of("parts"), doc.binary_of("partsPos")) {
        if (w * h * 3) as usize > pos.len() {
            return Err(DecodeError::Truncated);
        }
        let mut pos = Reader::new(pos);
        let mut pr = Reader::new(parts);
        for y in 0..h {
            for x in 0..w {
                let total = pos.read_u24be()?;
                for _ in 0..total {
                    let rec = read_record(&mut pr, mod_version)?;
                    let mut ptype = identity.resolve(rec.rtype);
                    if !registry.is_enabled(ptype) {
                        ptype = ids::NONE;
                    }
                    if is_figure(ptype) {
                        draw_figure(&mut img, x, y, ptype);
                    } else {
                        img.put(x, y, registry.colour(ptype));
                    }
                    if rec.has_dcolour {
                        img.blend_over(x, y, rec.dcolour);
                    }
                }
            }
        }
    }
    Ok(img)
}

fn render_legacy(data: &[u8], registry: &ElementRegistry) -> Result<Image, DecodeError> {
    if data.len() < 16 {
        return Err(DecodeError::Truncated);
    }
    if data[5] as i32 != CELL {
        return Err(DecodeError::IncompatibleCellSize {
            expected: CELL,
            found: data[5],
        });
    }
    let raw_version = data[4] as i32;
    let (ver, _modver) = crate::legacy::split_version(raw_version);
    let bw = data[6] as i32;
    let bh = data[7] as i32;
    if bw > BLOCK_W || bh > BLOCK_H || bw == 0 || bh == 0 {
        return Err(DecodeError::SaveTooLarge { w: bw, h: bh });
    }
    let declared = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let payload = decompress_declared(&data[12..], declared)?;
    if payload.len() < (bw * bh) as usize {
        return Err(DecodeError::Truncated);
    }
    let mut r = Reader::new(&payload);

    let (w, h) = (bw * CELL, bh * CELL);
    let mut img = Image::new(w, h);

    // Wall grid; count fan cells so their velocity bytes can be skipped.
    let mut fan_cells = 0usize;
    for by in 0..bh {
        for bx in 0..bw {
            let raw = r.read_u8()? as i32;
            if raw == 0 {
                continue;
            }
            let wall = crate::legacy::from_legacy_wall(raw, ver);
            if !(0..WALL_TYPE_COUNT as i32).contains(&wall) {
                continue;
            }
            draw_wall(&mut img, bx, by, wall as u8);
            if wall == walls::FAN as i32 {
                fan_cells += 1;
            }
        }
    }
    r.skip(2 * fan_cells)?;

    // Particle type grid: color pixels and remember occupancy for the
    // property-pass skips.
    let mut type_grid = vec![0i32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let j = r.read_u8()? as i32;
            if j <= 0 || j >= dustbox_core::element::ELEMENT_COUNT {
                continue;
            }
            type_grid[(y * w + x) as usize] = j;
            if is_figure(j) {
                draw_figure(&mut img, x, y, j);
            } else {
                img.put(x, y, registry.colour(j));
            }
        }
    }
    let occupied = |idx: usize| type_grid[idx] != 0;
    let area = (w * h) as usize;

    // Velocity pass.
    for idx in 0..area {
        if occupied(idx) {
            r.skip(2)?;
        }
    }
    // Life pass.
    for idx in 0..area {
        if occupied(idx) {
            r.skip(if ver >= 44 { 2 } else { 1 })?;
        }
    }
    // Tmp pass.
    if ver >= 44 {
        for idx in 0..area {
            if occupied(idx) {
                r.skip(2)?;
            }
        }
    }
    // Tmp2 pass.
    if ver >= 53 {
        for idx in 0..area {
            let ty = type_grid[idx];
            if occupied(idx) && (ty == ids::PBCN || (ty == ids::TRON && ver >= 77)) {
                r.skip(1)?;
            }
        }
    }
    // Decoration passes overlay the drawn colors.
    if ver >= 49 {
        for idx in 0..area {
            if occupied(idx) && r.read_u8()? != 0 {
                img.pixels[idx] = 0;
            }
        }
        for shift in [16u32, 8, 0] {
            for idx in 0..area {
                if occupied(idx) {
                    let component = r.read_u8()? as u32;
                    img.pixels[idx] |= component << shift;
                }
            }
        }
    }
    Ok(img)
}

// ---------------------------------------------------------------------------
// Companion catalog thumbnail
// ---------------------------------------------------------------------------

/// Marker byte for wall-covered pixels in the catalog thumbnail map.
const THUMB_WALL: u8 = 0xFF;

/// Encode the whole simulation as a catalog thumbnail: fixed header plus
/// a compressed per-pixel element-ID map.
pub fn build_thumb(state: &SimulationState) -> Result<Vec<u8>, EncodeError> {
    let mut map = vec![0u8; (XRES * YRES) as usize];
    for p in &state.parts {
        if p.is_empty() {
            continue;
        }
        let (x, y) = p.rounded_pos();
        if (0..XRES).contains(&x) && (0..YRES).contains(&y) {
            map[(x + y * XRES) as usize] = p.ptype as u8;
        }
    }
    for by in 0..BLOCK_H {
        for bx in 0..BLOCK_W {
            if state.walls[SimulationState::cell_index(bx, by)] == 0 {
                continue;
            }
            for j in 0..CELL {
                for i in 0..CELL {
                    map[(bx * CELL + i + (by * CELL + j) * XRES) as usize] = THUMB_WALL;
                }
            }
        }
    }

    let packed = compress(&map)?;
    let mut out = Writer::with_capacity(packed.len() + 8);
    out.extend(&THUMB_MAGIC);
    out.push_u8(crate::SAVE_VERSION as u8);
    out.push_u8(CELL as u8);
    out.push_u8(BLOCK_W as u8);
    out.push_u8(BLOCK_H as u8);
    out.extend(&packed);
    Ok(out.into_vec())
}

/// Render a catalog thumbnail blob.
pub fn render_thumb(data: &[u8], registry: &ElementRegistry) -> Option<Image> {
    if data.len() < 8 || data[..4] != THUMB_MAGIC {
        return None;
    }
    if data[5] as i32 != CELL {
        return None;
    }
    let bw = data[6] as i32;
    let bh = data[7] as i32;
    if bw == 0 || bh == 0 {
        return None;
    }
    let (w, h) = (bw * CELL, bh * CELL);
    let map = decompress_bounded(&data[8..]).ok()?;
    if map.len() < (w * h) as usize {
        return None;
    }
    let mut img = Image::new(w, h);
    for idx in 0..(w * h) as usize {
        img.pixels[idx] = match map[idx] {
            0 => 0,
            THUMB_WALL => 0x808080,
            t => registry.colour(t as i32),
        };
    }
    Some(img)
}

// The sniffing entry points live in the crate root; re-exported magics
// keep the header layouts in one place per format.
pub(crate) fn looks_like_legacy(data: &[u8]) -> bool {
    data.len() >= 3 && (data[..3] == MAGIC_OLD || data[..3] == MAGIC_NEW)
}

pub(crate) fn looks_like_document(data: &[u8]) -> bool {
    data.len() >= 4
        && data[0] == DOC_MAGIC[0]
        && data[1] == DOC_MAGIC[1]
        && (data[2] == DOC_MAGIC[2] || data[2] == b'J')
        && data[3] == DOC_MAGIC[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_put_get_is_bounds_checked() {
        let mut img = Image::new(4, 4);
        img.put(2, 2, 0x123456);
        img.put(-1, 0, 0xFFFFFF);
        img.put(0, 99, 0xFFFFFF);
        assert_eq!(img.get(2, 2), 0x123456);
        assert_eq!(img.get(-1, 0), 0);
        assert_eq!(img.get(0, 99), 0);
    }

    #[test]
    fn blend_full_alpha_replaces() {
        let mut img = Image::new(1, 1);
        img.put(0, 0, 0x102030);
        img.blend_over(0, 0, colour::argb(255, 200, 100, 50));
        let c = img.get(0, 0);
        // >>8 of a*255 loses at most one count per channel.
        assert!(colour::red(c) >= 199);
        assert!(colour::green(c) >= 99);
    }

    #[test]
    fn thumb_round_trip() {
        let registry = ElementRegistry::builtin();
        let mut state = SimulationState::new();
        state.parts[0] = dustbox_core::particle::Particle {
            ptype: ids::DUST,
            x: 10.0,
            y: 10.0,
            ..Default::default()
        };
        state.walls[SimulationState::cell_index(0, 0)] = walls::WALL;
        let blob = build_thumb(&state).unwrap();
        let img = render_thumb(&blob, &registry).unwrap();
        assert_eq!(img.width, XRES);
        assert_eq!(img.height, YRES);
        assert_eq!(img.get(10, 10), registry.colour(ids::DUST));
        assert_eq!(img.get(1, 1), 0x808080);
    }

    #[test]
    fn corrupt_thumb_is_none() {
        let registry = ElementRegistry::builtin();
        assert!(render_thumb(&[0; 4], &registry).is_none());
        let mut blob = build_thumb(&SimulationState::new()).unwrap();
        blob.truncate(20);
        assert!(render_thumb(&blob, &registry).is_none());
    }
}
