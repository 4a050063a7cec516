//! Geometric transformation of a save for clipboard and stamp editing.
//!
//! Decodes the blob read-only into scratch state, pushes every position
//! and velocity through the matrix, re-anchors the result at the origin,
//! drops anything that lands outside the new bounds, and re-encodes.
//! Same input and transform always yield byte-identical output.

use dustbox_core::state::{Region, SimulationState};
use dustbox_core::wall::walls;
use dustbox_core::{BLOCK_H, BLOCK_W, CELL, XRES, YRES};

use dustbox_core::element::ElementRegistry;

use crate::error::TransformError;
use crate::{document, DecodeOptions, EncodeOptions, ReplaceMode};

/// A 2x2 transformation matrix, row-major.
pub type Matrix = [[f32; 2]; 2];

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (
        m[0][0] * x + m[0][1] * y,
        m[1][0] * x + m[1][1] * y,
    )
}

pub(crate) fn transform(
    data: &[u8],
    registry: &ElementRegistry,
    matrix: Matrix,
    translate: (f32, f32),
) -> Result<Vec<u8>, TransformError> {
    let mut scratch = SimulationState::new();
    let opts = DecodeOptions {
        replace: ReplaceMode::None,
        include_pressure: true,
        session_metadata: false,
    };
    let report = crate::parse_save(data, 0, 0, &mut scratch, registry, &opts)?;
    let w = report.block_w * CELL;
    let h = report.block_h * CELL;

    // Transform the four corners to find the new bounding box, then fold
    // its top-left into the translation so the result re-anchors at the
    // origin.
    let corners = [
        (0.0, 0.0),
        (w as f32 - 1.0, 0.0),
        (0.0, h as f32 - 1.0),
        (w as f32 - 1.0, h as f32 - 1.0),
    ];
    let mut top_left = apply(&matrix, corners[0].0, corners[0].1);
    let mut bottom_right = top_left;
    for &(cx, cy) in &corners[1..] {
        let (tx, ty) = apply(&matrix, cx, cy);
        top_left.0 = top_left.0.min(tx);
        top_left.1 = top_left.1.min(ty);
        bottom_right.0 = bottom_right.0.max(tx);
        bottom_right.1 = bottom_right.1.max(ty);
    }
    let anchor_x = (top_left.0 + 0.5).floor();
    let anchor_y = (top_left.1 + 0.5).floor();
    let translate = (translate.0 - anchor_x, translate.1 - anchor_y);
    let new_w = (((bottom_right.0 + 0.5).floor() - anchor_x) as i32 + 1).min(XRES);
    let new_h = (((bottom_right.1 + 0.5).floor() - anchor_y) as i32 + 1).min(YRES);

    let mut out = SimulationState::new();
    out.flags = scratch.flags.clone();
    out.moving_solids = scratch.moving_solids.clone();

    for sign in &scratch.signs {
        let (tx, ty) = apply(&matrix, sign.x as f32, sign.y as f32);
        let nx = (tx + translate.0 + 0.5).floor() as i32;
        let ny = (ty + translate.1 + 0.5).floor() as i32;
        if nx < 0 || nx >= new_w || ny < 0 || ny >= new_h {
            continue;
        }
        let mut sign = sign.clone();
        sign.x = nx;
        sign.y = ny;
        out.signs.push(sign);
    }

    for (i, p) in scratch.parts.iter().enumerate() {
        if p.is_empty() {
            continue;
        }
        let (tx, ty) = apply(&matrix, p.x, p.y);
        let nx = (tx + translate.0 + 0.5).floor() as i32;
        let ny = (ty + translate.1 + 0.5).floor() as i32;
        if nx < 0 || nx >= new_w || ny < 0 || ny >= new_h {
            continue;
        }
        let mut p = p.clone();
        p.x = nx as f32;
        p.y = ny as f32;
        let (vx, vy) = apply(&matrix, p.vx, p.vy);
        p.vx = vx;
        p.vy = vy;
        out.parts[i] = p;
    }

    // Cell grids are sampled at a point inside each source cell so the
    // rounding stays inside the transformed cell.
    for by in 0..BLOCK_H {
        for bx in 0..BLOCK_W {
            let sample_x = (bx * CELL) as f32 + CELL as f32 * 0.4;
            let sample_y = (by * CELL) as f32 + CELL as f32 * 0.4;
            let (tx, ty) = apply(&matrix, sample_x, sample_y);
            let nbx = ((tx + translate.0) / CELL as f32) as i32;
            let nby = ((ty + translate.1) / CELL as f32) as i32;
            if nbx < 0 || nbx >= new_w / CELL || nby < 0 || nby >= new_h / CELL {
                continue;
            }
            let src = SimulationState::cell_index(bx, by);
            let dst = SimulationState::cell_index(nbx, nby);
            if scratch.walls[src] != 0 {
                out.walls[dst] = scratch.walls[src];
                if scratch.walls[src] == walls::FAN {
                    let (fx, fy) = apply(&matrix, scratch.fan_vx[src], scratch.fan_vy[src]);
                    out.fan_vx[dst] = fx;
                    out.fan_vy[dst] = fy;
                }
            }
            let (vx, vy) = apply(&matrix, scratch.vel_x[src], scratch.vel_y[src]);
            out.vel_x[dst] = vx;
            out.vel_y[dst] = vy;
            out.pressure[dst] = scratch.pressure[src];
            out.ambient[dst] = scratch.ambient[src];
        }
    }

    let encode_opts = EncodeOptions {
        include_pressure: true,
        session: None,
        authors: report.authors,
    };
    let blob = document::encode(
        &out,
        Region::new(0, 0, new_w, new_h),
        registry,
        &encode_opts,
    )?;
    Ok(blob)
}
