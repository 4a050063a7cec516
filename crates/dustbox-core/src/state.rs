//! The caller-owned simulation state the codec reads and writes.
//!
//! Decode mutates this in place when a replace mode is active; the codec
//! never keeps references across calls. Callers must not step the
//! simulation over the same arrays while a decode is running.

use serde::{Deserialize, Serialize};

use crate::element::ELEMENT_COUNT;
use crate::particle::Particle;
use crate::sign::Sign;
use crate::{BLOCK_H, BLOCK_W, DEFAULT_TEMP, NPART, XRES, YRES};

/// A pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region { x, y, w, h }
    }

    /// The whole simulation area.
    pub fn full() -> Region {
        Region::new(0, 0, XRES, YRES)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Global simulation-mode flags carried inside saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFlags {
    /// Pre-heat-simulation compatibility mode.
    pub legacy_heat: bool,
    pub paused: bool,
    /// Newtonian gravity enabled.
    pub gravity_enable: bool,
    pub aheat_enable: bool,
    pub water_equalization: bool,
    pub ms_rotation: bool,
    pub decorations_enable: bool,
    pub hud_enable: bool,
    pub gravity_mode: i32,
    pub air_mode: i32,
    pub edge_mode: i32,
    pub active_menu: i32,
    pub render_modes: Vec<u32>,
    pub display_modes: Vec<u32>,
    pub colour_mode: u32,
    /// Identifiers of the tools bound to each mouse button.
    pub left_tool: String,
    pub right_tool: String,
}

impl Default for SimFlags {
    fn default() -> SimFlags {
        SimFlags {
            legacy_heat: false,
            paused: false,
            gravity_enable: false,
            aheat_enable: false,
            water_equalization: false,
            ms_rotation: false,
            decorations_enable: true,
            hud_enable: true,
            gravity_mode: 0,
            air_mode: 0,
            edge_mode: 0,
            active_menu: 0,
            render_modes: Vec::new(),
            display_modes: Vec::new(),
            colour_mode: 0,
            left_tool: String::from("DEFAULT_PT_DUST"),
            right_tool: String::from("DEFAULT_PT_NONE"),
        }
    }
}

/// One moving-solid composite body. Particles belong to a group through
/// their `tmp2` field; the group keeps the shared rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingSolid {
    pub rotation: f32,
    pub particle_count: u32,
    /// Live index + 1 of the controlling center particle, zero if unset.
    pub centre: u32,
}

/// Maximum number of moving-solid groups.
pub const MAX_MOVING_SOLIDS: usize = 256;

/// Particle array, position map, coarse grids, signs and flags.
///
/// The position map stores `(index << 8) | 1` for the topmost particle at
/// each pixel, zero for none. Coarse grids are row-major
/// `BLOCK_H x BLOCK_W`; the particle map is row-major `YRES x XRES`.
pub struct SimulationState {
    pub parts: Vec<Particle>,
    pub pmap: Vec<u32>,
    pub walls: Vec<u8>,
    pub fan_vx: Vec<f32>,
    pub fan_vy: Vec<f32>,
    pub pressure: Vec<f32>,
    pub vel_x: Vec<f32>,
    pub vel_y: Vec<f32>,
    pub ambient: Vec<f32>,
    pub signs: Vec<Sign>,
    pub moving_solids: Vec<MovingSolid>,
    /// Live particles per element ID, kept for singleton checks.
    pub element_count: Vec<u32>,
    pub flags: SimFlags,
}

impl SimulationState {
    pub fn new() -> SimulationState {
        let cells = (BLOCK_W * BLOCK_H) as usize;
        SimulationState {
            parts: vec![Particle::default(); NPART],
            pmap: vec![0; (XRES * YRES) as usize],
            walls: vec![0; cells],
            fan_vx: vec![0.0; cells],
            fan_vy: vec![0.0; cells],
            pressure: vec![0.0; cells],
            vel_x: vec![0.0; cells],
            vel_y: vec![0.0; cells],
            ambient: vec![DEFAULT_TEMP; cells],
            signs: Vec::new(),
            moving_solids: Vec::new(),
            element_count: vec![0; ELEMENT_COUNT as usize],
            flags: SimFlags::default(),
        }
    }

    /// Remove everything: particles, grids, signs. Flags are left alone;
    /// the codec overwrites them according to the replace mode.
    pub fn clear(&mut self) {
        for p in &mut self.parts {
            p.clear();
        }
        self.pmap.fill(0);
        self.walls.fill(0);
        self.fan_vx.fill(0.0);
        self.fan_vy.fill(0.0);
        self.pressure.fill(0.0);
        self.vel_x.fill(0.0);
        self.vel_y.fill(0.0);
        self.ambient.fill(DEFAULT_TEMP);
        self.signs.clear();
        self.moving_solids.clear();
        self.element_count.fill(0);
    }

    /// Row-major index into the coarse grids.
    #[inline]
    pub fn cell_index(bx: i32, by: i32) -> usize {
        (by * BLOCK_W + bx) as usize
    }

    /// Row-major index into the particle position map.
    #[inline]
    pub fn pmap_index(x: i32, y: i32) -> usize {
        (y * XRES + x) as usize
    }

    pub fn pmap_get(&self, x: i32, y: i32) -> u32 {
        self.pmap[Self::pmap_index(x, y)]
    }

    pub fn pmap_set(&mut self, x: i32, y: i32, entry: u32) {
        self.pmap[Self::pmap_index(x, y)] = entry;
    }

    /// Rebuild the position map and element counts from the particle
    /// array.
    pub fn rebuild_indices(&mut self) {
        self.pmap.fill(0);
        self.element_count.fill(0);
        for (i, p) in self.parts.iter().enumerate() {
            if p.is_empty() {
                continue;
            }
            let (x, y) = p.rounded_pos();
            if (0..XRES).contains(&x) && (0..YRES).contains(&y) {
                self.pmap[Self::pmap_index(x, y)] = ((i as u32) << 8) | 1;
            }
            if (0..ELEMENT_COUNT).contains(&p.ptype) {
                let c = &mut self.element_count[p.ptype as usize];
                *c = c.saturating_add_signed(1);
            }
        }
    }

    pub fn count_of(&self, ptype: i32) -> u32 {
        if (0..ELEMENT_COUNT).contains(&ptype) {
            self.element_count[ptype as usize]
        } else {
            0
        }
    }

    pub fn bump_count(&mut self, ptype: i32, delta: i32) {
        if (0..ELEMENT_COUNT).contains(&ptype) {
            let c = &mut self.element_count[ptype as usize];
            *c = c.saturating_add_signed(delta);
        }
    }
}

impl Default for SimulationState {
    fn default() -> SimulationState {
        SimulationState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ids;

    #[test]
    fn clear_resets_everything() {
        let mut state = SimulationState::new();
        state.parts[0].ptype = ids::DUST;
        state.walls[3] = 1;
        state.signs.push(Sign::new(
            "x",
            0,
            0,
            crate::sign::Justification::Left,
        ));
        state.rebuild_indices();
        assert_eq!(state.count_of(ids::DUST), 1);

        state.clear();
        assert!(state.parts[0].is_empty());
        assert_eq!(state.walls[3], 0);
        assert!(state.signs.is_empty());
        assert_eq!(state.count_of(ids::DUST), 0);
    }

    #[test]
    fn rebuild_indices_maps_rounded_positions() {
        let mut state = SimulationState::new();
        state.parts[7] = Particle {
            ptype: ids::WATR,
            x: 10.4,
            y: 20.6,
            ..Particle::default()
        };
        state.rebuild_indices();
        assert_eq!(state.pmap_get(10, 21), (7 << 8) | 1);
        assert_eq!(state.count_of(ids::WATR), 1);
    }
}
