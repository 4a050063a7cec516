//! Dustbox Core -- shared data model for the particle sandbox.
//!
//! This crate holds everything the save codec and a simulation front-end
//! have to agree on: the fixed simulation bounds, the coarse cell size,
//! the [`particle::Particle`] record, wall types, signs, the element
//! registry, and the [`state::SimulationState`] context struct that the
//! codec reads and writes.
//!
//! # Key Types
//!
//! - [`particle::Particle`] -- one simulation entity.
//! - [`element::ElementRegistry`] -- numeric IDs, string identifiers,
//!   colors and enabled flags for every element slot.
//! - [`sign::Sign`] -- positioned text annotation with sanitized text.
//! - [`state::SimulationState`] -- caller-owned particle array, position
//!   map, coarse grids, signs and global simulation flags, passed to the
//!   codec as an explicit context instead of ambient globals.

pub mod colour;
pub mod element;
pub mod particle;
pub mod sign;
pub mod state;
pub mod wall;

/// Side length of one coarse cell, in pixels. Wall, fan, pressure,
/// velocity and ambient-heat grids all use this granularity.
pub const CELL: i32 = 4;

/// Simulation width in pixels. Always a multiple of [`CELL`].
pub const XRES: i32 = 612;

/// Simulation height in pixels. Always a multiple of [`CELL`].
pub const YRES: i32 = 384;

/// Coarse grid width in cells.
pub const BLOCK_W: i32 = XRES / CELL;

/// Coarse grid height in cells.
pub const BLOCK_H: i32 = YRES / CELL;

/// Capacity of the particle array.
pub const NPART: usize = (XRES * YRES) as usize;

/// Reference temperature for the compact per-particle temperature
/// encoding, in Kelvin (21 C).
pub const TEMP_REFERENCE: f32 = 294.15;

/// Default particle and ambient temperature, in Kelvin (22 C).
pub const DEFAULT_TEMP: f32 = 295.15;

/// Highest representable particle temperature, in Kelvin.
pub const MAX_TEMP: f32 = 9999.0;

/// Lowest representable particle temperature, in Kelvin.
pub const MIN_TEMP: f32 = 0.0;

/// Temperature range of the oldest save revisions, in Celsius.
pub const OLD_MAX_TEMP: f32 = 3500.0;
pub const OLD_MIN_TEMP: f32 = -273.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_whole_cells() {
        assert_eq!(XRES % CELL, 0);
        assert_eq!(YRES % CELL, 0);
        assert_eq!(BLOCK_W * CELL, XRES);
        assert_eq!(BLOCK_H * CELL, YRES);
    }
}
