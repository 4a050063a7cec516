//! The per-particle record.

use serde::{Deserialize, Serialize};

/// Photons keep their decoration color through refraction.
pub const FLAG_PHOT_DECO: u32 = 0x8;

/// Moving-solid particles marked as detached from their group.
pub const FLAG_DISAPPEAR: u32 = 0x10;

/// One simulation entity. A particle is live while `ptype` is nonzero;
/// slot ownership stays with the caller-supplied particle array.
///
/// `tmp`, `tmp2` and `ctype` are element-specific scratch fields; `ctype`
/// frequently holds a nested element-type reference and is remapped by the
/// codec for the element types that use it that way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Element ID. Zero is the empty sentinel.
    pub ptype: i32,
    /// Position in pixel space, always within the simulation bounds.
    pub x: f32,
    pub y: f32,
    /// Velocity in pixels per step.
    pub vx: f32,
    pub vy: f32,
    /// Temperature in Kelvin.
    pub temp: f32,
    /// Element-specific counter.
    pub life: i32,
    pub tmp: i32,
    pub tmp2: i32,
    pub ctype: i32,
    /// Optional decoration color override, packed ARGB. Zero alpha means
    /// no decoration.
    pub dcolour: u32,
    pub flags: u32,
    /// Pressure-average pair, used only by moving-solid composite bodies.
    pub pavg: [f32; 2],
    /// Per-frame color animation, present only for the animated element.
    pub animations: Option<Vec<u32>>,
}

impl Particle {
    pub fn is_empty(&self) -> bool {
        self.ptype == 0
    }

    /// Position rounded to the nearest integer pixel, the way every format
    /// pass and the position map address particles.
    pub fn rounded_pos(&self) -> (i32, i32) {
        ((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32)
    }

    /// Reset the slot to the empty sentinel.
    pub fn clear(&mut self) {
        *self = Particle::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let p = Particle::default();
        assert!(p.is_empty());
        assert_eq!(p.pavg, [0.0, 0.0]);
        assert!(p.animations.is_none());
    }

    #[test]
    fn rounded_pos_rounds_half_up() {
        let p = Particle {
            x: 10.5,
            y: 3.49,
            ..Particle::default()
        };
        assert_eq!(p.rounded_pos(), (11, 3));
    }
}
