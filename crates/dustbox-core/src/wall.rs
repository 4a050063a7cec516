//! Wall types for the coarse cell grid.
//!
//! The canonical numbering below is what the simulation and the
//! self-describing save format use. The legacy container's two historical
//! numberings are translated by the codec, not here.

/// Canonical wall IDs. Zero is no wall.
#[allow(missing_docs)]
pub mod walls {
    pub const NONE: u8 = 0;
    pub const WALL: u8 = 1;
    pub const DESTROYALL: u8 = 2;
    pub const ALLOWLIQUID: u8 = 3;
    pub const FAN: u8 = 4;
    pub const STREAM: u8 = 5;
    pub const DETECT: u8 = 6;
    pub const EWALL: u8 = 7;
    pub const WALLELEC: u8 = 8;
    pub const ALLOWAIR: u8 = 9;
    pub const ALLOWPOWDER: u8 = 10;
    pub const ALLOWALLELEC: u8 = 11;
    pub const EHOLE: u8 = 12;
    pub const ALLOWGAS: u8 = 13;
    pub const GRAV: u8 = 14;
    pub const ALLOWENERGY: u8 = 15;
}

/// Number of canonical wall types.
pub const WALL_TYPE_COUNT: u8 = 16;

/// Render description of a wall type for the preview renderers.
#[derive(Debug, Clone, Copy)]
pub struct WallDef {
    /// Fill color, packed `0xRRGGBB`.
    pub colour: u32,
    /// Secondary glow color used by the diagonal draw style.
    pub glow: u32,
    /// 1 = sparse checker, 2 = open checker, 3 = solid, 4 = diagonal.
    pub draw_style: u8,
}

/// Colors and draw styles per canonical wall ID.
pub fn wall_def(wall: u8) -> WallDef {
    use walls::*;
    let (colour, glow, draw_style) = match wall {
        WALL => (0x808080, 0, 3),
        DESTROYALL => (0xFF3232, 0, 1),
        ALLOWLIQUID => (0x808080, 0, 1),
        FAN => (0x8080FF, 0, 1),
        STREAM => (0x404040, 0, 3),
        DETECT => (0xFF9900, 0, 1),
        EWALL => (0x808080, 0x101010, 1),
        WALLELEC => (0xFFFF22, 0, 1),
        ALLOWAIR => (0x3C3C3C, 0, 1),
        ALLOWPOWDER => (0x575757, 0, 1),
        ALLOWALLELEC => (0xFFFF22, 0x101010, 2),
        EHOLE => (0xFFFFFF, 0x242424, 1),
        ALLOWGAS => (0x579777, 0, 1),
        GRAV => (0xFFEE00, 0xAA9900, 4),
        ALLOWENERGY => (0xFFAA00, 0xAA5500, 4),
        _ => (0, 0, 0),
    };
    WallDef {
        colour,
        glow,
        draw_style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_real_wall_has_a_draw_style() {
        for w in 1..WALL_TYPE_COUNT {
            assert!(wall_def(w).draw_style > 0, "wall {w} has no style");
        }
        assert_eq!(wall_def(walls::NONE).draw_style, 0);
        assert_eq!(wall_def(200).draw_style, 0);
    }
}
