//! Positioned text annotations.

use serde::{Deserialize, Serialize};

/// Hard cap on the number of signs in a simulation; excess signs in a
/// save are silently dropped on decode.
pub const MAX_SIGNS: usize = 16;

/// Maximum sign text length after sanitization.
pub const SIGN_TEXT_MAX: usize = 45;

/// Text justification of a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Justification {
    Left = 0,
    #[default]
    Center = 1,
    Right = 2,
    Full = 3,
}

impl Justification {
    /// Decode an on-disk value; anything out of range falls back to the
    /// default rather than failing.
    pub fn from_raw(raw: i32) -> Justification {
        match raw {
            0 => Justification::Left,
            1 => Justification::Center,
            2 => Justification::Right,
            3 => Justification::Full,
            _ => Justification::default(),
        }
    }
}

/// A sign: sanitized text anchored at a pixel position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sign {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub justification: Justification,
}

impl Sign {
    pub fn new(text: &str, x: i32, y: i32, justification: Justification) -> Sign {
        Sign {
            text: clean_text(text),
            x,
            y,
            justification,
        }
    }

    /// Whether the sign's anchor lies inside the given pixel rectangle.
    pub fn in_area(&self, x0: i32, y0: i32, w: i32, h: i32) -> bool {
        self.x >= x0 && self.x < x0 + w && self.y >= y0 && self.y < y0 + h
    }
}

/// Strip control and non-printable characters, then clamp to
/// [`SIGN_TEXT_MAX`] characters.
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| (' '..='~').contains(c))
        .take(SIGN_TEXT_MAX)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_and_clamps() {
        assert_eq!(clean_text("a\x01b\nc"), "abc");
        let long = "x".repeat(100);
        assert_eq!(clean_text(&long).len(), SIGN_TEXT_MAX);
        assert_eq!(clean_text("  padded  "), "padded");
    }

    #[test]
    fn justification_from_raw_coerces_invalid() {
        assert_eq!(Justification::from_raw(0), Justification::Left);
        assert_eq!(Justification::from_raw(3), Justification::Full);
        assert_eq!(Justification::from_raw(-1), Justification::Center);
        assert_eq!(Justification::from_raw(99), Justification::Center);
    }

    #[test]
    fn in_area_is_half_open() {
        let s = Sign::new("hi", 10, 10, Justification::Left);
        assert!(s.in_area(10, 10, 1, 1));
        assert!(!s.in_area(0, 0, 10, 10));
    }
}
