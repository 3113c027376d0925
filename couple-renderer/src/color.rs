//! RGBA colors and hex parsing.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// Create a color from components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidColor`] for anything else.
    pub fn from_hex(hex: &str) -> RenderResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || RenderError::InvalidColor(hex.to_string());
        let byte = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(invalid)
        };
        match digits.len() {
            3 => {
                let mut out = [0u8; 4];
                for (slot, c) in out.iter_mut().zip(digits.chars()) {
                    let v = c.to_digit(16).ok_or_else(invalid)?;
                    *slot = u8::try_from(v * 17).map_err(|_| invalid())?;
                }
                out[3] = 255;
                Ok(Self(out))
            }
            6 => Ok(Self([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Ok(Self([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => Err(invalid()),
        }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }

    /// Alpha component.
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// CSS-style hex string (`#rrggbb`, or `#rrggbbaa` when translucent).
    #[must_use]
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Parse a region color, falling back to black for unparsable input.
#[must_use]
pub fn region_color(hex: &str) -> Rgba {
    Rgba::from_hex(hex).unwrap_or_else(|e| {
        tracing::warn!("{e}, drawing in black");
        Rgba::BLACK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgba::from_hex("#ff0000").ok(), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(Rgba::from_hex("4b0082").ok(), Some(Rgba::new(75, 0, 130, 255)));
        assert_eq!(Rgba::from_hex("#fa0").ok(), Some(Rgba::new(255, 170, 0, 255)));
        assert_eq!(Rgba::from_hex("#00000040").ok(), Some(Rgba::new(0, 0, 0, 64)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(Rgba::from_hex("red").is_err());
        assert!(Rgba::from_hex("#12345").is_err());
        assert!(Rgba::from_hex("#gg0000").is_err());
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Rgba::new(238, 130, 238, 255).to_hex(), "#ee82ee");
        assert_eq!(Rgba::new(0, 0, 0, 64).to_hex(), "#00000040");
    }

    #[test]
    fn test_region_color_fallback() {
        assert_eq!(region_color("nope"), Rgba::BLACK);
    }
}
