//! Surface sizing.
//!
//! The surface keeps the aspect ratio of the target generation resolution,
//! with its longest edge capped. The displayed size fits a fixed box.

use couple_core::SurfaceSize;

use crate::backend::PixelRect;

/// Parse a `WIDTHxHEIGHT` resolution string.
#[must_use]
pub fn parse_resolution(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    let h = h.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    Some((w, h))
}

/// Surface pixel size for a target resolution.
///
/// Resolutions whose longest edge exceeds `max_edge` are scaled down to it;
/// smaller ones are used as-is. Degenerate input yields the default size.
#[must_use]
pub fn surface_size(width: u32, height: u32, max_edge: u32) -> SurfaceSize {
    if width == 0 || height == 0 || max_edge == 0 {
        return SurfaceSize::default();
    }
    let longest = width.max(height);
    if longest <= max_edge {
        return SurfaceSize::new(width, height);
    }
    let scale = f64::from(max_edge) / f64::from(longest);
    SurfaceSize::new(scaled(width, scale), scaled(height, scale))
}

/// Display size of a surface inside a `box_width` x `box_height` box.
#[must_use]
pub fn display_size(surface: SurfaceSize, box_width: u32, box_height: u32) -> (u32, u32) {
    if surface.width == 0 || surface.height == 0 {
        return (box_width, box_height);
    }
    let scale = (f64::from(box_width) / f64::from(surface.width))
        .min(f64::from(box_height) / f64::from(surface.height));
    (scaled(surface.width, scale), scaled(surface.height, scale))
}

/// Destination rectangle that letterboxes an image onto the surface.
#[must_use]
pub fn letterbox(image_width: u32, image_height: u32, surface: SurfaceSize) -> PixelRect {
    let sw = f64::from(surface.width);
    let sh = f64::from(surface.height);
    if image_width == 0 || image_height == 0 {
        return PixelRect::new(0.0, 0.0, sw, sh);
    }
    let scale = (sw / f64::from(image_width)).min(sh / f64::from(image_height));
    let w = f64::from(image_width) * scale;
    let h = f64::from(image_height) * scale;
    PixelRect::new((sw - w) / 2.0, (sh - h) / 2.0, w, h)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(value: u32, scale: f64) -> u32 {
    ((f64::from(value) * scale).round() as u32).max(1)
}
