//! Mapping preview images.
//!
//! Renders a mapping as colored outlines on a translucent matte, the same
//! picture the backend's own preview shows next to the generation settings.

use std::io::Cursor;

use base64::Engine;
use couple_core::mapping::{tuples_from_value, MappingTuple};
use couple_core::region::PALETTE;
use couple_core::{validate_mapping, EditorMode, SurfaceSize};
use image::{ImageFormat, RgbaImage};
use serde_json::Value;

use crate::backend::raster::RasterSurface;
use crate::backend::{DrawSurface, PixelRect};
use crate::color::{region_color, Rgba};
use crate::error::{RenderError, RenderResult};

/// Preview area above which the size is halved.
pub const MAX_PREVIEW_AREA: u64 = 1024 * 1024;

/// Preview area below which the size is doubled.
pub const MIN_PREVIEW_AREA: u64 = 512 * 512;

/// Translucent background of the preview.
pub const MATTE: Rgba = Rgba::new(0, 0, 0, 64);

/// Preview size for a generation resolution.
///
/// Halved while the area exceeds [`MAX_PREVIEW_AREA`], then doubled while it
/// is below [`MIN_PREVIEW_AREA`].
#[must_use]
pub fn preview_size(width: u32, height: u32) -> SurfaceSize {
    let (mut w, mut h) = (u64::from(width.max(1)), u64::from(height.max(1)));
    while w * h > MAX_PREVIEW_AREA && w > 1 && h > 1 {
        w /= 2;
        h /= 2;
    }
    while w * h < MIN_PREVIEW_AREA {
        w *= 2;
        h *= 2;
    }
    SurfaceSize::new(
        u32::try_from(w).unwrap_or(u32::MAX),
        u32::try_from(h).unwrap_or(u32::MAX),
    )
}

/// Outline width for a preview of the given size.
#[must_use]
pub fn line_width(size: SurfaceSize) -> f64 {
    (f64::from(size.width.min(size.height)) / 128.0).max(4.0).floor()
}

/// Render a mapping preview.
///
/// Returns `None` outside `Advanced` mode. An invalid mapping yields the bare
/// matte.
#[must_use]
pub fn visualize_mapping(
    mode: EditorMode,
    resolution: (u32, u32),
    mapping: &Value,
) -> Option<RgbaImage> {
    if !mode.syncs_regions() {
        return None;
    }
    let size = preview_size(resolution.0, resolution.1);
    if !validate_mapping(mapping) {
        tracing::debug!("Invalid mapping, preview shows matte only");
        return Some(draw_tuples(size, &[]));
    }
    Some(draw_tuples(size, &tuples_from_value(mapping)))
}

/// Render tuples onto a matte of the preview size for `resolution`.
#[must_use]
pub fn visualize_tuples(resolution: (u32, u32), mapping: &[MappingTuple]) -> RgbaImage {
    draw_tuples(preview_size(resolution.0, resolution.1), mapping)
}

fn draw_tuples(size: SurfaceSize, mapping: &[MappingTuple]) -> RgbaImage {
    let mut surface = RasterSurface::new(size);
    surface.clear(MATTE);
    let lw = line_width(size);
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    for (i, &[x1, x2, y1, y2, _]) in mapping.iter().enumerate() {
        let x_from = (w * x1).trunc();
        let x_to = (w * x2).trunc();
        let y_from = (h * y1).trunc();
        let y_to = (h * y2).trunc();
        let rect = PixelRect::new(x_from, y_from, x_to - x_from, y_to - y_from);
        surface.stroke_rect(rect, region_color(PALETTE[i % PALETTE.len()]), lw);
    }
    surface.into_image()
}

/// Encode pixels as PNG.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(image: &RgbaImage) -> RenderResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Encode pixels as a `data:image/png;base64,` URI.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn png_data_uri(image: &RgbaImage) -> RenderResult<String> {
    let png = encode_png(image)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}
