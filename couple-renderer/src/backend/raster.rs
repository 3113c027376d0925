//! Raster backend drawing into an RGBA buffer.

use std::ops::Range;

use couple_core::SurfaceSize;
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::background::BackgroundImage;
use crate::color::Rgba;
use crate::{BackendType, RenderResult};

use super::{check_size, DrawSurface, PixelRect};

/// Software surface backed by an [`RgbaImage`].
///
/// Pixels are covered when their center lies inside a shape; colors are
/// composited source-over.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    /// Create a transparent surface.
    #[must_use]
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            pixels: RgbaImage::new(size.width.max(1), size.height.max(1)),
        }
    }

    /// Rendered pixels.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the surface, returning its pixels.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Color at `(x, y)`, if inside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.pixels.width() && y < self.pixels.height())
            .then(|| Rgba(self.pixels.get_pixel(x, y).0))
    }

    fn blend_span(&mut self, xs: Range<u32>, ys: Range<u32>, color: Rgba) {
        for y in ys {
            for x in xs.clone() {
                blend(self.pixels.get_pixel_mut(x, y), color);
            }
        }
    }
}

impl DrawSurface for RasterSurface {
    fn backend_type(&self) -> BackendType {
        BackendType::Raster
    }

    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.pixels.width(), self.pixels.height())
    }

    fn resize(&mut self, size: SurfaceSize) -> RenderResult<()> {
        check_size(size)?;
        self.pixels = RgbaImage::new(size.width, size.height);
        tracing::debug!("Raster surface resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn clear(&mut self, color: Rgba) {
        for pixel in self.pixels.pixels_mut() {
            pixel.0 = color.0;
        }
    }

    fn draw_image(&mut self, image: &BackgroundImage, dest: PixelRect) {
        let xs = span(dest.x, dest.right(), self.pixels.width());
        let ys = span(dest.y, dest.bottom(), self.pixels.height());
        if xs.is_empty() || ys.is_empty() {
            return;
        }
        let (w, h) = (xs.end - xs.start, ys.end - ys.start);
        let scaled = imageops::resize(image.pixels(), w, h, FilterType::Triangle);
        for (dx, dy, src) in scaled.enumerate_pixels() {
            blend(
                self.pixels.get_pixel_mut(xs.start + dx, ys.start + dy),
                Rgba(src.0),
            );
        }
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let xs = span(rect.x, rect.right(), self.pixels.width());
        let ys = span(rect.y, rect.bottom(), self.pixels.height());
        self.blend_span(xs, ys, color);
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, line_width: f64) {
        let lw = line_width.max(0.0).min(rect.width / 2.0).min(rect.height / 2.0);
        if lw <= 0.0 {
            return;
        }
        // Top and bottom bands span the full width; sides fill the gap.
        let top = PixelRect::new(rect.x, rect.y, rect.width, lw);
        let bottom = PixelRect::new(rect.x, rect.bottom() - lw, rect.width, lw);
        let left = PixelRect::new(rect.x, rect.y + lw, lw, rect.height - 2.0 * lw);
        let right = PixelRect::new(rect.right() - lw, rect.y + lw, lw, rect.height - 2.0 * lw);
        for band in [top, bottom, left, right] {
            self.fill_rect(band, color);
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        let xs = span(cx - radius, cx + radius, self.pixels.width());
        let ys = span(cy - radius, cy + radius, self.pixels.height());
        let r2 = radius * radius;
        for y in ys {
            for x in xs.clone() {
                let px = f64::from(x) + 0.5 - cx;
                let py = f64::from(y) + 0.5 - cy;
                if px * px + py * py <= r2 {
                    blend(self.pixels.get_pixel_mut(x, y), color);
                }
            }
        }
    }

    fn snapshot(&self) -> Option<RgbaImage> {
        Some(self.pixels.clone())
    }
}

/// Pixel indices whose centers fall inside `[lo, hi)`, clipped to `[0, max)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(lo: f64, hi: f64, max: u32) -> Range<u32> {
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return 0..0;
    }
    let clip = |v: f64| (v - 0.5).ceil().clamp(0.0, f64::from(max)) as u32;
    let start = clip(lo);
    let end = clip(hi);
    start..end.max(start)
}

/// Source-over composite of `color` onto `dst`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(dst: &mut image::Rgba<u8>, color: Rgba) {
    let [sr, sg, sb, sa] = color.0;
    match sa {
        0 => {}
        255 => dst.0 = color.0,
        _ => {
            let sa = f64::from(sa) / 255.0;
            let da = f64::from(dst.0[3]) / 255.0;
            let out_a = sa + da * (1.0 - sa);
            let mix = |s: u8, d: u8| {
                let v = (f64::from(s) * sa + f64::from(d) * da * (1.0 - sa)) / out_a;
                v.round().clamp(0.0, 255.0) as u8
            };
            dst.0 = [
                mix(sr, dst.0[0]),
                mix(sg, dst.0[1]),
                mix(sb, dst.0[2]),
                (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            ];
        }
    }
}
