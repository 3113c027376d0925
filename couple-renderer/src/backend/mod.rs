//! Drawing-surface backends.

pub mod raster;
pub mod recording;

use couple_core::SurfaceSize;
use serde::{Deserialize, Serialize};

use crate::background::BackgroundImage;
use crate::color::Rgba;
use crate::{BackendType, RenderResult};

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl PixelRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scale normalized bounds onto a surface.
    #[must_use]
    pub fn from_normalized(x1: f64, y1: f64, x2: f64, y2: f64, surface: SurfaceSize) -> Self {
        let w = f64::from(surface.width);
        let h = f64::from(surface.height);
        Self::new(x1 * w, y1 * h, (x2 - x1) * w, (y2 - y1) * h)
    }

    /// Shrink by `amount` on every side, never below zero size.
    #[must_use]
    pub fn inset(self, amount: f64) -> Self {
        let dx = amount.min(self.width / 2.0);
        let dy = amount.min(self.height / 2.0);
        Self::new(
            self.x + dx,
            self.y + dy,
            self.width - 2.0 * dx,
            self.height - 2.0 * dy,
        )
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Trait for drawing surfaces.
///
/// Primitives are deliberately few: the frame renderer composes everything
/// from rectangles, circles and one image blit.
pub trait DrawSurface: Send {
    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Current pixel size.
    fn size(&self) -> SurfaceSize;

    /// Resize the surface. Contents are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is unusable.
    fn resize(&mut self, size: SurfaceSize) -> RenderResult<()>;

    /// Fill the whole surface.
    fn clear(&mut self, color: Rgba);

    /// Draw an image scaled into `dest`.
    fn draw_image(&mut self, image: &BackgroundImage, dest: PixelRect);

    /// Fill a rectangle.
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba);

    /// Stroke a rectangle outline, drawn inward from the rectangle's edge.
    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, line_width: f64);

    /// Fill a circle.
    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba);

    /// Copy of the pixels, for backends that have any.
    fn snapshot(&self) -> Option<image::RgbaImage> {
        None
    }
}

pub(crate) fn check_size(size: SurfaceSize) -> RenderResult<()> {
    if size.width == 0 || size.height == 0 {
        return Err(crate::RenderError::Surface(format!(
            "zero-sized surface {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}
