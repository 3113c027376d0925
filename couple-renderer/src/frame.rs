//! Frame rendering for the drawing surface.
//!
//! Draw order, back to front:
//!
//! 1. clear
//! 2. background image, letterboxed
//! 3. faint grid
//! 4. non-selected regions (translucent fill + colored border)
//! 5. the selected region (thicker border + inset secondary border)
//! 6. its eight handles
//! 7. rubber band of an in-progress create drag

use couple_core::interaction::Handle;
use couple_core::{InteractionMachine, Region, RegionId, RegionStore, SurfaceSize};

use crate::background::BackgroundImage;
use crate::backend::{DrawSurface, PixelRect};
use crate::color::{region_color, Rgba};
use crate::surface::letterbox;

/// Colors and line widths of a frame.
#[derive(Debug, Clone)]
pub struct FrameStyle {
    /// Surface clear color.
    pub clear_color: Rgba,
    /// Grid line color.
    pub grid_color: Rgba,
    /// Grid cells per axis (0 disables the grid).
    pub grid_divisions: u32,
    /// Alpha of region fills.
    pub fill_alpha: u8,
    /// Border width of non-selected regions.
    pub border_width: f64,
    /// Border width of the selected region.
    pub selected_border_width: f64,
    /// Inset border of the selected region.
    pub inset_color: Rgba,
    /// Visual handle radius in pixels.
    pub handle_radius: f64,
    /// Handle fill.
    pub handle_fill: Rgba,
    /// Rubber band outline.
    pub rubber_band_color: Rgba,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            clear_color: Rgba::new(32, 32, 32, 255),
            grid_color: Rgba::new(255, 255, 255, 24),
            grid_divisions: 8,
            fill_alpha: 51,
            border_width: 2.0,
            selected_border_width: 4.0,
            inset_color: Rgba::new(255, 255, 255, 200),
            handle_radius: 6.0,
            handle_fill: Rgba::WHITE,
            rubber_band_color: Rgba::new(255, 255, 255, 220),
        }
    }
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Regions in display order.
    pub regions: &'a [Region],
    /// Selected region, drawn last with handles.
    pub selected: Option<RegionId>,
    /// Normalized `(x1, y1, x2, y2)` of an in-progress create drag.
    pub rubber_band: Option<(f64, f64, f64, f64)>,
    /// Optional background image.
    pub background: Option<&'a BackgroundImage>,
}

impl<'a> Frame<'a> {
    /// Frame showing the store and the machine's current gesture.
    #[must_use]
    pub fn new(store: &'a RegionStore, machine: &InteractionMachine) -> Self {
        Self {
            regions: store.list(),
            selected: store.selected(),
            rubber_band: machine.rubber_band(),
            background: None,
        }
    }

    /// Frame of bare regions with nothing selected.
    #[must_use]
    pub fn regions(regions: &'a [Region]) -> Self {
        Self {
            regions,
            selected: None,
            rubber_band: None,
            background: None,
        }
    }

    /// Draw regions from `regions` instead, e.g. with live table edits overlaid.
    #[must_use]
    pub fn with_regions(mut self, regions: &'a [Region]) -> Self {
        self.regions = regions;
        self
    }

    /// Add a background image.
    #[must_use]
    pub fn with_background(mut self, background: Option<&'a BackgroundImage>) -> Self {
        self.background = background;
        self
    }
}

/// Draw a frame onto a surface.
pub fn draw_frame(surface: &mut dyn DrawSurface, frame: &Frame<'_>, style: &FrameStyle) {
    let size = surface.size();
    surface.clear(style.clear_color);

    if let Some(bg) = frame.background {
        surface.draw_image(bg, letterbox(bg.width(), bg.height(), size));
    }

    draw_grid(surface, size, style);

    let mut selected = None;
    for region in frame.regions {
        if Some(region.id) == frame.selected {
            selected = Some(region);
            continue;
        }
        let rect = region_rect(region, size);
        let color = region_color(&region.color);
        surface.fill_rect(rect, color.with_alpha(style.fill_alpha));
        surface.stroke_rect(rect, color, style.border_width);
    }

    if let Some(region) = selected {
        draw_selected(surface, region, size, style);
    }

    if let Some((x1, y1, x2, y2)) = frame.rubber_band {
        let rect = PixelRect::from_normalized(x1, y1, x2, y2, size);
        surface.stroke_rect(rect, style.rubber_band_color, style.border_width);
    }

    tracing::trace!(
        regions = frame.regions.len(),
        selected = ?frame.selected,
        "Frame drawn at {}x{}",
        size.width,
        size.height
    );
}

fn draw_grid(surface: &mut dyn DrawSurface, size: SurfaceSize, style: &FrameStyle) {
    if style.grid_divisions < 2 {
        return;
    }
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let n = f64::from(style.grid_divisions);
    for i in 1..style.grid_divisions {
        let t = f64::from(i) / n;
        surface.fill_rect(PixelRect::new((t * w).floor(), 0.0, 1.0, h), style.grid_color);
        surface.fill_rect(PixelRect::new(0.0, (t * h).floor(), w, 1.0), style.grid_color);
    }
}

fn draw_selected(surface: &mut dyn DrawSurface, region: &Region, size: SurfaceSize, style: &FrameStyle) {
    let rect = region_rect(region, size);
    let color = region_color(&region.color);
    surface.fill_rect(rect, color.with_alpha(style.fill_alpha.saturating_mul(2)));
    surface.stroke_rect(rect, color, style.selected_border_width);
    surface.stroke_rect(
        rect.inset(style.selected_border_width),
        style.inset_color,
        1.0,
    );
    for handle in Handle::ALL {
        let (hx, hy) = handle.position(region);
        let cx = hx * f64::from(size.width);
        let cy = hy * f64::from(size.height);
        surface.fill_circle(cx, cy, style.handle_radius + 1.0, color);
        surface.fill_circle(cx, cy, style.handle_radius, style.handle_fill);
    }
}

fn region_rect(region: &Region, size: SurfaceSize) -> PixelRect {
    PixelRect::from_normalized(region.x1, region.y1, region.x2, region.y2, size)
}
