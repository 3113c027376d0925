//! # Couple Renderer
//!
//! Draws the region editor's surface and mapping previews.
//!
//! ## Rendering Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            DrawSurface Trait                │
//! ├──────────────────────┬──────────────────────┤
//! │ Recording            │ Raster               │
//! │ (command list, host  │ (RGBA buffer, PNG    │
//! │  paints)             │  export)             │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod background;
pub mod color;
pub mod error;
pub mod frame;
pub mod preview;
pub mod surface;

pub use backend::{DrawSurface, PixelRect};
pub use background::BackgroundImage;
pub use color::Rgba;
pub use error::{RenderError, RenderResult};
pub use frame::{draw_frame, Frame, FrameStyle};

use couple_core::SurfaceSize;

/// Configuration for the renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Backend to draw with.
    pub backend: BackendType,
    /// Longest surface edge in pixels.
    pub max_surface_edge: u32,
    /// Box the surface is displayed in, as `(width, height)`.
    pub display_box: (u32, u32),
    /// Frame colors and line widths.
    pub style: FrameStyle,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Recording,
            max_surface_edge: 1024,
            display_box: (512, 512),
            style: FrameStyle::default(),
        }
    }
}

/// Available drawing backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Records primitives for a host to paint.
    Recording,
    /// Software rasterizer into an RGBA buffer.
    Raster,
}

/// The main renderer interface.
pub struct Renderer {
    config: RendererConfig,
    backend: Box<dyn DrawSurface>,
    frame_count: u64,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_type())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl Renderer {
    /// Create a renderer sized for a target generation resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting surface is unusable.
    pub fn new(config: RendererConfig, resolution: (u32, u32)) -> RenderResult<Self> {
        let size = surface::surface_size(resolution.0, resolution.1, config.max_surface_edge);
        let mut backend = Self::create_backend(config.backend, size);
        backend.resize(size)?;
        tracing::debug!(
            backend = ?config.backend,
            "Renderer created at {}x{}",
            size.width,
            size.height
        );
        Ok(Self {
            config,
            backend,
            frame_count: 0,
        })
    }

    fn create_backend(kind: BackendType, size: SurfaceSize) -> Box<dyn DrawSurface> {
        match kind {
            BackendType::Recording => Box::new(backend::recording::RecordingSurface::new(size)),
            BackendType::Raster => Box::new(backend::raster::RasterSurface::new(size)),
        }
    }

    /// Render a frame.
    pub fn render(&mut self, frame: &Frame<'_>) {
        draw_frame(self.backend.as_mut(), frame, &self.config.style);
        self.frame_count += 1;
    }

    /// Resize the surface for a new target resolution.
    ///
    /// Returns the new surface size, or `None` when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the resize fails.
    pub fn resize_for_resolution(&mut self, width: u32, height: u32) -> RenderResult<Option<SurfaceSize>> {
        let size = surface::surface_size(width, height, self.config.max_surface_edge);
        if size == self.backend.size() {
            return Ok(None);
        }
        self.backend.resize(size)?;
        Ok(Some(size))
    }

    /// Current surface size.
    #[must_use]
    pub fn surface_size(&self) -> SurfaceSize {
        self.backend.size()
    }

    /// Size the surface is displayed at.
    #[must_use]
    pub fn display_size(&self) -> (u32, u32) {
        let (w, h) = self.config.display_box;
        surface::display_size(self.backend.size(), w, h)
    }

    /// Get the current frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the active backend type.
    #[must_use]
    pub fn active_backend(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Pixels of the last frame, if the backend has any.
    #[must_use]
    pub fn snapshot(&self) -> Option<image::RgbaImage> {
        self.backend.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_follows_resolution() {
        let mut renderer = Renderer::new(RendererConfig::default(), (2048, 1024)).expect("renderer");
        assert_eq!(renderer.surface_size(), SurfaceSize::new(1024, 512));
        assert_eq!(renderer.display_size(), (512, 256));

        let resized = renderer.resize_for_resolution(512, 768).expect("resize");
        assert_eq!(resized, Some(SurfaceSize::new(512, 768)));
        assert_eq!(renderer.resize_for_resolution(512, 768).expect("resize"), None);
    }

    #[test]
    fn test_render_counts_frames() {
        let mut renderer = Renderer::new(RendererConfig::default(), (512, 512)).expect("renderer");
        renderer.render(&Frame::regions(&[]));
        renderer.render(&Frame::regions(&[]));
        assert_eq!(renderer.frame_count(), 2);
        assert_eq!(renderer.active_backend(), BackendType::Recording);
        assert!(renderer.snapshot().is_none());
    }

    #[test]
    fn test_raster_backend_snapshots() {
        let config = RendererConfig {
            backend: BackendType::Raster,
            ..RendererConfig::default()
        };
        let mut renderer = Renderer::new(config, (64, 32)).expect("renderer");
        renderer.render(&Frame::regions(&[]));
        let img = renderer.snapshot().expect("pixels");
        assert_eq!(img.dimensions(), (64, 32));
    }
}
