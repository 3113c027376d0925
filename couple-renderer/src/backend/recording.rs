//! Recording backend.
//!
//! Keeps the primitives of the last frame as a command list instead of
//! pixels. Used headless, in tests, and to hand frames to a host that does
//! its own painting.

use couple_core::SurfaceSize;
use serde::Serialize;

use crate::background::BackgroundImage;
use crate::color::Rgba;
use crate::{BackendType, RenderResult};

use super::{check_size, DrawSurface, PixelRect};

/// One recorded drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Surface cleared.
    Clear {
        /// Fill color.
        color: Rgba,
    },
    /// Image drawn into a destination rectangle.
    Image {
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
        /// Destination on the surface.
        dest: PixelRect,
    },
    /// Filled rectangle.
    FillRect {
        /// Rectangle.
        rect: PixelRect,
        /// Fill color.
        color: Rgba,
    },
    /// Rectangle outline.
    StrokeRect {
        /// Rectangle.
        rect: PixelRect,
        /// Stroke color.
        color: Rgba,
        /// Stroke width in pixels.
        line_width: f64,
    },
    /// Filled circle.
    FillCircle {
        /// Center x.
        cx: f64,
        /// Center y.
        cy: f64,
        /// Radius.
        radius: f64,
        /// Fill color.
        color: Rgba,
    },
}

/// Surface that records commands.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: SurfaceSize,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    /// Create a recording surface.
    #[must_use]
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    /// Commands since the last clear.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the list empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded commands as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string(&self.commands)?)
    }

    fn push(&mut self, command: DrawCommand) {
        tracing::trace!(?command, "Record");
        self.commands.push(command);
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new(SurfaceSize::default())
    }
}

impl DrawSurface for RecordingSurface {
    fn backend_type(&self) -> BackendType {
        BackendType::Recording
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) -> RenderResult<()> {
        check_size(size)?;
        self.size = size;
        self.commands.clear();
        tracing::debug!("Recording surface resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn clear(&mut self, color: Rgba) {
        // A clear starts a new frame.
        self.commands.clear();
        self.push(DrawCommand::Clear { color });
    }

    fn draw_image(&mut self, image: &BackgroundImage, dest: PixelRect) {
        self.push(DrawCommand::Image {
            width: image.width(),
            height: image.height(),
            dest,
        });
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, line_width: f64) {
        self.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        self.push(DrawCommand::FillCircle {
            cx,
            cy,
            radius,
            color,
        });
    }
}
