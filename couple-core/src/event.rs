//! Pointer input for the drawing surface.

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved (with or without a button held).
    Move,
    /// Button released.
    Up,
    /// Pointer left the surface.
    Leave,
}

impl PointerPhase {
    /// Parse a host phase name, defaulting unknown names to `Move`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "down" | "start" | "pointerdown" | "mousedown" => Self::Down,
            "up" | "end" | "pointerup" | "mouseup" => Self::Up,
            "leave" | "cancel" | "pointerleave" | "mouseleave" => Self::Leave,
            _ => Self::Move,
        }
    }
}

/// A pointer event in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in surface pixels.
    pub x: f64,
    /// Y position in surface pixels.
    pub y: f64,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self { phase, x, y }
    }

    /// Pointer pressed at `(x, y)`.
    #[must_use]
    pub const fn down(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    /// Pointer moved to `(x, y)`.
    #[must_use]
    pub const fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    /// Pointer released at `(x, y)`.
    #[must_use]
    pub const fn up(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }

    /// Pointer left the surface at `(x, y)`.
    #[must_use]
    pub const fn leave(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Leave, x, y)
    }

    /// Position normalized against the surface size, clamped to `[0, 1]`.
    #[must_use]
    pub fn normalized(&self, surface: SurfaceSize) -> (f64, f64) {
        let w = f64::from(surface.width.max(1));
        let h = f64::from(surface.height.max(1));
        ((self.x / w).clamp(0.0, 1.0), (self.y / h).clamp(0.0, 1.0))
    }
}

/// Pixel dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Create a surface size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(512, 512)
    }
}
