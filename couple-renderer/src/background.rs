//! Background image loading.
//!
//! Supports raw bytes, files and base64 data URIs
//! (`data:image/png;base64,iVBORw0KGgo...`).

use std::path::Path;

use base64::Engine;
use image::RgbaImage;

use crate::error::{RenderError, RenderResult};

/// A decoded background image.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pixels: RgbaImage,
}

impl BackgroundImage {
    /// Wrap already-decoded pixels.
    #[must_use]
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decode from raw bytes in any supported format.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded.
    pub fn from_bytes(data: &[u8]) -> RenderResult<Self> {
        let format = image::guess_format(data).ok();
        let decoded = image::load_from_memory(data)
            .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;
        let pixels = decoded.to_rgba8();
        tracing::debug!(
            ?format,
            width = pixels.width(),
            height = pixels.height(),
            "Background decoded"
        );
        Ok(Self { pixels })
    }

    /// Decode from a base64 data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is malformed or the image cannot be decoded.
    pub fn from_data_uri(uri: &str) -> RenderResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;
        let (metadata, encoded) = rest
            .split_once(',')
            .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;
        if !metadata.contains(";base64") {
            return Err(RenderError::Resource(
                "Only base64 data URIs are supported".to_string(),
            ));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Decode from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn from_path(path: &Path) -> RenderResult<Self> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&data)
    }

    /// Load from a data URI or a file path, whichever `source` is.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    pub fn load(source: &str) -> RenderResult<Self> {
        if source.starts_with("data:") {
            Self::from_data_uri(source)
        } else {
            Self::from_path(Path::new(source))
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Decoded pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
