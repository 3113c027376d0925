//! Editor mode flag and mapping slots.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoupleError;

/// The host's tri-state couple mode. Only `Advanced` enables region sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorMode {
    /// Fixed tiling by prompt count; the editor is inactive.
    Basic,
    /// Free-form regions edited here.
    Advanced,
    /// Painted masks; the editor is inactive.
    Mask,
}

impl EditorMode {
    /// Whether synchronization and request injection are enabled.
    #[must_use]
    pub const fn syncs_regions(self) -> bool {
        matches!(self, Self::Advanced)
    }

    /// Display name used by the host control.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Advanced => "Advanced",
            Self::Mask => "Mask",
        }
    }
}

impl std::fmt::Display for EditorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorMode {
    type Err = CoupleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            "mask" => Ok(Self::Mask),
            other => Err(CoupleError::InvalidOperation(format!("unknown mode: {other}"))),
        }
    }
}

/// Editing context whose mapping lives in its own slot of the mapping store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSlot {
    /// Text-to-image tab.
    Primary,
    /// Image-to-image tab.
    Secondary,
}

impl MappingSlot {
    /// Slot for a host tab name (`txt2img` / `img2img`).
    #[must_use]
    pub fn from_tab(tab: &str) -> Option<Self> {
        match tab {
            "txt2img" | "t2i" => Some(Self::Primary),
            "img2img" | "i2i" => Some(Self::Secondary),
            _ => None,
        }
    }

    /// Short key used in logs and store keys.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Primary => "t2i",
            Self::Secondary => "i2i",
        }
    }
}

impl std::fmt::Display for MappingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Advanced".parse::<EditorMode>().ok(), Some(EditorMode::Advanced));
        assert_eq!(" basic ".parse::<EditorMode>().ok(), Some(EditorMode::Basic));
        assert!("Tiles".parse::<EditorMode>().is_err());
    }

    #[test]
    fn test_only_advanced_syncs() {
        assert!(EditorMode::Advanced.syncs_regions());
        assert!(!EditorMode::Basic.syncs_regions());
        assert!(!EditorMode::Mask.syncs_regions());
    }

    #[test]
    fn test_slots_from_tabs() {
        assert_eq!(MappingSlot::from_tab("txt2img"), Some(MappingSlot::Primary));
        assert_eq!(MappingSlot::from_tab("img2img"), Some(MappingSlot::Secondary));
        assert_eq!(MappingSlot::from_tab("extras"), None);
    }
}
