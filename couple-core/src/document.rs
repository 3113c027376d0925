//! Editor document - the JSON export/import format.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "mode": "Advanced",
//!   "regions": [{ "id": 1, "x1": 0.0, "y1": 0.0, "x2": 0.5, "y2": 1.0,
//!                 "weight": 1.0, "prompt": "a cat", "color": "#ff0000" }],
//!   "timestamp": 1760000000000
//! }
//! ```
//!
//! Import only requires `regions`. Items that do not deserialize are dropped,
//! prompts are reset (prompts come from the prompt source), and colors are
//! kept.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::EditorMode;
use crate::region::{palette_color, Region, RegionId, DEFAULT_WEIGHT};
use crate::store::RegionStore;
use crate::CoupleResult;

/// Current document format version.
pub const DOCUMENT_VERSION: &str = "1.0";

/// A full export of the editor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorDocument {
    /// Format version.
    pub version: String,
    /// Host mode at export time.
    pub mode: EditorMode,
    /// Regions in display order.
    pub regions: Vec<Region>,
    /// Export time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl EditorDocument {
    /// Snapshot the store.
    #[must_use]
    pub fn from_store(store: &RegionStore, mode: EditorMode) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            mode,
            regions: store.list().to_vec(),
            timestamp: current_timestamp_ms(),
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoupleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested download name, e.g. `couple_regions_1760000000000.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("couple_regions_{}.json", self.timestamp)
    }

    /// Write the document into `dir` under [`Self::file_name`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), regions = self.regions.len(), "Regions exported");
        Ok(path)
    }
}

#[derive(Deserialize)]
struct ImportedRegion {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    color: Option<String>,
}

const fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

/// Parse regions out of an import payload.
///
/// Returns `None` when the text is not JSON or has no `regions` array; the
/// caller should leave its state untouched. Malformed region items are skipped.
#[must_use]
pub fn parse_import(json: &str) -> Option<Vec<Region>> {
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to parse import: {e}");
            return None;
        }
    };
    let items = value.get("regions")?.as_array()?;

    let regions = items
        .iter()
        .filter_map(|item| match ImportedRegion::deserialize(item) {
            Ok(r) if [r.x1, r.y1, r.x2, r.y2, r.weight].iter().all(|v| v.is_finite()) => Some(r),
            Ok(_) | Err(_) => {
                tracing::warn!("Skipping malformed imported region: {item}");
                None
            }
        })
        .enumerate()
        .map(|(i, r)| Region {
            id: RegionId::new(i as u64 + 1),
            x1: r.x1,
            y1: r.y1,
            x2: r.x2,
            y2: r.y2,
            weight: r.weight,
            prompt: String::new(),
            color: r.color.unwrap_or_else(|| palette_color(i).to_string()),
        })
        .collect();
    Some(regions)
}

/// Replace the store contents with an import payload.
///
/// Returns the number of imported regions, or `None` if the payload was
/// rejected and the store left unchanged.
pub fn import_into(store: &mut RegionStore, json: &str) -> Option<usize> {
    let regions = parse_import(json)?;
    let count = regions.len();
    store.replace_all(regions);
    tracing::info!(count, "Regions imported");
    Some(count)
}

/// Read an import payload from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read. Invalid content is not an
/// error; see [`import_into`].
pub fn import_file(store: &mut RegionStore, path: &Path) -> std::io::Result<Option<usize>> {
    let json = std::fs::read_to_string(path)?;
    Ok(import_into(store, &json))
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionDraft;

    #[test]
    fn test_export_shape() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::with_bounds(0.0, 0.0, 0.5, 1.0).prompt("a cat"));
        let doc = EditorDocument::from_store(&store, EditorMode::Advanced);
        let value: Value = serde_json::from_str(&doc.to_json().expect("json")).expect("parse");

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["mode"], "Advanced");
        assert_eq!(value["regions"][0]["prompt"], "a cat");
        assert_eq!(value["regions"][0]["color"], "#ff0000");
        assert!(value["timestamp"].as_u64().is_some());
    }

    #[test]
    fn test_import_resets_prompts_and_keeps_colors() {
        let json = r##"{"regions": [
            {"x1": 0.1, "y1": 0.2, "x2": 0.6, "y2": 0.9, "weight": 2.0,
             "prompt": "ignored", "color": "#123456"},
            {"x1": 0.5, "y1": 0.0, "x2": 1.0, "y2": 1.0}
        ]}"##;
        let regions = parse_import(json).expect("imported");
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].color, "#123456");
        assert!(regions[0].prompt.is_empty());
        assert!((regions[1].weight - 1.0).abs() < f64::EPSILON);
        assert_eq!(regions[1].id, RegionId::new(2));
    }

    #[test]
    fn test_import_drops_malformed_items() {
        let json = r#"{"regions": [{"x1": "left"}, {"x1": 0.0, "y1": 0.0, "x2": 1.0, "y2": 1.0}, 7]}"#;
        let regions = parse_import(json).expect("imported");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, RegionId::new(1));
    }

    #[test]
    fn test_unparsable_import_is_noop() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::default());
        assert_eq!(import_into(&mut store, "{not json"), None);
        assert_eq!(import_into(&mut store, r#"{"mode": "Basic"}"#), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_import_normalizes_into_store() {
        let mut store = RegionStore::new();
        let json = r#"{"regions": [{"x1": 1.4, "y1": 0.5, "x2": 0.2, "y2": 0.5, "weight": 9}]}"#;
        assert_eq!(import_into(&mut store, json), Some(1));
        let region = &store.list()[0];
        assert!((region.x2 - 1.0).abs() < f64::EPSILON);
        assert!((region.x1 - 0.2).abs() < f64::EPSILON);
        assert!((region.weight - 5.0).abs() < f64::EPSILON);
        assert!(region.height() >= 0.01 - 1e-9);
    }
}
