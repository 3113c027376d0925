//! Format adapter between regions and the backend's mapping tuples.
//!
//! A mapping tuple is `[x1, x2, y1, y2, weight]`. The x2-before-y1 order is a
//! fixed contract with the backend.

use serde_json::Value;

use crate::region::{
    clamp_weight, normalize_span, palette_color, round1, round2, Region, RegionId, MIN_SYNC_SIZE,
};

/// One region in backend order: `[x1, x2, y1, y2, weight]`.
pub type MappingTuple = [f64; 5];

/// Fallback mapping used when the mapping text cannot be parsed.
pub const DEFAULT_MAPPING: [MappingTuple; 2] = [[0.0, 0.5, 0.0, 1.0, 1.0], [0.5, 1.0, 0.0, 1.0, 1.0]];

/// A single region covering the whole canvas at neutral weight.
pub const FULL_CANVAS_TUPLE: MappingTuple = [0.0, 1.0, 0.0, 1.0, 1.0];

/// Convert regions to mapping tuples.
///
/// Each region is clamped, un-inverted, widened to the sync minimum size, and
/// rounded (coordinates to 2 decimals, weight to 1).
#[must_use]
pub fn to_mapping(regions: &[Region]) -> Vec<MappingTuple> {
    regions.iter().map(region_to_tuple).collect()
}

/// Convert one region to its mapping tuple.
#[must_use]
pub fn region_to_tuple(region: &Region) -> MappingTuple {
    let (x1, x2) = normalize_span(region.x1, region.x2, MIN_SYNC_SIZE);
    let (y1, y2) = normalize_span(region.y1, region.y2, MIN_SYNC_SIZE);
    [
        round2(x1),
        round2(x2),
        round2(y1),
        round2(y2),
        round1(clamp_weight(region.weight)),
    ]
}

/// Convert mapping tuples to regions.
///
/// Ids are sequential from 1, colors come from the palette, prompts are empty:
/// prompts are never imported from mapping data.
#[must_use]
pub fn from_mapping(tuples: &[MappingTuple]) -> Vec<Region> {
    tuples
        .iter()
        .enumerate()
        .map(|(i, &[x1, x2, y1, y2, weight])| {
            Region {
                id: RegionId::new(i as u64 + 1),
                x1,
                y1,
                x2,
                y2,
                weight,
                prompt: String::new(),
                color: palette_color(i).to_string(),
            }
            .normalized(MIN_SYNC_SIZE)
        })
        .collect()
}

/// Extract well-formed tuples from arbitrary JSON, dropping malformed items.
///
/// Anything that is not an array yields an empty list.
#[must_use]
pub fn tuples_from_value(value: &Value) -> Vec<MappingTuple> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let tuple = tuple_from_value(item);
            if tuple.is_none() {
                tracing::warn!("Dropping malformed mapping tuple: {item}");
            }
            tuple
        })
        .collect()
}

/// Convert arbitrary JSON to regions, dropping malformed tuples.
#[must_use]
pub fn from_mapping_value(value: &Value) -> Vec<Region> {
    from_mapping(&tuples_from_value(value))
}

fn tuple_from_value(item: &Value) -> Option<MappingTuple> {
    let values = item.as_array()?;
    if values.len() != 5 {
        return None;
    }
    let mut tuple = [0.0; 5];
    for (slot, v) in tuple.iter_mut().zip(values) {
        *slot = v.as_f64().filter(|f| f.is_finite())?;
    }
    Some(tuple)
}

/// Check that mapping JSON is a non-empty list of 5-number lists.
#[must_use]
pub fn validate_mapping(value: &Value) -> bool {
    match value.as_array() {
        Some(items) if !items.is_empty() => items.iter().all(|item| tuple_from_value(item).is_some()),
        _ => false,
    }
}

/// Parse the host's mapping text field.
///
/// Blank text means "nothing to apply" and yields `None`. Text that is not
/// valid JSON falls back to [`DEFAULT_MAPPING`].
#[must_use]
pub fn parse_mapping_text(text: &str) -> Option<Vec<MappingTuple>> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Some(tuples_from_value(&value)),
        Err(e) => {
            tracing::error!("Failed to parse mapping text, using default mapping: {e}");
            Some(DEFAULT_MAPPING.to_vec())
        }
    }
}

/// Serialize a mapping for the host's mapping text field.
#[must_use]
pub fn mapping_to_text(mapping: &[MappingTuple]) -> String {
    // Serializing plain f64 arrays cannot fail.
    serde_json::to_string(mapping).unwrap_or_default()
}

/// Whether every tuple is the neutral full-canvas tuple (or there are none).
#[must_use]
pub fn is_default_mapping(mapping: &[MappingTuple]) -> bool {
    mapping
        .iter()
        .all(|t| tuples_equal(t, &FULL_CANVAS_TUPLE))
}

/// Compare tuples at mapping precision.
#[must_use]
pub fn tuples_equal(a: &MappingTuple, b: &MappingTuple) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
}

/// Compare two mappings at mapping precision.
#[must_use]
pub fn mappings_equal(a: &[MappingTuple], b: &[MappingTuple]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| tuples_equal(x, y))
}
