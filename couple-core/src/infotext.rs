//! Mapping lines in generation parameter text.
//!
//! The backend records the mapping in its parameter text as
//! `forge_couple_mapping: [[x1, x2, y1, y2, w], ...]`. Pasting that text back
//! into the host restores the mapping for the tab it was pasted into.

use serde_json::Value;

use crate::mapping::{mapping_to_text, tuples_from_value, MappingTuple};

/// Key of the mapping entry in parameter text.
pub const MAPPING_KEY: &str = "forge_couple_mapping";

/// Find the mapping entry in pasted parameter text.
///
/// Only the first line carrying the key is considered. Trailing text after
/// the JSON array on that line is ignored.
#[must_use]
pub fn extract_mapping(params: &str) -> Option<Vec<MappingTuple>> {
    let prefix = format!("{MAPPING_KEY}:");
    let line = params.lines().find(|line| line.contains(&prefix))?;
    let start = line.find(&prefix)? + prefix.len();
    let rest = line[start..].trim_start();

    match serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
    {
        Some(Ok(value)) => {
            let tuples = tuples_from_value(&value);
            if tuples.is_empty() {
                None
            } else {
                Some(tuples)
            }
        }
        Some(Err(e)) => {
            tracing::warn!("Ignoring unparsable pasted mapping: {e}");
            None
        }
        None => None,
    }
}

/// Render the mapping as a parameter-text entry.
#[must_use]
pub fn format_entry(mapping: &[MappingTuple]) -> String {
    format!("{MAPPING_KEY}: {}", mapping_to_text(mapping))
}
