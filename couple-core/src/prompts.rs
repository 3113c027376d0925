//! Prompt reconciliation - keeps one region per prompt line.

use crate::layout::layout;
use crate::mapping::from_mapping;
use crate::region::RegionDraft;
use crate::store::RegionStore;

/// Separator used when the host does not configure one.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Split a combined prompt into per-region prompts.
///
/// Pieces are trimmed and empty pieces dropped. An empty separator falls back
/// to [`DEFAULT_SEPARATOR`].
#[must_use]
pub fn split_prompts(text: &str, separator: &str) -> Vec<String> {
    let separator = if separator.is_empty() {
        DEFAULT_SEPARATOR
    } else {
        separator
    };
    text.split(separator)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Regions appended for new prompts.
    pub added: usize,
    /// Regions dropped because prompts disappeared.
    pub removed: usize,
    /// Regions whose prompt text changed.
    pub updated: usize,
}

impl Reconciliation {
    /// Whether the region list itself changed shape.
    #[must_use]
    pub const fn structural(&self) -> bool {
        self.added > 0 || self.removed > 0
    }

    /// Whether anything changed at all.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.structural() || self.updated > 0
    }
}

/// Make the region count match `prompts` and assign prompt `i` to region `i`.
///
/// Existing geometry is preserved where the index survives. New regions take
/// the layout cell for their index in `layout(prompts.len())`; surplus regions
/// are dropped from the end. With no prompts at all the regions stay and their
/// prompts are blanked.
pub fn reconcile_prompts(store: &mut RegionStore, prompts: &[String]) -> Reconciliation {
    let mut summary = Reconciliation::default();
    let target = prompts.len();
    let existing = store.len();

    if target > 0 && existing > target {
        store.truncate(target);
        summary.removed = existing - target;
    } else if existing < target {
        let cells = layout(target);
        for &[x1, x2, y1, y2, weight] in cells.iter().skip(existing) {
            store.create(RegionDraft::with_bounds(x1, y1, x2, y2).weight(weight));
            summary.added += 1;
        }
    }

    let ids: Vec<_> = store.list().iter().map(|r| (r.id, r.prompt.clone())).collect();
    for (index, (id, current)) in ids.into_iter().enumerate() {
        let wanted = prompts.get(index).map_or("", String::as_str);
        if current != wanted && store.update(id, |r| r.prompt = wanted.to_string()).is_ok() {
            summary.updated += 1;
        }
    }

    if summary.changed() {
        tracing::debug!(
            added = summary.added,
            removed = summary.removed,
            updated = summary.updated,
            "Prompts reconciled"
        );
    }
    summary
}

/// Throw away the current regions and lay out one fresh region per prompt.
pub fn rebuild_from_prompts(store: &mut RegionStore, prompts: &[String]) {
    let mut regions = from_mapping(&layout(prompts.len()));
    for (region, prompt) in regions.iter_mut().zip(prompts) {
        region.prompt.clone_from(prompt);
    }
    store.replace_all(regions);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_split_trims_and_drops_blank_lines() {
        assert_eq!(
            split_prompts("a cat\n\n  a dog  \n", "\n"),
            prompts(&["a cat", "a dog"])
        );
        assert_eq!(split_prompts("a | b", "|"), prompts(&["a", "b"]));
        assert_eq!(split_prompts("x\ny", ""), prompts(&["x", "y"]));
        assert!(split_prompts("   ", "\n").is_empty());
    }

    #[test]
    fn test_reconcile_from_empty_uses_layout() {
        let mut store = RegionStore::new();
        let summary = reconcile_prompts(&mut store, &prompts(&["a", "b", "c"]));
        assert_eq!(summary.added, 3);
        let xs: Vec<(f64, f64)> = store.list().iter().map(|r| (r.x1, r.x2)).collect();
        assert_eq!(xs, vec![(0.0, 0.33), (0.33, 0.67), (0.67, 1.0)]);
        assert_eq!(store.list()[2].prompt, "c");
    }

    #[test]
    fn test_reconcile_extend_keeps_existing_geometry() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::with_bounds(0.1, 0.1, 0.4, 0.4));
        let summary = reconcile_prompts(&mut store, &prompts(&["a", "b"]));
        assert_eq!(summary.added, 1);
        assert!((store.list()[0].x1 - 0.1).abs() < f64::EPSILON);
        // New index 1 takes cell 1 of layout(2), the right half
        assert!((store.list()[1].x1 - 0.5).abs() < f64::EPSILON);
        assert!((store.list()[1].x2 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reconcile_shrink_truncates_tail() {
        let mut store = RegionStore::new();
        reconcile_prompts(&mut store, &prompts(&["a", "b", "c", "d"]));
        let summary = reconcile_prompts(&mut store, &prompts(&["a", "b"]));
        assert_eq!(summary.removed, 2);
        assert_eq!(store.len(), 2);
        assert!((store.list()[1].x1 - 0.5).abs() < f64::EPSILON);
        assert!((store.list()[1].y2 - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reconcile_updates_text_only() {
        let mut store = RegionStore::new();
        reconcile_prompts(&mut store, &prompts(&["a", "b"]));
        let summary = reconcile_prompts(&mut store, &prompts(&["a", "z"]));
        assert!(!summary.structural());
        assert_eq!(summary.updated, 1);
        assert_eq!(store.list()[1].prompt, "z");

        assert!(!reconcile_prompts(&mut store, &prompts(&["a", "z"])).changed());
    }

    #[test]
    fn test_reconcile_no_prompts_blanks_text() {
        let mut store = RegionStore::new();
        reconcile_prompts(&mut store, &prompts(&["a", "b"]));
        let summary = reconcile_prompts(&mut store, &[]);
        assert_eq!(store.len(), 2);
        assert_eq!(summary.updated, 2);
        assert!(store.list().iter().all(|r| r.prompt.is_empty()));
    }

    #[test]
    fn test_rebuild_from_prompts() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::with_bounds(0.1, 0.1, 0.2, 0.2));
        rebuild_from_prompts(&mut store, &prompts(&["a", "b", "c", "d"]));
        assert_eq!(store.len(), 4);
        assert!((store.list()[3].x1 - 0.5).abs() < f64::EPSILON);
        assert_eq!(store.list()[3].prompt, "d");
    }
}
