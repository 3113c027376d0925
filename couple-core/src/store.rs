//! The region store - canonical list of regions plus selection state.
//!
//! Every mutating operation restores the region invariants before it returns
//! and then notifies subscribers with a [`RegionChange`]. A subscriber that
//! fails (or panics) is logged and skipped; the others are still notified.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::region::{palette_color, Region, RegionDraft, RegionId, DEFAULT_WEIGHT, MIN_SYNC_SIZE};
use crate::{CoupleError, CoupleResult};

/// Bounds of the first region in an empty store.
const FULL_CANVAS: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);

/// Bounds of every later region created without explicit coordinates.
const CENTERED_BOX: (f64, f64, f64, f64) = (0.3, 0.3, 0.6, 0.6);

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionChange {
    /// A region was added.
    Created(RegionId),
    /// A region's geometry, weight or prompt changed.
    Updated(RegionId),
    /// A region was removed.
    Deleted(RegionId),
    /// All regions were removed.
    Cleared,
    /// The whole list was replaced (import, layout reset) or renumbered.
    Replaced,
    /// The selection changed.
    SelectionChanged(Option<RegionId>),
}

impl RegionChange {
    /// Whether the change alters what the mapping would contain.
    #[must_use]
    pub const fn affects_mapping(&self) -> bool {
        !matches!(self, Self::SelectionChanged(_))
    }
}

/// Result returned by a store subscriber.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Listener = Box<dyn FnMut(&RegionChange) -> ListenerResult + Send>;

/// Handle used to remove a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Canonical in-memory list of regions.
pub struct RegionStore {
    regions: Vec<Region>,
    selected: Option<RegionId>,
    next_id: u64,
    palette_cursor: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for RegionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionStore")
            .field("regions", &self.regions)
            .field("selected", &self.selected)
            .field("next_id", &self.next_id)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for RegionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            selected: None,
            next_id: 1,
            palette_cursor: 0,
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// All regions in display order.
    #[must_use]
    pub fn list(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if the store holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Get a region by id.
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Position of a region in display order.
    #[must_use]
    pub fn index_of(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|r| r.id == id)
    }

    /// Currently selected region id.
    #[must_use]
    pub const fn selected(&self) -> Option<RegionId> {
        self.selected
    }

    /// Currently selected region.
    #[must_use]
    pub fn selected_region(&self) -> Option<&Region> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Append a region built from the draft.
    ///
    /// Without explicit bounds, the first region of an empty store covers the
    /// whole canvas and later ones get a centered box.
    pub fn create(&mut self, draft: RegionDraft) -> Region {
        let index = self.regions.len();
        self.insert_at(index, draft)
    }

    /// Insert a region built from the draft at the given display position.
    ///
    /// Positions past the end append.
    pub fn insert_at(&mut self, index: usize, draft: RegionDraft) -> Region {
        let region = self.build(draft);
        let index = index.min(self.regions.len());
        self.regions.insert(index, region.clone());
        tracing::debug!(id = %region.id, index, "Region created");
        self.notify(&RegionChange::Created(region.id));
        region
    }

    /// Remove a region. Clears the selection if it pointed at this region.
    ///
    /// # Errors
    ///
    /// Returns [`CoupleError::RegionNotFound`] if the region does not exist.
    pub fn delete(&mut self, id: RegionId) -> CoupleResult<Region> {
        let index = self
            .index_of(id)
            .ok_or(CoupleError::RegionNotFound(id.get()))?;
        let region = self.regions.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::debug!(id = %id, "Region deleted");
        self.notify(&RegionChange::Deleted(id));
        Ok(region)
    }

    /// Remove every region and reset the palette cursor.
    pub fn clear_all(&mut self) {
        self.regions.clear();
        self.selected = None;
        self.palette_cursor = 0;
        self.notify(&RegionChange::Cleared);
    }

    /// Drop trailing regions so at most `len` remain.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.regions.len() {
            return;
        }
        self.regions.truncate(len);
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
        self.notify(&RegionChange::Replaced);
    }

    /// Select a region, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoupleError::RegionNotFound`] if the region does not exist.
    pub fn select(&mut self, id: Option<RegionId>) -> CoupleResult<()> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(CoupleError::RegionNotFound(id.get()));
            }
        }
        if self.selected != id {
            self.selected = id;
            self.notify(&RegionChange::SelectionChanged(id));
        }
        Ok(())
    }

    /// Mutate a region and re-normalize it with the sync-time minimum size.
    ///
    /// # Errors
    ///
    /// Returns [`CoupleError::RegionNotFound`] if the region does not exist.
    pub fn update<F>(&mut self, id: RegionId, f: F) -> CoupleResult<&Region>
    where
        F: FnOnce(&mut Region),
    {
        self.update_with_min(id, MIN_SYNC_SIZE, f)
    }

    /// Mutate a region and re-normalize it with the given minimum size.
    ///
    /// The id and color are restored after the closure runs; they are fixed
    /// for the region's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`CoupleError::RegionNotFound`] if the region does not exist.
    pub fn update_with_min<F>(&mut self, id: RegionId, min_size: f64, f: F) -> CoupleResult<&Region>
    where
        F: FnOnce(&mut Region),
    {
        let index = self
            .index_of(id)
            .ok_or(CoupleError::RegionNotFound(id.get()))?;
        let region = &mut self.regions[index];
        let color = region.color.clone();
        f(region);
        region.id = id;
        region.color = color;
        region.normalize(min_size);
        self.notify(&RegionChange::Updated(id));
        Ok(&self.regions[index])
    }

    /// Replace the whole list, e.g. after an import or a layout reset.
    ///
    /// Regions are normalized, keep their colors, and get fresh sequential ids.
    pub fn replace_all(&mut self, regions: Vec<Region>) {
        self.regions = regions
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = RegionId::new(i as u64 + 1);
                r.normalized(MIN_SYNC_SIZE)
            })
            .collect();
        self.next_id = self.regions.len() as u64 + 1;
        self.palette_cursor = self.regions.len();
        self.selected = None;
        tracing::debug!(count = self.regions.len(), "Regions replaced");
        self.notify(&RegionChange::Replaced);
    }

    /// Reassign ids `1..=n` in display order, carrying the selection along.
    pub fn renumber(&mut self) {
        let selected_index = self.selected.and_then(|id| self.index_of(id));
        for (i, region) in self.regions.iter_mut().enumerate() {
            region.id = RegionId::new(i as u64 + 1);
        }
        self.next_id = self.regions.len() as u64 + 1;
        self.selected = selected_index.map(|i| self.regions[i].id);
        self.notify(&RegionChange::Replaced);
    }

    /// Register a subscriber that is called after every mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&RegionChange) -> ListenerResult + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        before != self.listeners.len()
    }

    fn build(&mut self, draft: RegionDraft) -> Region {
        let (x1, y1, x2, y2) = draft.bounds.unwrap_or(if self.regions.is_empty() {
            FULL_CANVAS
        } else {
            CENTERED_BOX
        });
        let color = draft
            .color
            .unwrap_or_else(|| palette_color(self.palette_cursor).to_string());
        self.palette_cursor += 1;
        let id = RegionId::new(self.next_id);
        self.next_id += 1;
        Region {
            id,
            x1,
            y1,
            x2,
            y2,
            weight: draft.weight.unwrap_or(DEFAULT_WEIGHT),
            prompt: draft.prompt.unwrap_or_default(),
            color,
        }
        .normalized(MIN_SYNC_SIZE)
    }

    fn notify(&mut self, change: &RegionChange) {
        for (id, listener) in &mut self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscription = id.0, error = %e, "Region subscriber failed");
                }
                Err(_) => {
                    tracing::warn!(subscription = id.0, "Region subscriber panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::region::{MIN_SYNC_SIZE, PALETTE};

    #[test]
    fn test_first_region_covers_canvas_then_centered() {
        let mut store = RegionStore::new();
        let first = store.create(RegionDraft::default());
        assert!(first.x1.abs() < f64::EPSILON && (first.x2 - 1.0).abs() < f64::EPSILON);
        assert!(first.y1.abs() < f64::EPSILON && (first.y2 - 1.0).abs() < f64::EPSILON);

        let second = store.create(RegionDraft::default());
        assert!((second.x1 - 0.3).abs() < f64::EPSILON);
        assert!((second.y2 - 0.6).abs() < f64::EPSILON);
        assert_eq!(second.id.get(), first.id.get() + 1);
    }

    #[test]
    fn test_colors_round_robin() {
        let mut store = RegionStore::new();
        let colors: Vec<_> = (0..8)
            .map(|_| store.create(RegionDraft::default()).color)
            .collect();
        assert_eq!(colors[0], PALETTE[0]);
        assert_eq!(colors[6], PALETTE[6]);
        assert_eq!(colors[7], PALETTE[0]);
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let mut store = RegionStore::new();
        let r = store.create(RegionDraft::default());
        store.select(Some(r.id)).expect("should select");
        store.delete(r.id).expect("should delete");
        assert!(store.selected().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_fails() {
        let mut store = RegionStore::new();
        let result = store.delete(RegionId::new(42));
        assert!(matches!(result, Err(CoupleError::RegionNotFound(42))));
    }

    #[test]
    fn test_select_missing_fails() {
        let mut store = RegionStore::new();
        assert!(store.select(Some(RegionId::new(3))).is_err());
        assert!(store.select(None).is_ok());
    }

    #[test]
    fn test_update_renormalizes_and_keeps_color() {
        let mut store = RegionStore::new();
        let r = store.create(RegionDraft::default());
        let updated = store
            .update(r.id, |region| {
                region.x1 = 0.9;
                region.x2 = 0.1;
                region.weight = 100.0;
                region.color = "#000000".to_string();
            })
            .expect("should update")
            .clone();
        assert!(updated.is_valid(MIN_SYNC_SIZE));
        assert!((updated.x1 - 0.1).abs() < f64::EPSILON);
        assert_eq!(updated.color, r.color);
    }

    #[test]
    fn test_clear_all_resets_palette() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::default());
        store.create(RegionDraft::default());
        store.clear_all();
        assert!(store.is_empty());
        let r = store.create(RegionDraft::default());
        assert_eq!(r.color, PALETTE[0]);
        assert!((r.x2 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_renumber_keeps_selection() {
        let mut store = RegionStore::new();
        let a = store.create(RegionDraft::default());
        let b = store.create(RegionDraft::default());
        store.delete(a.id).expect("delete");
        store.select(Some(b.id)).expect("select");
        store.renumber();
        assert_eq!(store.list()[0].id, RegionId::new(1));
        assert_eq!(store.selected(), Some(RegionId::new(1)));
        let c = store.create(RegionDraft::default());
        assert_eq!(c.id, RegionId::new(2));
    }

    #[test]
    fn test_insert_at_position() {
        let mut store = RegionStore::new();
        let a = store.create(RegionDraft::default());
        let b = store.insert_at(0, RegionDraft::with_bounds(0.1, 0.1, 0.2, 0.2));
        assert_eq!(store.list()[0].id, b.id);
        assert_eq!(store.list()[1].id, a.id);
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let mut store = RegionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        store.subscribe(|_| Err("boom".into()));
        store.subscribe(|_| panic!("subscriber panic"));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        store.create(RegionDraft::default());
        store.clear_all();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = RegionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(store.unsubscribe(sub));
        store.create(RegionDraft::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!store.unsubscribe(sub));
    }
}
