//! Pointer interaction state machine.
//!
//! Turns raw pointer events into create, move and resize operations on the
//! region store. Manipulation only ever targets the already-selected region;
//! overlapping regions are disambiguated through the table selection, never
//! by hit-testing unselected regions.
//!
//! ```text
//!            down on handle of selected
//!   Idle ─────────────────────────────────▶ Resizing(handle)
//!    │  ─── down inside selected ─────────▶ Moving
//!    │  ─── down, nothing selected ───────▶ Creating
//!    ◀──────── up / leave ──────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::event::{PointerEvent, PointerPhase, SurfaceSize};
use crate::region::{Region, RegionDraft, RegionId, MIN_DRAG_SIZE, MIN_SYNC_SIZE};
use crate::store::RegionStore;

/// Pointer hit radius for resize handles, in surface pixels.
pub const HANDLE_HIT_RADIUS_PX: f64 = 16.0;

/// One of the eight resize handles of the selected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    /// Top-left corner.
    NorthWest,
    /// Top edge midpoint.
    North,
    /// Top-right corner.
    NorthEast,
    /// Right edge midpoint.
    East,
    /// Bottom-right corner.
    SouthEast,
    /// Bottom edge midpoint.
    South,
    /// Bottom-left corner.
    SouthWest,
    /// Left edge midpoint.
    West,
}

impl Handle {
    /// All handles, corners first so they win hit-tests against edges.
    pub const ALL: [Self; 8] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthEast,
        Self::SouthWest,
        Self::North,
        Self::East,
        Self::South,
        Self::West,
    ];

    /// Short name, as used in drag type labels (`resize-nw`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NorthWest => "nw",
            Self::North => "n",
            Self::NorthEast => "ne",
            Self::East => "e",
            Self::SouthEast => "se",
            Self::South => "s",
            Self::SouthWest => "sw",
            Self::West => "w",
        }
    }

    /// CSS cursor shown while hovering this handle.
    #[must_use]
    pub const fn cursor(self) -> &'static str {
        match self {
            Self::NorthWest | Self::SouthEast => "nwse-resize",
            Self::NorthEast | Self::SouthWest => "nesw-resize",
            Self::North | Self::South => "ns-resize",
            Self::East | Self::West => "ew-resize",
        }
    }

    /// Normalized position of this handle on a region.
    #[must_use]
    pub fn position(self, region: &Region) -> (f64, f64) {
        let cx = (region.x1 + region.x2) / 2.0;
        let cy = (region.y1 + region.y2) / 2.0;
        match self {
            Self::NorthWest => (region.x1, region.y1),
            Self::North => (cx, region.y1),
            Self::NorthEast => (region.x2, region.y1),
            Self::East => (region.x2, cy),
            Self::SouthEast => (region.x2, region.y2),
            Self::South => (cx, region.y2),
            Self::SouthWest => (region.x1, region.y2),
            Self::West => (region.x1, cy),
        }
    }

    const fn moves_left(self) -> bool {
        matches!(self, Self::NorthWest | Self::West | Self::SouthWest)
    }

    const fn moves_right(self) -> bool {
        matches!(self, Self::NorthEast | Self::East | Self::SouthEast)
    }

    const fn moves_top(self) -> bool {
        matches!(self, Self::NorthWest | Self::North | Self::NorthEast)
    }

    const fn moves_bottom(self) -> bool {
        matches!(self, Self::SouthWest | Self::South | Self::SouthEast)
    }

    /// Apply a normalized pointer delta to a snapshot, moving only the bounds
    /// this handle owns. The opposite corner or edge stays fixed.
    #[must_use]
    pub fn apply(self, initial: &Region, dx: f64, dy: f64) -> Region {
        let mut region = initial.clone();
        if self.moves_left() {
            region.x1 = initial.x1 + dx;
        }
        if self.moves_right() {
            region.x2 = initial.x2 + dx;
        }
        if self.moves_top() {
            region.y1 = initial.y1 + dy;
        }
        if self.moves_bottom() {
            region.y2 = initial.y2 + dy;
        }
        region
    }
}

/// Find the handle of `region` under a pixel position, if any.
#[must_use]
pub fn handle_at(
    region: &Region,
    x_px: f64,
    y_px: f64,
    surface: SurfaceSize,
    radius_px: f64,
) -> Option<Handle> {
    let w = f64::from(surface.width);
    let h = f64::from(surface.height);
    Handle::ALL.into_iter().find(|handle| {
        let (hx, hy) = handle.position(region);
        let dx = hx * w - x_px;
        let dy = hy * h - y_px;
        dx.hypot(dy) <= radius_px
    })
}

/// Kind of drag in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "handle", rename_all = "lowercase")]
pub enum DragType {
    /// Translating the selected region.
    Move,
    /// Rubber-banding a new region.
    Create,
    /// Dragging one handle of the selected region.
    Resize(Handle),
}

impl std::fmt::Display for DragType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => f.write_str("move"),
            Self::Create => f.write_str("create"),
            Self::Resize(handle) => write!(f, "resize-{}", handle.name()),
        }
    }
}

/// Transient state of one pointer-down-to-up gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    /// What the gesture does.
    pub drag_type: DragType,
    /// Normalized X where the gesture started.
    pub start_x: f64,
    /// Normalized Y where the gesture started.
    pub start_y: f64,
    /// Latest normalized X.
    pub current_x: f64,
    /// Latest normalized Y.
    pub current_y: f64,
    /// Snapshot of the manipulated region (absent while creating).
    pub initial_region: Option<Region>,
}

/// Observable state of the interaction machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// No gesture in progress.
    Idle,
    /// Drawing a new region.
    Creating,
    /// Moving the selected region.
    Moving,
    /// Resizing the selected region by a handle.
    Resizing(Handle),
}

/// Result of feeding one pointer event to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    /// Nothing changed.
    None,
    /// A gesture started; the store is untouched so far.
    DragStarted(DragType),
    /// The selection was cleared by pressing outside the selected region.
    SelectionCleared,
    /// The rubber-band rectangle changed.
    CreatePreview,
    /// The selected region moved.
    Moved(RegionId),
    /// The selected region was resized.
    Resized(RegionId),
    /// A new region was created and selected.
    Created(RegionId),
    /// A create drag ended below the minimum size and was dropped.
    CreateDiscarded,
    /// A move or resize gesture ended.
    DragEnded,
}

impl InteractionOutcome {
    /// Whether the region store changed in a way the mapping must reflect.
    #[must_use]
    pub const fn requests_sync(&self) -> bool {
        matches!(self, Self::Moved(_) | Self::Resized(_) | Self::Created(_))
    }

    /// Row that should be refreshed in place (moves and resizes only).
    #[must_use]
    pub const fn refreshed_row(&self) -> Option<RegionId> {
        match self {
            Self::Moved(id) | Self::Resized(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether the table needs a full rebuild (row set or selection changed).
    #[must_use]
    pub const fn rebuilds_table(&self) -> bool {
        matches!(self, Self::Created(_) | Self::SelectionCleared)
    }

    /// Whether the surface needs a redraw.
    #[must_use]
    pub const fn needs_redraw(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Converts pointer events into region store operations.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    surface: SurfaceSize,
    hit_radius_px: f64,
    drag: Option<DragState>,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(SurfaceSize::default())
    }
}

impl InteractionMachine {
    /// Create a machine for a surface of the given size.
    #[must_use]
    pub fn new(surface: SurfaceSize) -> Self {
        Self {
            surface,
            hit_radius_px: HANDLE_HIT_RADIUS_PX,
            drag: None,
        }
    }

    /// Set the handle hit radius in pixels (never below the default).
    #[must_use]
    pub fn with_hit_radius(mut self, radius_px: f64) -> Self {
        self.hit_radius_px = radius_px.max(HANDLE_HIT_RADIUS_PX);
        self
    }

    /// Update the surface size after a resolution change.
    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    /// Current surface size.
    #[must_use]
    pub const fn surface(&self) -> SurfaceSize {
        self.surface
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        match self.drag.as_ref().map(|d| d.drag_type) {
            None => InteractionState::Idle,
            Some(DragType::Create) => InteractionState::Creating,
            Some(DragType::Move) => InteractionState::Moving,
            Some(DragType::Resize(handle)) => InteractionState::Resizing(handle),
        }
    }

    /// The gesture in progress, if any.
    #[must_use]
    pub const fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Normalized `(x1, y1, x2, y2)` of the rubber band while creating.
    #[must_use]
    pub fn rubber_band(&self) -> Option<(f64, f64, f64, f64)> {
        let drag = self.drag.as_ref()?;
        (drag.drag_type == DragType::Create).then(|| {
            (
                drag.start_x.min(drag.current_x),
                drag.start_y.min(drag.current_y),
                drag.start_x.max(drag.current_x),
                drag.start_y.max(drag.current_y),
            )
        })
    }

    /// Cursor to show when hovering at a pixel position.
    #[must_use]
    pub fn cursor_at(&self, store: &RegionStore, x_px: f64, y_px: f64) -> &'static str {
        if let Some(drag) = &self.drag {
            return match drag.drag_type {
                DragType::Move => "move",
                DragType::Create => "crosshair",
                DragType::Resize(handle) => handle.cursor(),
            };
        }
        let Some(selected) = store.selected_region() else {
            return "crosshair";
        };
        if let Some(handle) = handle_at(selected, x_px, y_px, self.surface, self.hit_radius_px) {
            return handle.cursor();
        }
        let (x, y) = PointerEvent::moved(x_px, y_px).normalized(self.surface);
        if selected.contains_point(x, y) {
            "move"
        } else {
            "default"
        }
    }

    /// Abandon any gesture (focus loss, teardown).
    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Feed one pointer event.
    pub fn handle(&mut self, store: &mut RegionStore, event: PointerEvent) -> InteractionOutcome {
        let (x, y) = event.normalized(self.surface);
        match event.phase {
            PointerPhase::Down => self.pointer_down(store, &event, x, y),
            PointerPhase::Move => self.pointer_move(store, x, y),
            PointerPhase::Up | PointerPhase::Leave => self.pointer_up(store, x, y),
        }
    }

    fn pointer_down(
        &mut self,
        store: &mut RegionStore,
        event: &PointerEvent,
        x: f64,
        y: f64,
    ) -> InteractionOutcome {
        if self.drag.is_some() {
            // A down without a prior up: the previous gesture was lost.
            self.drag = None;
        }

        let drag_type = match store.selected_region().cloned() {
            Some(selected) => {
                if let Some(handle) =
                    handle_at(&selected, event.x, event.y, self.surface, self.hit_radius_px)
                {
                    DragType::Resize(handle)
                } else if selected.contains_point(x, y) {
                    DragType::Move
                } else {
                    if store.select(None).is_err() {
                        tracing::debug!("Selection vanished before it could be cleared");
                    }
                    return InteractionOutcome::SelectionCleared;
                }
            }
            None => DragType::Create,
        };

        let initial_region = match drag_type {
            DragType::Create => None,
            DragType::Move | DragType::Resize(_) => store.selected_region().cloned(),
        };
        tracing::debug!(%drag_type, x, y, "Drag started");
        self.drag = Some(DragState {
            drag_type,
            start_x: x,
            start_y: y,
            current_x: x,
            current_y: y,
            initial_region,
        });
        InteractionOutcome::DragStarted(drag_type)
    }

    fn pointer_move(&mut self, store: &mut RegionStore, x: f64, y: f64) -> InteractionOutcome {
        let Some(drag) = self.drag.as_mut() else {
            return InteractionOutcome::None;
        };
        drag.current_x = x;
        drag.current_y = y;
        let dx = x - drag.start_x;
        let dy = y - drag.start_y;
        let drag_type = drag.drag_type;
        let initial = drag.initial_region.clone();

        match (drag_type, initial.as_ref()) {
            (DragType::Create, _) => InteractionOutcome::CreatePreview,
            (DragType::Move, Some(initial)) => {
                let moved = translate(initial, dx, dy);
                apply_geometry(store, &moved, MIN_SYNC_SIZE).map_or_else(
                    || self.lose_drag(),
                    InteractionOutcome::Moved,
                )
            }
            (DragType::Resize(handle), Some(initial)) => {
                let resized = handle.apply(initial, dx, dy);
                apply_geometry(store, &resized, MIN_DRAG_SIZE).map_or_else(
                    || self.lose_drag(),
                    InteractionOutcome::Resized,
                )
            }
            (DragType::Move | DragType::Resize(_), None) => self.lose_drag(),
        }
    }

    fn pointer_up(&mut self, store: &mut RegionStore, x: f64, y: f64) -> InteractionOutcome {
        let Some(mut drag) = self.drag.take() else {
            return InteractionOutcome::None;
        };
        if drag.drag_type != DragType::Create {
            tracing::debug!(drag_type = %drag.drag_type, "Drag ended");
            return InteractionOutcome::DragEnded;
        }

        drag.current_x = x;
        drag.current_y = y;
        let (x1, x2) = (drag.start_x.min(x), drag.start_x.max(x));
        let (y1, y2) = (drag.start_y.min(y), drag.start_y.max(y));
        if x2 - x1 <= MIN_DRAG_SIZE || y2 - y1 <= MIN_DRAG_SIZE {
            tracing::debug!(width = x2 - x1, height = y2 - y1, "Create drag too small");
            return InteractionOutcome::CreateDiscarded;
        }

        let region = store.create(RegionDraft::with_bounds(x1, y1, x2, y2));
        if let Err(e) = store.select(Some(region.id)) {
            tracing::warn!("Failed to select new region: {e}");
        }
        InteractionOutcome::Created(region.id)
    }

    fn lose_drag(&mut self) -> InteractionOutcome {
        tracing::debug!("Dragged region no longer exists, ending drag");
        self.drag = None;
        InteractionOutcome::DragEnded
    }
}

/// Translate a snapshot, keeping it fully inside the canvas with its size intact.
#[must_use]
pub fn translate(initial: &Region, dx: f64, dy: f64) -> Region {
    let width = initial.width();
    let height = initial.height();
    let x1 = (initial.x1 + dx).clamp(0.0, (1.0 - width).max(0.0));
    let y1 = (initial.y1 + dy).clamp(0.0, (1.0 - height).max(0.0));
    Region {
        x1,
        y1,
        x2: (x1 + width).min(1.0),
        y2: (y1 + height).min(1.0),
        ..initial.clone()
    }
}

fn apply_geometry(store: &mut RegionStore, target: &Region, min_size: f64) -> Option<RegionId> {
    store
        .update_with_min(target.id, min_size, |region| {
            region.x1 = target.x1;
            region.y1 = target.y1;
            region.x2 = target.x2;
            region.y2 = target.y2;
        })
        .ok()
        .map(|r| r.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 500;

    fn px(v: f64) -> f64 {
        v * f64::from(SIZE)
    }

    fn setup(x1: f64, y1: f64, x2: f64, y2: f64) -> (RegionStore, InteractionMachine, RegionId) {
        let mut store = RegionStore::new();
        let region = store.create(RegionDraft::with_bounds(x1, y1, x2, y2));
        store.select(Some(region.id)).expect("select");
        let machine = InteractionMachine::new(SurfaceSize::new(SIZE, SIZE));
        (store, machine, region.id)
    }

    fn bounds(store: &RegionStore, id: RegionId) -> (f64, f64, f64, f64) {
        let r = store.get(id).expect("region exists");
        (r.x1, r.y1, r.x2, r.y2)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_southeast_handle_keeps_northwest_anchor() {
        let (mut store, mut machine, id) = setup(0.2, 0.2, 0.6, 0.6);

        let started = machine.handle(&mut store, PointerEvent::down(px(0.6), px(0.6)));
        assert_eq!(started, InteractionOutcome::DragStarted(DragType::Resize(Handle::SouthEast)));
        assert_eq!(machine.state(), InteractionState::Resizing(Handle::SouthEast));

        let outcome = machine.handle(&mut store, PointerEvent::moved(px(0.7), px(0.7)));
        assert_eq!(outcome, InteractionOutcome::Resized(id));
        assert!(outcome.requests_sync());
        assert_eq!(outcome.refreshed_row(), Some(id));

        let (x1, y1, x2, y2) = bounds(&store, id);
        assert!(close(x1, 0.2) && close(y1, 0.2));
        assert!(close(x2, 0.7) && close(y2, 0.7));

        assert_eq!(
            machine.handle(&mut store, PointerEvent::up(px(0.7), px(0.7))),
            InteractionOutcome::DragEnded
        );
        assert_eq!(machine.state(), InteractionState::Idle);
    }

    #[test]
    fn test_north_handle_moves_only_top() {
        let (mut store, mut machine, id) = setup(0.2, 0.2, 0.6, 0.6);
        machine.handle(&mut store, PointerEvent::down(px(0.4), px(0.2)));
        assert_eq!(machine.state(), InteractionState::Resizing(Handle::North));
        machine.handle(&mut store, PointerEvent::moved(px(0.5), px(0.1)));
        let (x1, y1, x2, y2) = bounds(&store, id);
        assert!(close(x1, 0.2) && close(x2, 0.6));
        assert!(close(y1, 0.1) && close(y2, 0.6));
    }

    #[test]
    fn test_resize_past_anchor_swaps_and_keeps_min_size() {
        let (mut store, mut machine, id) = setup(0.2, 0.2, 0.6, 0.6);
        machine.handle(&mut store, PointerEvent::down(px(0.6), px(0.4)));
        assert_eq!(machine.state(), InteractionState::Resizing(Handle::East));

        // Drag the right edge past the left edge
        machine.handle(&mut store, PointerEvent::moved(px(0.1), px(0.4)));
        let r = store.get(id).expect("exists").clone();
        assert!(close(r.x1, 0.1) && close(r.x2, 0.2));
        assert!(r.is_valid(MIN_DRAG_SIZE));

        // Drag it onto the anchor: min size re-centers
        machine.handle(&mut store, PointerEvent::moved(px(0.2), px(0.4)));
        let r = store.get(id).expect("exists").clone();
        assert!(r.is_valid(MIN_DRAG_SIZE));
        assert!(close(r.width(), MIN_DRAG_SIZE));
    }

    #[test]
    fn test_move_translates_and_clamps() {
        let (mut store, mut machine, id) = setup(0.2, 0.2, 0.6, 0.6);
        machine.handle(&mut store, PointerEvent::down(px(0.4), px(0.4)));
        assert_eq!(machine.state(), InteractionState::Moving);

        let outcome = machine.handle(&mut store, PointerEvent::moved(px(0.5), px(0.45)));
        assert_eq!(outcome, InteractionOutcome::Moved(id));
        let (x1, y1, x2, y2) = bounds(&store, id);
        assert!(close(x1, 0.3) && close(y1, 0.25));
        assert!(close(x2, 0.7) && close(y2, 0.65));

        // Far past the edge: stays inside with the same size
        machine.handle(&mut store, PointerEvent::moved(px(1.0), px(1.0)));
        let r = store.get(id).expect("exists").clone();
        assert!(close(r.x2, 1.0) && close(r.y2, 1.0));
        assert!(close(r.width(), 0.4) && close(r.height(), 0.4));
    }

    #[test]
    fn test_create_drag_materializes_and_selects() {
        let mut store = RegionStore::new();
        let mut machine = InteractionMachine::new(SurfaceSize::new(SIZE, SIZE));

        let started = machine.handle(&mut store, PointerEvent::down(px(0.1), px(0.1)));
        assert_eq!(started, InteractionOutcome::DragStarted(DragType::Create));
        assert_eq!(
            machine.handle(&mut store, PointerEvent::moved(px(0.4), px(0.3))),
            InteractionOutcome::CreatePreview
        );
        let band = machine.rubber_band().expect("rubber band while creating");
        assert!(close(band.2, 0.4) && close(band.3, 0.3));

        let outcome = machine.handle(&mut store, PointerEvent::up(px(0.4), px(0.3)));
        let InteractionOutcome::Created(id) = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(store.selected(), Some(id));
        let (x1, y1, x2, y2) = bounds(&store, id);
        assert!(close(x1, 0.1) && close(y1, 0.1) && close(x2, 0.4) && close(y2, 0.3));
    }

    #[test]
    fn test_create_drag_below_threshold_is_discarded() {
        let mut store = RegionStore::new();
        let mut machine = InteractionMachine::new(SurfaceSize::new(SIZE, SIZE));
        machine.handle(&mut store, PointerEvent::down(px(0.1), px(0.1)));
        let outcome = machine.handle(&mut store, PointerEvent::up(px(0.13), px(0.5)));
        assert_eq!(outcome, InteractionOutcome::CreateDiscarded);
        assert!(!outcome.requests_sync());
        assert!(store.is_empty());
    }

    #[test]
    fn test_leave_ends_drag() {
        let (mut store, mut machine, _) = setup(0.2, 0.2, 0.6, 0.6);
        machine.handle(&mut store, PointerEvent::down(px(0.4), px(0.4)));
        let outcome = machine.handle(&mut store, PointerEvent::leave(px(0.9), px(0.9)));
        assert_eq!(outcome, InteractionOutcome::DragEnded);
        assert_eq!(machine.state(), InteractionState::Idle);
    }

    #[test]
    fn test_down_outside_selection_only_deselects() {
        let (mut store, mut machine, _) = setup(0.2, 0.2, 0.4, 0.4);
        let outcome = machine.handle(&mut store, PointerEvent::down(px(0.8), px(0.8)));
        assert_eq!(outcome, InteractionOutcome::SelectionCleared);
        assert!(store.selected().is_none());
        assert_eq!(machine.state(), InteractionState::Idle);
    }

    #[test]
    fn test_unselected_regions_are_not_grabbed() {
        let mut store = RegionStore::new();
        store.create(RegionDraft::with_bounds(0.2, 0.2, 0.6, 0.6));
        let mut machine = InteractionMachine::new(SurfaceSize::new(SIZE, SIZE));
        // Inside an unselected region: starts a create drag instead of a move
        machine.handle(&mut store, PointerEvent::down(px(0.4), px(0.4)));
        assert_eq!(machine.state(), InteractionState::Creating);
    }

    #[test]
    fn test_move_without_drag_is_noop() {
        let mut store = RegionStore::new();
        let mut machine = InteractionMachine::default();
        assert_eq!(
            machine.handle(&mut store, PointerEvent::moved(10.0, 10.0)),
            InteractionOutcome::None
        );
    }

    #[test]
    fn test_cursor_hints() {
        let (store, machine, _) = setup(0.2, 0.2, 0.6, 0.6);
        assert_eq!(machine.cursor_at(&store, px(0.2), px(0.2)), "nwse-resize");
        assert_eq!(machine.cursor_at(&store, px(0.4), px(0.4)), "move");
        assert_eq!(machine.cursor_at(&store, px(0.9), px(0.9)), "default");
    }

    #[test]
    fn test_drag_type_labels() {
        assert_eq!(DragType::Resize(Handle::NorthWest).to_string(), "resize-nw");
        assert_eq!(DragType::Move.to_string(), "move");
    }
}
