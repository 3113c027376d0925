//! Region Editor Integration Tests
//!
//! Exercises the core editing flows end to end:
//! - Pointer gestures against the store
//! - Table edits and row actions
//! - Mapping conversion and export/import
//! - Invariants under arbitrary input

use couple_core::mapping::{mapping_to_text, region_to_tuple};
use couple_core::region::{MIN_DRAG_SIZE, MIN_SYNC_SIZE, WEIGHT_MAX, WEIGHT_MIN};
use couple_core::{
    from_mapping, import_into, layout, reconcile_prompts, split_prompts, to_mapping, Column,
    EditorDocument, EditorMode, InteractionMachine, InteractionOutcome, PointerEvent, RegionDraft,
    RegionStore, RowAction, SurfaceSize, TableView,
};
use proptest::prelude::*;

const SIZE: u32 = 400;

fn machine() -> InteractionMachine {
    InteractionMachine::new(SurfaceSize::new(SIZE, SIZE))
}

fn px(v: f64) -> f64 {
    v * f64::from(SIZE)
}

// ============================================================================
// Gesture Workflows
// ============================================================================

#[test]
fn test_draw_then_move_then_resize() {
    let mut store = RegionStore::new();
    let mut pointer = machine();

    // Draw a region from (0.1, 0.1) to (0.5, 0.5)
    pointer.handle(&mut store, PointerEvent::down(px(0.1), px(0.1)));
    pointer.handle(&mut store, PointerEvent::moved(px(0.3), px(0.3)));
    let created = pointer.handle(&mut store, PointerEvent::up(px(0.5), px(0.5)));
    let InteractionOutcome::Created(id) = created else {
        panic!("Expected Created, got {created:?}");
    };
    assert_eq!(store.selected(), Some(id));

    // Move it by (0.2, 0.1)
    pointer.handle(&mut store, PointerEvent::down(px(0.3), px(0.3)));
    pointer.handle(&mut store, PointerEvent::moved(px(0.5), px(0.4)));
    pointer.handle(&mut store, PointerEvent::up(px(0.5), px(0.4)));
    let region = store.get(id).expect("region exists").clone();
    assert!((region.x1 - 0.3).abs() < 1e-9);
    assert!((region.y1 - 0.2).abs() < 1e-9);
    assert!((region.width() - 0.4).abs() < 1e-9);

    // Drag the south-east corner outward past the canvas
    pointer.handle(&mut store, PointerEvent::down(px(region.x2), px(region.y2)));
    pointer.handle(&mut store, PointerEvent::moved(px(1.5), px(1.5)));
    pointer.handle(&mut store, PointerEvent::up(px(1.5), px(1.5)));
    let region = store.get(id).expect("region exists");
    assert!((region.x2 - 1.0).abs() < 1e-9);
    assert!((region.y2 - 1.0).abs() < 1e-9);
    assert!((region.x1 - 0.3).abs() < 1e-9);
}

#[test]
fn test_table_and_surface_stay_consistent() {
    let mut store = RegionStore::new();
    for prompt in ["a cat", "a dog"] {
        store.create(RegionDraft::default().prompt(prompt));
    }
    let mut table = TableView::new(&store);

    table.click_row(&mut store, 1).expect("select row");
    let id = store.selected().expect("selected");

    let mut pointer = machine();
    let region = store.get(id).expect("region").clone();
    let (cx, cy) = ((region.x1 + region.x2) / 2.0, (region.y1 + region.y2) / 2.0);
    pointer.handle(&mut store, PointerEvent::down(px(cx), px(cy)));
    let outcome = pointer.handle(&mut store, PointerEvent::moved(px(cx - 0.1), px(cy)));
    let refreshed = outcome.refreshed_row().expect("move refreshes its row");
    assert!(table.refresh_row(&store, refreshed));

    let x1 = store.get(id).expect("region").x1;
    assert_eq!(
        table.rows()[1].cell(Column::X1).expect("cell").text,
        format!("{x1:.2}")
    );

    table.apply_action(&mut store, 0, RowAction::Delete).expect("delete");
    assert_eq!(store.len(), 1);
    assert_eq!(store.list()[0].prompt, "a dog");
    assert_eq!(table.rows().len(), 1);
}

// ============================================================================
// Mapping and Documents
// ============================================================================

#[test]
fn test_prompt_count_drives_regions() {
    let mut store = RegionStore::new();
    let prompts = split_prompts("a castle\na dragon\na knight\na moat", "\n");
    reconcile_prompts(&mut store, &prompts);
    assert_eq!(to_mapping(store.list()), layout(4));
}

#[test]
fn test_export_import_round_trip_resets_prompts() {
    let mut store = RegionStore::new();
    store.create(RegionDraft::with_bounds(0.0, 0.0, 0.4, 1.0).prompt("left").weight(1.5));
    store.create(RegionDraft::with_bounds(0.4, 0.0, 1.0, 1.0).prompt("right"));
    let json = EditorDocument::from_store(&store, EditorMode::Advanced)
        .to_json()
        .expect("export");

    let mut restored = RegionStore::new();
    assert_eq!(import_into(&mut restored, &json), Some(2));
    assert_eq!(to_mapping(restored.list()), to_mapping(store.list()));
    assert!(restored.list().iter().all(|r| r.prompt.is_empty()));
    assert_eq!(restored.list()[1].color, store.list()[1].color);
}

#[test]
fn test_export_import_survives_disk() {
    let dir = tempfile::tempdir().expect("temp dir");

    let mut store = RegionStore::new();
    store.create(RegionDraft::with_bounds(0.2, 0.2, 0.8, 0.8));
    let path = EditorDocument::from_store(&store, EditorMode::Advanced)
        .write_to_dir(dir.path())
        .expect("write");

    let mut restored = RegionStore::new();
    let count = couple_core::document::import_file(&mut restored, &path).expect("read");
    assert_eq!(count, Some(1));
}

#[test]
fn test_mapping_text_is_backend_order() {
    let regions = from_mapping(&[[0.1, 0.6, 0.2, 0.9, 2.0]]);
    assert_eq!(mapping_to_text(&to_mapping(&regions)), "[[0.1,0.6,0.2,0.9,2.0]]");
}

// ============================================================================
// Invariants
// ============================================================================

fn coord() -> impl Strategy<Value = f64> {
    prop_oneof![
        -2.0..3.0f64,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(0.5),
    ]
}

proptest! {
    #[test]
    fn prop_store_regions_always_valid(
        bounds in prop::collection::vec((coord(), coord(), coord(), coord(), coord()), 1..8)
    ) {
        let mut store = RegionStore::new();
        for (x1, y1, x2, y2, w) in bounds {
            let region = store.create(RegionDraft::with_bounds(x1, y1, x2, y2).weight(w));
            prop_assert!(region.is_valid(MIN_SYNC_SIZE), "invalid region {region:?}");
        }
    }

    #[test]
    fn prop_mapping_tuples_are_sane(
        x1 in coord(), y1 in coord(), x2 in coord(), y2 in coord(), w in coord()
    ) {
        let regions = from_mapping(&[[x1, x2, y1, y2, w]]);
        let [tx1, tx2, ty1, ty2, tw] = region_to_tuple(&regions[0]);
        prop_assert!((0.0..=1.0).contains(&tx1) && (0.0..=1.0).contains(&tx2));
        prop_assert!((0.0..=1.0).contains(&ty1) && (0.0..=1.0).contains(&ty2));
        prop_assert!(tx1 < tx2 && ty1 < ty2);
        prop_assert!((WEIGHT_MIN..=WEIGHT_MAX).contains(&tw));
    }

    #[test]
    fn prop_resize_never_breaks_min_size(
        hx in 0.0..1.0f64, hy in 0.0..1.0f64, tx in -0.5..1.5f64, ty in -0.5..1.5f64
    ) {
        let mut store = RegionStore::new();
        let region = store.create(RegionDraft::with_bounds(0.3, 0.3, 0.7, 0.7));
        store.select(Some(region.id)).expect("select");
        let mut pointer = machine();

        // Grab whichever handle is nearest to a random corner
        let grab = if hx < 0.5 { 0.3 } else { 0.7 };
        let grab_y = if hy < 0.5 { 0.3 } else { 0.7 };
        pointer.handle(&mut store, PointerEvent::down(px(grab), px(grab_y)));
        pointer.handle(&mut store, PointerEvent::moved(px(tx), px(ty)));
        pointer.handle(&mut store, PointerEvent::up(px(tx), px(ty)));

        let region = store.get(region.id).expect("region");
        prop_assert!(region.is_valid(MIN_DRAG_SIZE), "invalid after resize {region:?}");
    }

    #[test]
    fn prop_layout_matches_count(n in 1usize..50) {
        prop_assert_eq!(layout(n).len(), n);
    }
}
