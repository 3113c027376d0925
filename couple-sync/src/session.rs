//! Editor session - one editor instance with its tasks and host wiring.
//!
//! The session owns the region store, the interaction machine, the table,
//! the renderer and the sync engine, plus the watcher tasks feeding host
//! changes in. Everything is released together by [`EditorSession::shutdown`]
//! or on drop.
//!
//! Lock order is always regions, then view. No lock is held across `.await`
//! or while the engine reads the regions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use couple_core::document::EditorDocument;
use couple_core::mapping::{mapping_to_text, MappingTuple};
use couple_core::prompts::{rebuild_from_prompts, reconcile_prompts, split_prompts};
use couple_core::table::{CommitOutcome, TableRow};
use couple_core::{
    from_mapping, import_into, infotext, parse_mapping_text, Column, EditorMode,
    InteractionMachine, InteractionOutcome, MappingSlot, PointerEvent, Region, RegionChange,
    RegionDraft, RegionId, RegionStore, RowAction, SurfaceSize, TableView,
};
use couple_renderer::{BackgroundImage, Frame, Renderer, RendererConfig};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::bus::{BusRequest, RequestBus};
use crate::config::SyncConfig;
use crate::engine::{SyncEngine, SyncOutcome};
use crate::error::{BusError, SyncResult};
use crate::mode::{ModeGate, ModeSource};
use crate::store::MappingStore;
use crate::watch::ChangeFeed;

/// Capacity of the region change broadcast.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Options for a new session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Sync timing and wiring.
    pub sync: SyncConfig,
    /// Renderer setup.
    pub renderer: RendererConfig,
    /// Mapping slot this editor writes to.
    pub slot: MappingSlot,
    /// Initial generation resolution.
    pub resolution: (u32, u32),
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            renderer: RendererConfig::default(),
            slot: MappingSlot::Primary,
            resolution: (1024, 1024),
        }
    }
}

struct EditorView {
    machine: InteractionMachine,
    table: TableView,
    renderer: Renderer,
    background: Option<BackgroundImage>,
    prompts: Vec<String>,
}

impl EditorView {
    fn redraw(&mut self, regions: &RegionStore) {
        let overlay: Vec<Region> = regions
            .list()
            .iter()
            .map(|r| {
                self.table
                    .preview_region(regions, r.id)
                    .unwrap_or_else(|| r.clone())
            })
            .collect();
        let frame = Frame::new(regions, &self.machine)
            .with_regions(&overlay)
            .with_background(self.background.as_ref());
        self.renderer.render(&frame);
    }
}

/// A running editor instance.
pub struct EditorSession {
    config: SyncConfig,
    regions: Arc<Mutex<RegionStore>>,
    view: Arc<Mutex<EditorView>>,
    engine: SyncEngine,
    changes: broadcast::Sender<RegionChange>,
    tasks: Vec<JoinHandle<()>>,
    bus: Option<RequestBus>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("slot", &self.engine.slot())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create a session writing to `target` and gated by `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer cannot be created.
    pub fn new(
        options: SessionOptions,
        target: Arc<dyn MappingStore>,
        mode: Arc<dyn ModeSource>,
    ) -> SyncResult<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let mut store = RegionStore::new();
        let tx = changes.clone();
        store.subscribe(move |change| {
            // No receivers is fine.
            let _ = tx.send(change.clone());
            Ok(())
        });

        let renderer = Renderer::new(options.renderer, options.resolution)?;
        let machine = InteractionMachine::new(renderer.surface_size())
            .with_hit_radius(renderer.config().style.handle_radius);
        let mut view = EditorView {
            machine,
            table: TableView::new(&store),
            renderer,
            background: None,
            prompts: Vec::new(),
        };
        view.redraw(&store);

        let regions = Arc::new(Mutex::new(store));
        let gate = ModeGate::new(mode, options.sync.mode_cache_ttl);
        let engine = SyncEngine::new(
            Arc::clone(&regions),
            target,
            gate,
            options.slot,
            options.sync.sync_debounce,
        );

        tracing::info!(slot = %options.slot, "Editor session started");
        Ok(Self {
            config: options.sync,
            regions,
            view: Arc::new(Mutex::new(view)),
            engine,
            changes,
            tasks: Vec::new(),
            bus: None,
        })
    }

    /// Attach a request bus to the host.
    #[must_use]
    pub fn with_bus(mut self, bus: RequestBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Open a request bus using the configured timeout.
    ///
    /// Replaces any attached bus. The receiver yields requests for the host
    /// to answer through [`RequestBus::respond`] on [`EditorSession::bus`].
    pub fn open_bus(&mut self) -> mpsc::Receiver<BusRequest> {
        let (bus, requests) = RequestBus::new(self.config.bus_timeout);
        self.bus = Some(bus);
        requests
    }

    /// The attached request bus, if any.
    #[must_use]
    pub fn bus(&self) -> Option<&RequestBus> {
        self.bus.as_ref()
    }

    /// Receive every region store change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegionChange> {
        self.changes.subscribe()
    }

    /// The sync engine.
    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    // ------------------------------------------------------------------
    // Host feeds
    // ------------------------------------------------------------------

    /// Reconcile regions with the prompt text whenever it settles.
    pub fn watch_prompts(&mut self, mut feed: ChangeFeed<String>) {
        let regions = Arc::clone(&self.regions);
        let view = Arc::clone(&self.view);
        let engine = self.engine.clone();
        let separator = self.config.prompt_separator.clone();
        let quiet = self.config.prompt_debounce;
        self.tasks.push(tokio::spawn(async move {
            while let Some(text) = feed.next_settled(quiet).await {
                apply_prompts(&regions, &view, &engine, split_prompts(&text, &separator));
            }
            tracing::debug!("Prompt feed ended");
        }));
    }

    /// Resize and redraw the surface whenever the resolution changes.
    pub fn watch_resolution(&mut self, mut feed: ChangeFeed<(u32, u32)>) {
        let regions = Arc::clone(&self.regions);
        let view = Arc::clone(&self.view);
        self.tasks.push(tokio::spawn(async move {
            while let Some((width, height)) = feed.next().await {
                if let Err(e) = resize(&regions, &view, width, height) {
                    tracing::warn!("Ignoring resolution {width}x{height}: {e}");
                }
            }
            tracing::debug!("Resolution feed ended");
        }));
    }

    /// Poll a resolution the host can only be read for, at the configured
    /// interval.
    pub fn poll_resolution<F>(&mut self, read: F)
    where
        F: FnMut() -> Option<(u32, u32)> + Send + 'static,
    {
        let feed = ChangeFeed::poll(self.config.resolution_poll, read);
        self.watch_resolution(feed);
    }

    /// Apply prompt text immediately, without the settle delay.
    pub fn set_prompts(&self, text: &str) {
        let prompts = split_prompts(text, &self.config.prompt_separator);
        apply_prompts(&self.regions, &self.view, &self.engine, prompts);
    }

    /// Apply a new resolution immediately.
    ///
    /// Returns whether the surface changed size.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be resized.
    pub fn set_resolution(&self, width: u32, height: u32) -> SyncResult<bool> {
        resize(&self.regions, &self.view, width, height)
    }

    /// Ask the host something over the request bus.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] without a bus, otherwise whatever the bus
    /// reports.
    pub async fn host_request(&self, method: &str, payload: Value) -> SyncResult<Value> {
        let bus = self.bus.as_ref().ok_or(BusError::Closed)?;
        Ok(bus.request(method, payload).await?)
    }

    // ------------------------------------------------------------------
    // Surface
    // ------------------------------------------------------------------

    /// Feed a pointer event from the surface.
    pub fn pointer(&self, event: PointerEvent) -> InteractionOutcome {
        let outcome = {
            let mut regions = lock(&self.regions);
            let mut view = lock(&self.view);
            let outcome = view.machine.handle(&mut regions, event);
            if let Some(id) = outcome.refreshed_row() {
                view.table.refresh_row(&regions, id);
            }
            if outcome.rebuilds_table() {
                view.table.rebuild(&regions);
            }
            if outcome.needs_redraw() {
                view.redraw(&regions);
            }
            outcome
        };
        if outcome.requests_sync() {
            self.engine.auto_sync();
        }
        outcome
    }

    /// Cursor hint at a surface pixel.
    #[must_use]
    pub fn cursor_at(&self, x: f64, y: f64) -> &'static str {
        let regions = lock(&self.regions);
        let view = lock(&self.view);
        view.machine.cursor_at(&regions, x, y)
    }

    /// Set or clear the background image.
    pub fn set_background(&self, background: Option<BackgroundImage>) {
        let regions = lock(&self.regions);
        let mut view = lock(&self.view);
        view.background = background;
        view.redraw(&regions);
    }

    /// Pixels of the last frame, for raster renderers.
    #[must_use]
    pub fn snapshot(&self) -> Option<image::RgbaImage> {
        lock(&self.view).renderer.snapshot()
    }

    /// Frames drawn so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        lock(&self.view).renderer.frame_count()
    }

    /// Current surface size.
    #[must_use]
    pub fn surface_size(&self) -> SurfaceSize {
        lock(&self.view).renderer.surface_size()
    }

    /// Size the surface is displayed at.
    #[must_use]
    pub fn display_size(&self) -> (u32, u32) {
        lock(&self.view).renderer.display_size()
    }

    // ------------------------------------------------------------------
    // Table
    // ------------------------------------------------------------------

    /// Current table rows.
    #[must_use]
    pub fn table_rows(&self) -> Vec<TableRow> {
        lock(&self.view).table.rows().to_vec()
    }

    /// Type into a table cell. The surface previews the value unclamped.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or the read-only prompt column.
    pub fn type_cell(&self, row: usize, column: Column, text: &str) -> SyncResult<Option<f64>> {
        let regions = lock(&self.regions);
        let mut view = lock(&self.view);
        let live = view.table.type_text(row, column, text)?;
        view.redraw(&regions);
        Ok(live)
    }

    /// Commit a table cell.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or the read-only prompt column.
    pub fn commit_cell(&self, row: usize, column: Column) -> SyncResult<CommitOutcome> {
        let outcome = {
            let mut regions = lock(&self.regions);
            let mut view = lock(&self.view);
            let outcome = view.table.commit(&mut regions, row, column)?;
            view.redraw(&regions);
            outcome
        };
        if matches!(outcome, CommitOutcome::Committed(_)) {
            self.engine.auto_sync();
        }
        Ok(outcome)
    }

    /// Toggle selection from a table row click.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row.
    pub fn click_row(&self, row: usize) -> SyncResult<Option<RegionId>> {
        let mut regions = lock(&self.regions);
        let mut view = lock(&self.view);
        let selected = view.table.click_row(&mut regions, row)?;
        view.redraw(&regions);
        Ok(selected)
    }

    /// Run a row context menu action.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row.
    pub fn row_action(&self, row: usize, action: RowAction) -> SyncResult<()> {
        self.mutate(|regions, view| view.table.apply_action(regions, row, action))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Snapshot of the regions.
    #[must_use]
    pub fn regions(&self) -> Vec<Region> {
        lock(&self.regions).list().to_vec()
    }

    /// Selected region id.
    #[must_use]
    pub fn selected(&self) -> Option<RegionId> {
        lock(&self.regions).selected()
    }

    /// Add a region at the default position and select it.
    ///
    /// # Errors
    ///
    /// Returns an error if the new region cannot be selected.
    pub fn add_region(&self) -> SyncResult<Region> {
        self.mutate(|regions, _| {
            let region = regions.create(RegionDraft::default());
            regions.select(Some(region.id))?;
            Ok(region)
        })
    }

    /// Delete the selected region, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection is stale.
    pub fn delete_selected(&self) -> SyncResult<Option<RegionId>> {
        self.mutate(|regions, _| match regions.selected() {
            Some(id) => {
                regions.delete(id)?;
                regions.renumber();
                Ok(Some(id))
            }
            None => Ok(None),
        })
    }

    /// Remove every region.
    pub fn clear_all(&self) {
        let cleared = self.mutate(|regions, view| {
            view.machine.cancel();
            regions.clear_all();
            Ok(())
        });
        if let Err(e) = cleared {
            tracing::warn!("Clearing regions failed: {e}");
        }
    }

    /// Replace the regions with `layout(prompt count)` and reapply prompts.
    pub fn reset_to_layout(&self) {
        let rebuilt = self.mutate(|regions, view| {
            view.machine.cancel();
            rebuild_from_prompts(regions, &view.prompts);
            Ok(())
        });
        if let Err(e) = rebuilt {
            tracing::warn!("Layout reset failed: {e}");
        }
    }

    /// React to a change of the host's mode control.
    ///
    /// Entering `Advanced` forces the next sync to write; with `reset_layout`
    /// the regions are rebuilt from the prompts first.
    pub fn mode_changed(&self, mode: EditorMode, reset_layout: bool) {
        self.engine.gate().invalidate();
        tracing::info!(%mode, reset_layout, "Mode changed");
        if !mode.syncs_regions() {
            self.engine.cancel_pending();
            return;
        }
        if reset_layout {
            self.reset_to_layout();
        }
        self.engine.reset_change_detection();
        self.engine.auto_sync();
    }

    // ------------------------------------------------------------------
    // Mapping text, documents, parameter paste
    // ------------------------------------------------------------------

    /// Current mapping as JSON text for the host's mapping field.
    #[must_use]
    pub fn mapping_text(&self) -> String {
        mapping_to_text(&self.engine.mapping())
    }

    /// Load the host's mapping field text.
    ///
    /// Blank text is ignored and returns `false`; unparsable text loads the
    /// default halves.
    pub fn apply_mapping_text(&self, text: &str) -> bool {
        match parse_mapping_text(text) {
            Some(tuples) => {
                self.load_tuples(&tuples);
                true
            }
            None => {
                tracing::debug!("Empty mapping text, nothing to apply");
                false
            }
        }
    }

    /// Restore a mapping from pasted generation parameters.
    ///
    /// Returns `false` if the text carries no mapping.
    pub fn paste_parameters(&self, params: &str) -> bool {
        let Some(tuples) = infotext::extract_mapping(params) else {
            return false;
        };
        self.load_tuples(&tuples);
        self.engine.auto_sync();
        true
    }

    /// Export the current state.
    #[must_use]
    pub fn export_document(&self) -> EditorDocument {
        let mode = self.engine.gate().mode().unwrap_or(EditorMode::Advanced);
        EditorDocument::from_store(&lock(&self.regions), mode)
    }

    /// Import a document, replacing every region.
    ///
    /// Returns the number of regions, or `None` if the payload was rejected
    /// and nothing changed.
    pub fn import_document(&self, json: &str) -> Option<usize> {
        self.mutate(|regions, view| {
            view.machine.cancel();
            Ok(import_into(regions, json))
        })
        .ok()
        .flatten()
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Sync immediately.
    pub fn force_sync(&self) -> SyncOutcome {
        self.engine.force_sync()
    }

    /// Place the mapping into outgoing request parameters (Advanced only).
    #[must_use]
    pub fn prepare_request(&self, params: Vec<Value>) -> Vec<Value> {
        self.engine
            .prepare_request(params, self.config.mapping_param_index)
    }

    /// Stop every task and pending timer.
    pub fn shutdown(mut self) {
        self.stop();
        tracing::info!("Editor session shut down");
    }

    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.engine.cancel_pending();
    }

    fn load_tuples(&self, tuples: &[MappingTuple]) {
        let replaced = self.mutate_quiet(|regions, view| {
            view.machine.cancel();
            let mut loaded = from_mapping(tuples);
            for (region, prompt) in loaded.iter_mut().zip(&view.prompts) {
                region.prompt.clone_from(prompt);
            }
            regions.replace_all(loaded);
            Ok(())
        });
        if let Err(e) = replaced {
            tracing::warn!("Loading {} regions failed: {e}", tuples.len());
        }
    }

    /// Run a structural change, rebuild the table, redraw, and schedule a sync.
    fn mutate<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&mut RegionStore, &mut EditorView) -> couple_core::CoupleResult<T>,
    {
        let result = self.mutate_quiet(f)?;
        self.engine.auto_sync();
        Ok(result)
    }

    fn mutate_quiet<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&mut RegionStore, &mut EditorView) -> couple_core::CoupleResult<T>,
    {
        let mut regions = lock(&self.regions);
        let mut view = lock(&self.view);
        let result = f(&mut *regions, &mut *view);
        view.table.rebuild(&regions);
        view.redraw(&regions);
        Ok(result?)
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply_prompts(
    regions: &Mutex<RegionStore>,
    view: &Mutex<EditorView>,
    engine: &SyncEngine,
    prompts: Vec<String>,
) {
    let summary = {
        let mut regions = lock(regions);
        let mut view = lock(view);
        let summary = reconcile_prompts(&mut regions, &prompts);
        view.prompts = prompts;
        if summary.structural() {
            view.machine.cancel();
            view.table.rebuild(&regions);
        } else {
            let ids: Vec<RegionId> = regions.list().iter().map(|r| r.id).collect();
            for id in ids {
                view.table.refresh_row(&regions, id);
            }
        }
        view.redraw(&regions);
        summary
    };
    if summary.structural() {
        engine.auto_sync();
    }
}

fn resize(
    regions: &Mutex<RegionStore>,
    view: &Mutex<EditorView>,
    width: u32,
    height: u32,
) -> SyncResult<bool> {
    let regions = lock(regions);
    let mut view = lock(view);
    let Some(size) = view.renderer.resize_for_resolution(width, height)? else {
        return Ok(false);
    };
    view.machine.set_surface(size);
    view.redraw(&regions);
    tracing::debug!("Surface resized to {}x{} for {width}x{height}", size.width, size.height);
    Ok(true)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
