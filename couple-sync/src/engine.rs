//! Sync engine - pushes the editor's regions into the host mapping store.
//!
//! Writes happen only in `Advanced` mode, are skipped when nothing changed,
//! and never let an all-default mapping clobber a real one.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use couple_core::mapping::{is_default_mapping, mapping_to_text, mappings_equal, MappingTuple};
use couple_core::{to_mapping, MappingSlot, RegionStore};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::mode::ModeGate;
use crate::store::MappingStore;

/// Why a sync did not write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The host is not in `Advanced` mode.
    ModeInactive,
    /// The mapping target is not mounted.
    NotReady,
    /// The new mapping is all-default and would replace a real one.
    DefaultGuard,
    /// The target refused the write.
    Rejected,
}

/// Result of one sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The mapping was written.
    Written(Vec<MappingTuple>),
    /// The target already holds this mapping.
    Unchanged,
    /// Nothing was written.
    Skipped(SkipReason),
}

#[derive(Default)]
struct EngineState {
    last_hash: Option<u64>,
    last_written: Option<Vec<MappingTuple>>,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

struct EngineInner {
    regions: Arc<Mutex<RegionStore>>,
    target: Arc<dyn MappingStore>,
    gate: ModeGate,
    slot: MappingSlot,
    debounce: Duration,
    state: Mutex<EngineState>,
}

/// Debounced, hash-checked mapping sync for one slot.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("slot", &self.inner.slot)
            .field("debounce", &self.inner.debounce)
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine syncing `regions` into `slot` of `target`.
    #[must_use]
    pub fn new(
        regions: Arc<Mutex<RegionStore>>,
        target: Arc<dyn MappingStore>,
        gate: ModeGate,
        slot: MappingSlot,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                regions,
                target,
                gate,
                slot,
                debounce,
                state: Mutex::new(EngineState::default()),
            }),
        }
    }

    /// Slot this engine writes to.
    #[must_use]
    pub fn slot(&self) -> MappingSlot {
        self.inner.slot
    }

    /// Mode gate used by this engine.
    #[must_use]
    pub fn gate(&self) -> &ModeGate {
        &self.inner.gate
    }

    /// Schedule a sync after the debounce period. A newer call replaces the
    /// pending one, so bursts collapse into a single write.
    ///
    /// Must be called from within a tokio runtime.
    pub fn auto_sync(&self) {
        let mut state = self.inner.lock_state();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            {
                let mut state = inner.lock_state();
                if state.generation == generation {
                    state.pending = None;
                }
            }
            inner.sync_now();
        }));
    }

    /// Cancel any pending debounce and sync immediately.
    pub fn force_sync(&self) -> SyncOutcome {
        self.cancel_pending();
        self.inner.sync_now()
    }

    /// Drop a pending debounced sync, if any.
    pub fn cancel_pending(&self) {
        let mut state = self.inner.lock_state();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    /// Whether a debounced sync is waiting to run.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.lock_state().pending.is_some()
    }

    /// Forget what was last written, so the next sync writes unconditionally
    /// (subject to the mode gate and default guard).
    pub fn reset_change_detection(&self) {
        let mut state = self.inner.lock_state();
        state.last_hash = None;
        state.last_written = None;
    }

    /// Current mapping of the editor's regions.
    #[must_use]
    pub fn mapping(&self) -> Vec<MappingTuple> {
        self.inner.current_mapping()
    }

    /// Inject the mapping into outgoing request parameters.
    ///
    /// In `Advanced` mode this force-syncs and stores the mapping JSON text at
    /// `index`, padding with nulls if the list is shorter. In any other mode
    /// the parameters pass through untouched.
    #[must_use]
    pub fn prepare_request(&self, mut params: Vec<Value>, index: usize) -> Vec<Value> {
        if !self.inner.gate.is_active() {
            return params;
        }
        let outcome = self.force_sync();
        tracing::debug!(?outcome, index, "Synced before request");
        if params.len() <= index {
            params.resize(index + 1, Value::Null);
        }
        params[index] = Value::String(mapping_to_text(&self.mapping()));
        params
    }
}

impl EngineInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_mapping(&self) -> Vec<MappingTuple> {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        to_mapping(regions.list())
    }

    fn sync_now(&self) -> SyncOutcome {
        if !self.gate.is_active() {
            tracing::debug!(slot = %self.slot, "Sync skipped: mode is not Advanced");
            return SyncOutcome::Skipped(SkipReason::ModeInactive);
        }

        let mapping = self.current_mapping();
        let hash = hash_mapping(&mapping);

        let existing = match self.target.read(self.slot) {
            Ok(existing) => existing,
            Err(e) => return self.skip_on_error(&e),
        };

        {
            let state = self.lock_state();
            let target_intact = match (&state.last_written, &existing) {
                (Some(written), Some(existing)) => mappings_equal(written, existing),
                _ => false,
            };
            if state.last_hash == Some(hash) && target_intact {
                tracing::trace!(slot = %self.slot, "Sync skipped: unchanged");
                return SyncOutcome::Unchanged;
            }
        }

        if let Some(existing) = &existing {
            if !existing.is_empty() && !is_default_mapping(existing) && is_default_mapping(&mapping) {
                tracing::debug!(slot = %self.slot, "Sync skipped: default mapping would overwrite custom one");
                return SyncOutcome::Skipped(SkipReason::DefaultGuard);
            }
        }

        if let Err(e) = self.target.write(self.slot, &mapping) {
            return self.skip_on_error(&e);
        }

        let mut state = self.lock_state();
        state.last_hash = Some(hash);
        state.last_written = Some(mapping.clone());
        tracing::debug!(slot = %self.slot, regions = mapping.len(), "Mapping synced");
        SyncOutcome::Written(mapping)
    }

    fn skip_on_error(&self, error: &StoreError) -> SyncOutcome {
        match error {
            StoreError::NotReady(_) => {
                tracing::debug!(slot = %self.slot, "Sync skipped: {error}");
                SyncOutcome::Skipped(SkipReason::NotReady)
            }
            StoreError::Rejected(_) => {
                tracing::warn!(slot = %self.slot, "Sync failed: {error}");
                SyncOutcome::Skipped(SkipReason::Rejected)
            }
        }
    }
}

fn hash_mapping(mapping: &[MappingTuple]) -> u64 {
    let mut hasher = DefaultHasher::new();
    mapping_to_text(mapping).hash(&mut hasher);
    hasher.finish()
}
