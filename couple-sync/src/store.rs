//! Mapping stores - where synced mappings end up.
//!
//! The host keeps one mapping per editing context. A web host typically keeps
//! it in a hidden JSON text field per tab, which [`TextFieldStore`] models.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use couple_core::mapping::{mapping_to_text, parse_mapping_text, MappingTuple};
use couple_core::MappingSlot;

use crate::error::StoreError;

/// Keyed mapping slots owned by the host.
///
/// Implementations never block: a target that is not available yet reports
/// [`StoreError::NotReady`].
pub trait MappingStore: Send + Sync {
    /// Current mapping in a slot. `Ok(None)` means the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotReady`] if the slot is not mounted.
    fn read(&self, slot: MappingSlot) -> Result<Option<Vec<MappingTuple>>, StoreError>;

    /// Replace the mapping in a slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotReady`] if the slot is not mounted.
    fn write(&self, slot: MappingSlot, mapping: &[MappingTuple]) -> Result<(), StoreError>;
}

/// In-memory JSON text fields, one per slot.
///
/// Clones share the same fields.
#[derive(Debug, Clone)]
pub struct TextFieldStore {
    fields: Arc<RwLock<HashMap<MappingSlot, String>>>,
    ready: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
}

impl Default for TextFieldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFieldStore {
    /// Create a mounted store with empty fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(AtomicBool::new(true)),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Mount or unmount every field.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of successful writes through [`MappingStore::write`].
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw text of a field.
    #[must_use]
    pub fn text(&self, slot: MappingSlot) -> Option<String> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned()
    }

    /// Set a field's text as the host would (e.g. a parameter paste).
    ///
    /// Not counted as a write.
    pub fn set_text(&self, slot: MappingSlot, text: impl Into<String>) {
        self.fields
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, text.into());
    }

    fn check_ready(&self, slot: MappingSlot) -> Result<(), StoreError> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::NotReady(slot))
        }
    }
}

impl MappingStore for TextFieldStore {
    fn read(&self, slot: MappingSlot) -> Result<Option<Vec<MappingTuple>>, StoreError> {
        self.check_ready(slot)?;
        Ok(self.text(slot).and_then(|text| parse_mapping_text(&text)))
    }

    fn write(&self, slot: MappingSlot, mapping: &[MappingTuple]) -> Result<(), StoreError> {
        self.check_ready(slot)?;
        self.set_text(slot, mapping_to_text(mapping));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
