//! Mode gate - cached lookups of the host's couple mode.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use couple_core::EditorMode;
use tokio::time::Instant;

/// Somewhere the current mode can be read from.
///
/// `None` means the mode control is not mounted; the gate treats that as
/// inactive.
pub trait ModeSource: Send + Sync {
    /// Read the current mode.
    fn current_mode(&self) -> Option<EditorMode>;
}

impl<F> ModeSource for F
where
    F: Fn() -> Option<EditorMode> + Send + Sync,
{
    fn current_mode(&self) -> Option<EditorMode> {
        self()
    }
}

/// A mode value shared between the host and the editor.
#[derive(Debug, Clone)]
pub struct SharedMode(Arc<RwLock<Option<EditorMode>>>);

impl SharedMode {
    /// Create a shared mode.
    #[must_use]
    pub fn new(mode: Option<EditorMode>) -> Self {
        Self(Arc::new(RwLock::new(mode)))
    }

    /// Change the mode.
    pub fn set(&self, mode: Option<EditorMode>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }
}

impl ModeSource for SharedMode {
    fn current_mode(&self) -> Option<EditorMode> {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caches mode lookups for a short TTL.
pub struct ModeGate {
    source: Arc<dyn ModeSource>,
    ttl: Duration,
    cache: Mutex<Option<(Instant, Option<EditorMode>)>>,
}

impl std::fmt::Debug for ModeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeGate")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ModeGate {
    /// Create a gate over a mode source.
    #[must_use]
    pub fn new(source: Arc<dyn ModeSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Current mode, from cache if it is fresh enough.
    pub fn mode(&self) -> Option<EditorMode> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((at, mode)) = *cache {
            if at.elapsed() < self.ttl {
                return mode;
            }
        }
        let mode = self.source.current_mode();
        *cache = Some((Instant::now(), mode));
        mode
    }

    /// Whether region sync is enabled right now.
    pub fn is_active(&self) -> bool {
        self.mode().is_some_and(EditorMode::syncs_regions)
    }

    /// Forget the cached value.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
