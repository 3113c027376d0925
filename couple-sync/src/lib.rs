//! # Couple Sync
//!
//! Runtime plumbing between the region editor and its host.
//!
//! - [`SyncEngine`] debounces region changes into the host mapping store,
//!   skipping unchanged mappings and guarding real mappings from defaults.
//! - [`ModeGate`] caches the host's mode so only `Advanced` writes.
//! - [`ChangeFeed`] turns host values (prompt text, resolution) into streams,
//!   either pushed or polled.
//! - [`RequestBus`] correlates requests to the host with their responses.
//! - [`EditorSession`] wires one editor instance together and owns its tasks.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod mode;
pub mod session;
pub mod store;
pub mod watch;

pub use bus::{BusRequest, BusResponse, RequestBus};
pub use config::SyncConfig;
pub use engine::{SkipReason, SyncEngine, SyncOutcome};
pub use error::{BusError, StoreError, SyncError, SyncResult};
pub use mode::{ModeGate, ModeSource, SharedMode};
pub use session::{EditorSession, SessionOptions};
pub use store::{MappingStore, TextFieldStore};
pub use watch::ChangeFeed;
