//! # Couple Core
//!
//! Core logic for the regional prompt editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 couple-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Region Store    │  Interaction             │
//! │  - Regions       │  - Pointer events        │
//! │  - Selection     │  - Move / resize / draw  │
//! │  - Subscribers   │  - Handle hit testing    │
//! ├─────────────────────────────────────────────┤
//! │  Mapping         │  Table View              │
//! │  - Tuples        │  - Two-phase editing     │
//! │  - Smart layout  │  - Row actions           │
//! │  - Import/export │  - Prompt reconciliation │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is synchronous and free of I/O apart from the document
//! file helpers. Debouncing and the mapping store live in `couple-sync`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod error;
pub mod event;
pub mod infotext;
pub mod interaction;
pub mod layout;
pub mod mapping;
pub mod mode;
pub mod prompts;
pub mod region;
pub mod store;
pub mod table;

pub use document::{import_into, parse_import, EditorDocument};
pub use error::{CoupleError, CoupleResult};
pub use event::{PointerEvent, PointerPhase, SurfaceSize};
pub use interaction::{
    DragState, DragType, Handle, InteractionMachine, InteractionOutcome, InteractionState,
};
pub use layout::layout;
pub use mapping::{
    from_mapping, is_default_mapping, parse_mapping_text, to_mapping, validate_mapping,
    MappingTuple, DEFAULT_MAPPING,
};
pub use mode::{EditorMode, MappingSlot};
pub use prompts::{reconcile_prompts, split_prompts, Reconciliation};
pub use region::{Region, RegionDraft, RegionId};
pub use store::{RegionChange, RegionStore, SubscriptionId};
pub use table::{Column, CommitOutcome, RowAction, TableView};

/// Couple core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
