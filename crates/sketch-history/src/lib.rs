#![forbid(unsafe_code)]

//! Sketch History
//!
//! Change tracking and undo/redo for collaborative sketch documents.
//!
//! # Key Components
//!
//! - [`Delta`] - Before/after diff over a closed set of record fields
//! - [`ViewStateChange`] - Reversible change to the observed view state
//! - [`ElementSetChange`] - Reversible added/removed/updated element deltas
//! - [`HistoryStack`] - Undo/redo stacks with invisible-step skipping and
//!   remote rebasing
//! - [`Store`] - Capture boundary that turns committed edits into entries
//! - [`Document`] - Live state, store and history behind one facade
//!
//! # How it fits together
//!
//! Local edits mutate the live [`ElementMap`] and [`ViewState`]. A commit
//! through the [`Store`] diffs them against the last snapshot and pushes a
//! [`HistoryEntry`]. Undo applies an entry's inverse, redo applies it
//! forward; both repair container/label and arrow bindings afterwards.
//! Remote updates are reconciled by element version and the fields they
//! change are rebased into every stored entry, so a later undo never
//! reverts a collaborator's change.
//!
//! Diagnostics go through `tracing` under the `sketch.history` target.

pub mod change;
pub mod config;
pub mod delta;
pub mod document;
pub mod element;
pub mod history;
pub mod store;
pub mod view_state;

pub use change::{
    BOUND_TEXT_PADDING, ChangeInvariantError, ChangedFields, ElementDelta, ElementDeltas, ElementSetChange,
    ViewStateChange, redraw_text_bounding_box,
};
pub use config::{GroupVisibility, HistoryConfig, HistoryConfigError, InvariantMode};
pub use delta::{Delta, DeltaSide, Partial, Record, changed_fields};
pub use document::{Document, RemoteUpdate, remote_wins};
pub use element::{
    BoundElement, BoundKind, Element, ElementField, ElementId, ElementKind, ElementMap,
    ElementValue, GroupId, insert_element, mutate_element,
};
pub use history::{HistoryEntry, HistoryStack, HistoryStep, RemoteChanges};
pub use store::{Snapshot, Store, StoreAction};
pub use view_state::{ViewField, ViewState, ViewValue};
