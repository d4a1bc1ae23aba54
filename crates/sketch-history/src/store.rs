#![forbid(unsafe_code)]

//! Capture boundary between live edits and recorded history.
//!
//! The [`Store`] keeps the last committed [`Snapshot`]. Local edits mutate
//! the live state freely; only a commit with [`StoreAction::Capture`] diffs
//! the live state against the snapshot and turns the difference into a
//! [`HistoryEntry`]. Until then the edit is an in-progress gesture.
//!
//! Remote updates are folded into the snapshot element by element, so a
//! gesture that is committed after a remote update diffs against the then
//! current baseline and does not claim the remote change as its own.

use crate::change::{ElementSetChange, ViewStateChange};
use crate::config::InvariantMode;
use crate::delta::{Partial, apply_partial};
use crate::element::{Element, ElementMap};
use crate::history::HistoryEntry;
use crate::view_state::ViewState;

/// What a commit does with the pending difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreAction {
    /// Record the difference as a history entry and move the snapshot.
    Capture,
    /// Move the snapshot without recording (undo, redo, scene loads).
    Update,
    /// Leave the snapshot alone; the gesture is still in progress.
    #[default]
    None,
}

/// Last committed elements and view state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    elements: ElementMap,
    view: ViewState,
}

impl Snapshot {
    #[must_use]
    pub fn new(elements: ElementMap, view: ViewState) -> Self {
        Self { elements, view }
    }

    #[must_use]
    pub fn elements(&self) -> &ElementMap {
        &self.elements
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }
}

/// Holds the committed snapshot and produces history entries from it.
#[derive(Debug, Clone, Default)]
pub struct Store {
    snapshot: Snapshot,
    invariants: InvariantMode,
}

impl Store {
    #[must_use]
    pub fn new(snapshot: Snapshot, invariants: InvariantMode) -> Self {
        Self {
            snapshot,
            invariants,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Commit the live state according to `action`.
    ///
    /// Returns the entry to record, if any.
    pub fn commit(
        &mut self,
        action: StoreAction,
        elements: &ElementMap,
        view: &ViewState,
    ) -> Option<HistoryEntry> {
        match action {
            StoreAction::Capture => self.capture(elements, view),
            StoreAction::Update => {
                self.update_snapshot(elements, view);
                None
            }
            StoreAction::None => None,
        }
    }

    /// Diff the live state against the snapshot and move the snapshot.
    ///
    /// Returns `None` when nothing observable changed.
    pub fn capture(&mut self, elements: &ElementMap, view: &ViewState) -> Option<HistoryEntry> {
        let element_change =
            ElementSetChange::calculate_with_mode(&self.snapshot.elements, elements, self.invariants);
        let view_change = ViewStateChange::calculate(&self.snapshot.view, view);
        self.update_snapshot(elements, view);

        let entry = HistoryEntry::new(view_change, element_change);
        if entry.is_empty() {
            tracing::trace!(target: "sketch.history", "capture produced no change");
            return None;
        }
        tracing::debug!(
            target: "sketch.history",
            elements = entry.elements().len(),
            view = !entry.view().is_empty(),
            "captured history entry"
        );
        Some(entry)
    }

    /// Replace the snapshot with the live state.
    pub fn update_snapshot(&mut self, elements: &ElementMap, view: &ViewState) {
        self.snapshot = Snapshot::new(elements.clone(), view.clone());
    }

    /// Fold accepted remote elements and view fields into the snapshot.
    pub fn absorb_remote(&mut self, accepted: &[Element], view: Option<&Partial<ViewState>>) {
        for element in accepted {
            self.snapshot
                .elements
                .insert(element.id.clone(), element.clone());
        }
        if let Some(partial) = view {
            apply_partial(&mut self.snapshot.view, partial);
        }
    }
}
