#![forbid(unsafe_code)]

//! History stack for undo/redo of document changes.
//!
//! [`HistoryStack`] keeps two stacks of [`HistoryEntry`] values, each pairing
//! a view-state change with an element-set change recorded in the forward
//! direction (`from` = before the local edit, `to` = after it):
//!
//! - **Undo** pops an entry, applies its inverse and moves it to the redo stack
//! - **Redo** pops an entry, applies it forward and moves it to the undo stack
//! - **Skipping**: entries whose application is not visible are consumed in the
//!   same call, so one undo always produces an observable step when one exists
//! - **Rebasing**: remote updates refresh stale entry endpoints
//!
//! # Invariants
//!
//! 1. `undo_depth() <= config.max_depth` after any operation
//! 2. The redo stack is cleared whenever a new entry is pushed
//! 3. No empty entry is ever stored
//!
//! ```text
//! push(e3)
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [e1, e2, e3]                      │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//!
//! remote update deletes everything e3 touched, then undo()
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [e1]          e3 invisible, e2 not│
//! │ Redo Stack: [e3, e2]                          │
//! └───────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use crate::change::{ChangedFields, ElementSetChange, ViewStateChange};
use crate::config::{GroupVisibility, HistoryConfig};
use crate::delta::{DeltaSide, Record, changed_fields};
use crate::element::{Element, ElementMap};
use crate::view_state::{ViewField, ViewState};

/// One undoable unit: a view-state change and an element-set change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryEntry {
    view: ViewStateChange,
    elements: ElementSetChange,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(view: ViewStateChange, elements: ElementSetChange) -> Self {
        Self { view, elements }
    }

    #[must_use]
    pub fn view(&self) -> &ViewStateChange {
        &self.view
    }

    #[must_use]
    pub fn elements(&self) -> &ElementSetChange {
        &self.elements
    }

    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            view: self.view.inverse(),
            elements: self.elements.inverse(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty() && self.elements.is_empty()
    }

    /// Apply both halves. Elements go first so that view visibility is judged
    /// against the elements this entry just produced.
    pub fn apply_to(
        &self,
        elements: &mut ElementMap,
        view: &mut ViewState,
        groups: GroupVisibility,
    ) -> bool {
        let elements_visible = self.elements.apply_to(elements);
        let view_visible = self.view.apply_to(view, elements, groups);
        elements_visible || view_visible
    }

    /// Rebase one side of both halves onto the live state, refreshing only
    /// the fields listed in `changes`.
    #[must_use]
    pub fn apply_latest_changes(
        &self,
        elements: &ElementMap,
        view: &ViewState,
        changes: &RemoteChanges,
        side: DeltaSide,
    ) -> Self {
        Self {
            view: self.view.apply_latest_changes(view, &changes.view, side),
            elements: self
                .elements
                .apply_latest_changes(elements, &changes.elements, side),
        }
    }
}

/// Fields a remote update actually changed, per element and on the view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteChanges {
    elements: ChangedFields,
    view: BTreeSet<ViewField>,
}

impl RemoteChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted remote element against the local one it replaced.
    ///
    /// An element seen for the first time counts as changing every field.
    pub fn record_element(&mut self, previous: Option<&Element>, latest: &Element) {
        let fields = match previous {
            Some(previous) => changed_fields(previous, latest),
            None => Element::FIELDS.iter().copied().collect(),
        };
        if !fields.is_empty() {
            self.elements
                .entry(latest.id.clone())
                .or_default()
                .extend(fields);
        }
    }

    /// Record the observed view fields that moved from `previous` to `latest`.
    pub fn record_view(&mut self, previous: &ViewState, latest: &ViewState) {
        self.view.extend(changed_fields(previous, latest));
    }

    #[must_use]
    pub fn elements(&self) -> &ChangedFields {
        &self.elements
    }

    #[must_use]
    pub fn view(&self) -> &BTreeSet<ViewField> {
        &self.view
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.view.is_empty()
    }
}

/// Outcome of one [`HistoryStack::undo`] or [`HistoryStack::redo`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStep {
    /// Entries moved between the stacks, including skipped invisible ones.
    pub entries: usize,
    /// Whether the last applied entry produced a visible difference.
    pub visible: bool,
}

/// Undo/redo stacks over [`HistoryEntry`] values.
pub struct HistoryStack {
    /// Entries available for undo (newest at back).
    undo_stack: VecDeque<HistoryEntry>,
    /// Entries available for redo (newest at back).
    redo_stack: VecDeque<HistoryEntry>,
    config: HistoryConfig,
}

impl fmt::Debug for HistoryStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStack")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryStack {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Record a committed local edit.
    ///
    /// Clears the redo stack even when `entry` is empty; empty entries are
    /// not stored. The edit is assumed to be applied already.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();

        if entry.is_empty() {
            return;
        }
        self.undo_stack.push_back(entry);

        while self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.pop_front();
        }
        tracing::debug!(
            target: "sketch.history",
            undo_depth = self.undo_stack.len(),
            "history entry recorded"
        );
    }

    /// Revert the most recent visible local change.
    ///
    /// Returns `None` when the undo stack is empty.
    pub fn undo(&mut self, elements: &mut ElementMap, view: &mut ViewState) -> Option<HistoryStep> {
        let _span = tracing::debug_span!(
            target: "sketch.history",
            "history.undo",
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len()
        )
        .entered();

        let groups = self.config.group_visibility;
        perform(
            &mut self.undo_stack,
            &mut self.redo_stack,
            |entry| entry.inverse().apply_to(elements, view, groups),
        )
    }

    /// Re-apply the most recently undone visible change.
    ///
    /// Returns `None` when the redo stack is empty.
    pub fn redo(&mut self, elements: &mut ElementMap, view: &mut ViewState) -> Option<HistoryStep> {
        let _span = tracing::debug_span!(
            target: "sketch.history",
            "history.redo",
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len()
        )
        .entered();

        let groups = self.config.group_visibility;
        let step = perform(
            &mut self.redo_stack,
            &mut self.undo_stack,
            |entry| entry.apply_to(elements, view, groups),
        );
        while self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.pop_front();
        }
        step
    }

    /// Rebase every stored entry after a remote update was absorbed.
    ///
    /// Undo entries get their `to` side refreshed (the state an undo starts
    /// from), redo entries their `from` side (the state a redo starts from).
    /// The endpoint an undo or redo moves *towards* is never touched, so the
    /// user's own earlier values survive while remote values become the new
    /// baseline. Only fields in `changes` are refreshed; values written by
    /// later local edits stay out of older entries.
    pub fn on_remote_update(
        &mut self,
        elements: &ElementMap,
        view: &ViewState,
        changes: &RemoteChanges,
    ) {
        let _span = tracing::debug_span!(
            target: "sketch.history",
            "history.rebase",
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            elements = changes.elements.len()
        )
        .entered();

        if changes.is_empty() {
            return;
        }
        for entry in &mut self.undo_stack {
            *entry = entry.apply_latest_changes(elements, view, changes, DeltaSide::To);
        }
        for entry in &mut self.redo_stack {
            *entry = entry.apply_latest_changes(elements, view, changes, DeltaSide::From);
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // ========================================================================
    // Info
    // ========================================================================

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Entries available for undo, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter()
    }

    /// Entries available for redo, oldest first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo_stack.iter()
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Clear both stacks.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Pop from `source`, apply, push onto `target`; repeat while the applied
/// entry was invisible and `source` still has entries.
fn perform<F>(
    source: &mut VecDeque<HistoryEntry>,
    target: &mut VecDeque<HistoryEntry>,
    mut apply: F,
) -> Option<HistoryStep>
where
    F: FnMut(&HistoryEntry) -> bool,
{
    let mut step = HistoryStep {
        entries: 0,
        visible: false,
    };

    while let Some(entry) = source.pop_back() {
        let visible = apply(&entry);
        target.push_back(entry);
        step.entries += 1;

        if visible {
            step.visible = true;
            break;
        }
        tracing::trace!(
            target: "sketch.history",
            skipped = step.entries,
            "skipping invisible history entry"
        );
    }

    if step.entries == 0 {
        return None;
    }
    tracing::debug!(
        target: "sketch.history",
        entries = step.entries,
        visible = step.visible,
        "history step applied"
    );
    Some(step)
}

// ============================================================================
// Tests
// ============================================================================
