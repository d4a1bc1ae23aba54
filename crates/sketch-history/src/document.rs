#![forbid(unsafe_code)]

//! Live document: elements, view state, capture store and history together.
//!
//! [`Document`] serializes the four things that mutate the live state
//! (local edits, remote updates, undo and redo) and keeps the store
//! snapshot and the history stacks in step with each of them.

use crate::config::HistoryConfig;
use crate::delta::{Partial, apply_partial};
use crate::element::{Element, ElementMap};
use crate::history::{HistoryStack, HistoryStep, RemoteChanges};
use crate::store::{Snapshot, Store, StoreAction};
use crate::view_state::ViewState;

/// Elements and view fields delivered by a collaborator.
#[derive(Debug, Clone, Default)]
pub struct RemoteUpdate {
    /// Full element records; each is reconciled by version.
    pub elements: Vec<Element>,
    /// Observed view fields to overwrite, if any.
    pub view: Option<Partial<ViewState>>,
}

impl RemoteUpdate {
    #[must_use]
    pub fn elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            view: None,
        }
    }
}

/// True if `remote` should replace `local`: a higher version, or the same
/// version with a lower nonce.
#[must_use]
pub fn remote_wins(local: &Element, remote: &Element) -> bool {
    remote.version > local.version
        || (remote.version == local.version && remote.version_nonce < local.version_nonce)
}

/// A live document with undo/redo.
#[derive(Debug)]
pub struct Document {
    elements: ElementMap,
    view: ViewState,
    store: Store,
    history: HistoryStack,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl Document {
    /// An empty document.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_scene(Vec::new(), ViewState::default(), config)
    }

    /// A document whose initial scene is the baseline, not an undoable edit.
    #[must_use]
    pub fn with_scene(
        elements: impl IntoIterator<Item = Element>,
        view: ViewState,
        config: HistoryConfig,
    ) -> Self {
        let elements: ElementMap = elements
            .into_iter()
            .map(|element| (element.id.clone(), element))
            .collect();
        let store = Store::new(
            Snapshot::new(elements.clone(), view.clone()),
            config.invariants,
        );
        Self {
            elements,
            view,
            store,
            history: HistoryStack::new(config),
        }
    }

    #[must_use]
    pub fn elements(&self) -> &ElementMap {
        &self.elements
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run a local edit, then commit it with `action`.
    ///
    /// Returns true if a history entry was recorded.
    pub fn mutate<F>(&mut self, action: StoreAction, f: F) -> bool
    where
        F: FnOnce(&mut ElementMap, &mut ViewState),
    {
        f(&mut self.elements, &mut self.view);
        self.commit(action)
    }

    /// Commit pending local edits with `action`.
    pub fn commit(&mut self, action: StoreAction) -> bool {
        match self.store.commit(action, &self.elements, &self.view) {
            Some(entry) => {
                self.history.push(entry);
                true
            }
            None => false,
        }
    }

    /// Reconcile a remote update into the live state and rebase history.
    ///
    /// Returns the number of elements accepted.
    pub fn apply_remote(&mut self, update: RemoteUpdate) -> usize {
        let _span = tracing::debug_span!(
            target: "sketch.history",
            "document.apply_remote",
            incoming = update.elements.len()
        )
        .entered();

        let mut accepted = Vec::new();
        let mut changes = RemoteChanges::new();
        for remote in update.elements {
            let local = self.elements.get(&remote.id);
            if local.is_some_and(|local| !remote_wins(local, &remote)) {
                tracing::trace!(
                    target: "sketch.history",
                    element = %remote.id,
                    "keeping newer local element"
                );
                continue;
            }
            changes.record_element(local, &remote);
            self.elements.insert(remote.id.clone(), remote.clone());
            accepted.push(remote);
        }

        if let Some(partial) = &update.view {
            let previous = self.view.clone();
            apply_partial(&mut self.view, partial);
            changes.record_view(&previous, &self.view);
        }

        self.store.absorb_remote(&accepted, update.view.as_ref());
        self.history
            .on_remote_update(&self.elements, &self.view, &changes);

        tracing::debug!(
            target: "sketch.history",
            accepted = accepted.len(),
            "remote update absorbed"
        );
        accepted.len()
    }

    /// Undo the most recent visible local change.
    ///
    /// Uncommitted edits are folded into the new baseline.
    pub fn undo(&mut self) -> Option<HistoryStep> {
        let step = self.history.undo(&mut self.elements, &mut self.view)?;
        self.store.update_snapshot(&self.elements, &self.view);
        Some(step)
    }

    /// Redo the most recently undone visible change.
    pub fn redo(&mut self) -> Option<HistoryStep> {
        let step = self.history.redo(&mut self.elements, &mut self.view)?;
        self.store.update_snapshot(&self.elements, &self.view);
        Some(step)
    }
}
