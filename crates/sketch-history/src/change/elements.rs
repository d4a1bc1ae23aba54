#![forbid(unsafe_code)]

//! Reversible change to the element set.
//!
//! An [`ElementSetChange`] holds one [`Delta`] per touched element, sorted
//! into three buckets:
//!
//! ```text
//!            from                      to
//! added      { is_deleted: true }      { ..element, is_deleted: false }
//! removed    { ..element, false }      { is_deleted: true }
//! updated    { changed fields }        { changed fields }   (is_deleted untouched)
//! ```
//!
//! Inverting swaps `added` and `removed` and inverts every delta, which
//! keeps the bucket contracts intact by construction.
//!
//! # Invariants
//!
//! 1. Every `added` delta starts from `is_deleted = true`.
//! 2. Every `removed` delta goes from `is_deleted = false` to `true`.
//! 3. No `updated` delta changes `is_deleted`.
//!
//! Violations are programming errors: fatal under [`InvariantMode::Fatal`],
//! logged under [`InvariantMode::Log`]. They are never auto-repaired.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::binding;
use crate::config::InvariantMode;
use crate::delta::{Delta, DeltaSide, Partial, Record, member_difference, merge_members};
use crate::element::{Element, ElementField, ElementId, ElementMap, ElementValue};

/// Delta over one element.
pub type ElementDelta = Delta<Element>;

/// Deltas keyed by element id.
pub type ElementDeltas = BTreeMap<ElementId, ElementDelta>;

/// Fields an external update changed, keyed by element id.
pub type ChangedFields = BTreeMap<ElementId, BTreeSet<ElementField>>;

/// A bucket contract broken by a constructed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeInvariantError {
    /// An added delta does not start from a deleted state.
    AddedNotFromDeleted { id: ElementId },
    /// A removed delta does not go from alive to deleted.
    RemovedNotDeleting { id: ElementId },
    /// An updated delta flips the deletion flag.
    UpdatedTogglesDeletion { id: ElementId },
}

impl fmt::Display for ChangeInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddedNotFromDeleted { id } => {
                write!(f, "added delta for {id} does not start from is_deleted=true")
            }
            Self::RemovedNotDeleting { id } => {
                write!(f, "removed delta for {id} does not go from alive to deleted")
            }
            Self::UpdatedTogglesDeletion { id } => {
                write!(f, "updated delta for {id} changes is_deleted")
            }
        }
    }
}

impl std::error::Error for ChangeInvariantError {}

/// Added / removed / updated element deltas since the last snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementSetChange {
    added: ElementDeltas,
    removed: ElementDeltas,
    updated: ElementDeltas,
}

impl ElementSetChange {
    /// A change that does nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a change from explicit buckets, checking the invariants with
    /// the build's default [`InvariantMode`].
    #[must_use]
    pub fn create(added: ElementDeltas, removed: ElementDeltas, updated: ElementDeltas) -> Self {
        Self::create_with_mode(added, removed, updated, InvariantMode::default())
    }

    /// Build a change from explicit buckets.
    ///
    /// # Panics
    ///
    /// Panics under [`InvariantMode::Fatal`] if a bucket contract is broken.
    #[must_use]
    pub fn create_with_mode(
        added: ElementDeltas,
        removed: ElementDeltas,
        updated: ElementDeltas,
        mode: InvariantMode,
    ) -> Self {
        let change = Self {
            added,
            removed,
            updated,
        };
        if let Err(err) = change.validate() {
            match mode {
                InvariantMode::Fatal => panic!("element set change invariant violated: {err}"),
                InvariantMode::Log => tracing::error!(
                    target: "sketch.history",
                    error = %err,
                    "element set change invariant violated"
                ),
            }
        }
        change
    }

    /// Check the three bucket contracts.
    pub fn validate(&self) -> Result<(), ChangeInvariantError> {
        for (id, delta) in &self.added {
            if deleted_flag(delta.from()) != Some(true) {
                return Err(ChangeInvariantError::AddedNotFromDeleted { id: id.clone() });
            }
        }
        for (id, delta) in &self.removed {
            if deleted_flag(delta.from()) != Some(false) || deleted_flag(delta.to()) != Some(true) {
                return Err(ChangeInvariantError::RemovedNotDeleting { id: id.clone() });
            }
        }
        for (id, delta) in &self.updated {
            if deleted_flag(delta.from()) != deleted_flag(delta.to()) {
                return Err(ChangeInvariantError::UpdatedTogglesDeletion { id: id.clone() });
            }
        }
        Ok(())
    }

    /// Diff two element maps using the build's default [`InvariantMode`].
    #[must_use]
    pub fn calculate(prev: &ElementMap, next: &ElementMap) -> Self {
        Self::calculate_with_mode(prev, next, InvariantMode::default())
    }

    /// Diff two element maps.
    ///
    /// Only elements whose version marker moved are diffed. An element that
    /// first appears already deleted carries nothing observable and is
    /// skipped.
    #[must_use]
    pub fn calculate_with_mode(prev: &ElementMap, next: &ElementMap, mode: InvariantMode) -> Self {
        let mut added = BTreeMap::new();
        let mut removed = BTreeMap::new();
        let mut updated = BTreeMap::new();

        for (id, prev_element) in prev {
            // Dropping a tombstone is not observable.
            if next.contains_key(id) || prev_element.is_deleted {
                continue;
            }
            let mut from = full_partial(prev_element);
            from.insert(ElementField::IsDeleted, ElementValue::Flag(false));
            let to = deleted_partial(true);
            removed.insert(id.clone(), Delta::new(from, to));
        }

        for (id, next_element) in next {
            let Some(prev_element) = prev.get(id) else {
                if next_element.is_deleted {
                    continue;
                }
                let from = deleted_partial(true);
                let mut to = full_partial(next_element);
                to.insert(ElementField::IsDeleted, ElementValue::Flag(false));
                added.insert(id.clone(), Delta::new(from, to));
                continue;
            };

            if prev_element.version_marker() == next_element.version_marker() {
                continue;
            }

            let delta = Delta::calculate_with(prev_element, next_element, reduce_references);
            match (prev_element.is_deleted, next_element.is_deleted) {
                (true, false) => {
                    added.insert(id.clone(), delta);
                }
                (false, true) => {
                    removed.insert(id.clone(), delta);
                }
                _ if !delta.is_empty() => {
                    updated.insert(id.clone(), delta);
                }
                _ => {}
            }
        }

        Self::create_with_mode(added, removed, updated, mode)
    }

    #[must_use]
    pub fn added(&self) -> &ElementDeltas {
        &self.added
    }

    #[must_use]
    pub fn removed(&self) -> &ElementDeltas {
        &self.removed
    }

    #[must_use]
    pub fn updated(&self) -> &ElementDeltas {
        &self.updated
    }

    /// True if no bucket holds a delta.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Number of elements touched across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }

    /// What was added, undoing removes, and vice versa.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let invert = |deltas: &ElementDeltas| -> ElementDeltas {
            deltas
                .iter()
                .map(|(id, delta)| (id.clone(), delta.inverse()))
                .collect()
        };
        Self {
            added: invert(&self.removed),
            removed: invert(&self.added),
            updated: invert(&self.updated),
        }
    }

    /// Apply the `to` side of every delta onto `elements`.
    ///
    /// Removals run first, then additions, then updates; binding repair and
    /// label geometry run once all three passes are done. Every element the
    /// application changes gets a bumped version.
    ///
    /// Returns whether the result contains a visible difference.
    pub fn apply_to(&self, elements: &mut ElementMap) -> bool {
        let mut visible = false;

        for (id, delta) in self
            .removed
            .iter()
            .chain(self.added.iter())
            .chain(self.updated.iter())
        {
            visible |= apply_delta(elements, id, delta);
        }

        visible |= binding::repair_after_apply(elements, &self.removed, &self.added, &self.updated);

        tracing::trace!(
            target: "sketch.history",
            added = self.added.len(),
            removed = self.removed.len(),
            updated = self.updated.len(),
            visible,
            "applied element set change"
        );
        visible
    }

    /// Rebase one side of every delta onto the live elements.
    ///
    /// Only fields listed in `changed` for an element are refreshed; every
    /// other field keeps the value it was recorded with. Identity sensitive
    /// fields (`is_deleted`, binding and group lists, custom data) are never
    /// refreshed.
    #[must_use]
    pub fn apply_latest_changes(
        &self,
        elements: &ElementMap,
        changed: &ChangedFields,
        side: DeltaSide,
    ) -> Self {
        let rebase = |deltas: &ElementDeltas| -> ElementDeltas {
            deltas
                .iter()
                .map(|(id, delta)| {
                    let rebased = match (elements.get(id), changed.get(id)) {
                        (Some(latest), Some(fields)) => delta.with_latest(side, latest, |field| {
                            field.is_identity_sensitive() || !fields.contains(&field)
                        }),
                        _ => delta.clone(),
                    };
                    (id.clone(), rebased)
                })
                .collect()
        };
        Self {
            added: rebase(&self.added),
            removed: rebase(&self.removed),
            updated: rebase(&self.updated),
        }
    }
}

/// Apply one delta. Returns true if the element visibly changed.
fn apply_delta(elements: &mut ElementMap, id: &ElementId, delta: &ElementDelta) -> bool {
    let Some(current) = elements.get_mut(id) else {
        return create_from_delta(elements, id, delta);
    };

    let mut next = current.clone();
    apply_sides(&mut next, delta.from(), delta.to());
    if next == *current {
        return false;
    }

    let visible = !current.is_deleted || !next.is_deleted;
    next.bump_version();
    *current = next;
    visible
}

fn create_from_delta(elements: &mut ElementMap, id: &ElementId, delta: &ElementDelta) -> bool {
    if deleted_flag(delta.to()) != Some(false) {
        tracing::trace!(
            target: "sketch.history",
            element = %id,
            "skipping delta for unknown element"
        );
        return false;
    }
    let element = Element::from_partial(id.clone(), delta.to());
    elements.insert(id.clone(), element);
    true
}

/// Scalars are overwritten; binding and group lists are merged so that
/// concurrent unrelated members survive.
fn apply_sides(element: &mut Element, from: &Partial<Element>, to: &Partial<Element>) {
    for (field, value) in to {
        match field {
            ElementField::BoundElements => {
                let added = value.as_bindings().unwrap_or(&[]);
                let removed = from
                    .get(field)
                    .and_then(ElementValue::as_bindings)
                    .unwrap_or(&[]);
                element.bound_elements = merge_members(&element.bound_elements, added, removed);
            }
            ElementField::GroupIds => {
                let added = value.as_groups().unwrap_or(&[]);
                let removed = from
                    .get(field)
                    .and_then(ElementValue::as_groups)
                    .unwrap_or(&[]);
                element.group_ids = merge_members(&element.group_ids, added, removed);
            }
            _ => element.set(*field, value.clone()),
        }
    }
}

fn full_partial(element: &Element) -> Partial<Element> {
    Element::FIELDS
        .iter()
        .map(|&field| (field, element.get(field)))
        .collect()
}

fn deleted_partial(deleted: bool) -> Partial<Element> {
    let mut partial = BTreeMap::new();
    partial.insert(ElementField::IsDeleted, ElementValue::Flag(deleted));
    partial
}

fn deleted_flag(partial: &Partial<Element>) -> Option<bool> {
    partial
        .get(&ElementField::IsDeleted)
        .and_then(ElementValue::as_flag)
}

/// Reduce binding and group lists to the members that were removed (`from`)
/// and added (`to`).
fn reduce_references(from: &mut Partial<Element>, to: &mut Partial<Element>) {
    for &field in Element::FIELDS.iter().filter(|field| field.is_reference()) {
        let difference = match (from.get(&field), to.get(&field)) {
            (Some(ElementValue::Bindings(prev)), Some(ElementValue::Bindings(next))) => Some((
                ElementValue::Bindings(member_difference(prev, next)),
                ElementValue::Bindings(member_difference(next, prev)),
            )),
            (Some(ElementValue::Groups(prev)), Some(ElementValue::Groups(next))) => Some((
                ElementValue::Groups(member_difference(prev, next)),
                ElementValue::Groups(member_difference(next, prev)),
            )),
            _ => None,
        };
        if let Some((removed, added)) = difference {
            store_difference(from, to, field, removed, added);
        }
    }
}

fn store_difference(
    from: &mut Partial<Element>,
    to: &mut Partial<Element>,
    field: ElementField,
    removed: ElementValue,
    added: ElementValue,
) {
    let nothing = |value: &ElementValue| match value {
        ElementValue::Bindings(list) => list.is_empty(),
        ElementValue::Groups(list) => list.is_empty(),
        _ => false,
    };
    // Reordering alone leaves no difference worth recording.
    if nothing(&removed) && nothing(&added) {
        from.remove(&field);
        to.remove(&field);
    } else {
        from.insert(field, removed);
        to.insert(field, added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::changed_fields;
    use crate::element::{BoundElement, ElementKind, insert_element, mutate_element};

    fn rect(id: &str) -> Element {
        Element::new(id, ElementKind::Rectangle)
    }

    fn map(elements: impl IntoIterator<Item = Element>) -> ElementMap {
        let mut map = ElementMap::new();
        for element in elements {
            insert_element(&mut map, element);
        }
        map
    }

    fn id(raw: &str) -> ElementId {
        ElementId::from(raw)
    }

    #[test]
    fn new_element_is_added() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        insert_element(&mut next, rect("b"));

        let change = ElementSetChange::calculate(&prev, &next);
        assert_eq!(change.added().len(), 1);
        assert!(change.removed().is_empty());
        assert!(change.updated().is_empty());
        assert!(change.validate().is_ok());
    }

    #[test]
    fn soft_delete_is_removed_and_keeps_other_changes() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| {
            el.is_deleted = true;
            el.x = 50.0;
        });

        let change = ElementSetChange::calculate(&prev, &next);
        let delta = &change.removed()[&id("a")];
        assert_eq!(delta.to().get(&ElementField::X), Some(&ElementValue::Number(50.0)));
        assert!(change.validate().is_ok());
    }

    #[test]
    fn restore_is_added() {
        let mut deleted = rect("a");
        deleted.is_deleted = true;
        let prev = map([deleted]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| el.is_deleted = false);

        let change = ElementSetChange::calculate(&prev, &next);
        assert!(change.added().contains_key(&id("a")));
    }

    #[test]
    fn unchanged_version_is_ignored() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        // Mutated without a version bump: not a committed write.
        next[0].x = 99.0;
        assert!(ElementSetChange::calculate(&prev, &next).is_empty());
    }

    #[test]
    fn version_only_bump_is_not_an_update() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |_| {});
        assert!(ElementSetChange::calculate(&prev, &next).is_empty());
    }

    #[test]
    fn new_deleted_element_is_skipped() {
        let mut ghost = rect("g");
        ghost.is_deleted = true;
        let change = ElementSetChange::calculate(&ElementMap::new(), &map([ghost]));
        assert!(change.is_empty());
    }

    #[test]
    fn missing_element_is_removed() {
        let prev = map([rect("a")]);
        let change = ElementSetChange::calculate(&prev, &ElementMap::new());
        assert!(change.removed().contains_key(&id("a")));
        assert!(change.validate().is_ok());
    }

    #[test]
    fn bound_elements_are_reduced_to_differences() {
        let prev = map([rect("c").with_bound_element(BoundElement::arrow("x"))]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("c"), |el| {
            el.bound_elements.push(BoundElement::text("t"));
        });

        let change = ElementSetChange::calculate(&prev, &next);
        let delta = &change.updated()[&id("c")];
        assert_eq!(
            delta.from().get(&ElementField::BoundElements),
            Some(&ElementValue::Bindings(vec![]))
        );
        assert_eq!(
            delta.to().get(&ElementField::BoundElements),
            Some(&ElementValue::Bindings(vec![BoundElement::text("t")]))
        );
    }

    #[test]
    fn group_ids_are_reduced_to_differences() {
        let mut prev = map([rect("c")]);
        mutate_element(&mut prev, &id("c"), |el| {
            el.group_ids = vec!["g1".into(), "g2".into()];
        });
        let mut next = prev.clone();
        mutate_element(&mut next, &id("c"), |el| {
            el.group_ids = vec!["g2".into(), "g3".into()];
        });

        let change = ElementSetChange::calculate(&prev, &next);
        let delta = &change.updated()[&id("c")];
        assert_eq!(
            delta.from().get(&ElementField::GroupIds),
            Some(&ElementValue::Groups(vec!["g1".into()]))
        );
        assert_eq!(
            delta.to().get(&ElementField::GroupIds),
            Some(&ElementValue::Groups(vec!["g3".into()]))
        );

        // Reordering alone is not a change.
        let mut reordered = prev.clone();
        mutate_element(&mut reordered, &id("c"), |el| el.group_ids.reverse());
        assert!(ElementSetChange::calculate(&prev, &reordered).is_empty());
    }

    #[test]
    fn apply_merges_concurrent_bindings() {
        let prev = map([rect("c")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("c"), |el| {
            el.bound_elements.push(BoundElement::arrow("mine"));
        });
        let change = ElementSetChange::calculate(&prev, &next);

        // A collaborator bound another arrow meanwhile.
        let mut live = prev.clone();
        mutate_element(&mut live, &id("c"), |el| {
            el.bound_elements.push(BoundElement::arrow("theirs"));
        });
        change.apply_to(&mut live);
        assert_eq!(live[&id("c")].bound_elements.len(), 2);

        change.inverse().apply_to(&mut live);
        assert_eq!(
            live[&id("c")].bound_elements,
            vec![BoundElement::arrow("theirs")]
        );
    }

    #[test]
    fn inverse_swaps_buckets_and_stays_valid() {
        let prev = map([rect("a"), rect("b")]);
        let mut next = prev.clone();
        insert_element(&mut next, rect("c"));
        mutate_element(&mut next, &id("a"), |el| el.is_deleted = true);
        mutate_element(&mut next, &id("b"), |el| el.angle = 1.0);

        let change = ElementSetChange::calculate(&prev, &next);
        let inverse = change.inverse();
        assert!(inverse.removed().contains_key(&id("c")));
        assert!(inverse.added().contains_key(&id("a")));
        assert!(inverse.updated().contains_key(&id("b")));
        assert!(inverse.validate().is_ok());
        assert_eq!(inverse.inverse(), change);
    }

    #[test]
    fn apply_then_inverse_restores_fields() {
        let prev = map([rect("a").with_background("transparent")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| {
            el.background_color = "red".to_string();
            el.width = 40.0;
        });
        let change = ElementSetChange::calculate(&prev, &next);

        let mut live = next.clone();
        assert!(change.inverse().apply_to(&mut live));
        assert_eq!(live[&id("a")].background_color, "transparent");
        assert_eq!(live[&id("a")].width, 100.0);

        assert!(change.apply_to(&mut live));
        assert_eq!(live[&id("a")].background_color, "red");
    }

    #[test]
    fn changes_on_deleted_elements_are_invisible() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| el.x = 10.0);
        let change = ElementSetChange::calculate(&prev, &next);

        let mut live = next.clone();
        mutate_element(&mut live, &id("a"), |el| el.is_deleted = true);
        assert!(!change.inverse().apply_to(&mut live));
        assert_eq!(live[&id("a")].x, 0.0);
    }

    #[test]
    fn applying_a_noop_is_invisible() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| el.x = 10.0);
        let change = ElementSetChange::calculate(&prev, &next);

        let mut live = next.clone();
        let version = live[&id("a")].version;
        assert!(!change.apply_to(&mut live));
        assert_eq!(live[&id("a")].version, version);
    }

    #[test]
    fn added_delta_recreates_unknown_element() {
        let next = map([rect("a").with_position(5.0, 6.0)]);
        let change = ElementSetChange::calculate(&ElementMap::new(), &next);

        let mut live = ElementMap::new();
        assert!(change.apply_to(&mut live));
        assert_eq!(live[&id("a")].x, 5.0);
        assert!(!live[&id("a")].is_deleted);
    }

    #[test]
    fn rebase_refreshes_plain_fields_only() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| {
            el.background_color = "blue".to_string();
            el.group_ids.push("g".into());
        });
        let change = ElementSetChange::calculate(&prev, &next);

        let mut remote = next.clone();
        mutate_element(&mut remote, &id("a"), |el| {
            el.background_color = "yellow".to_string();
            el.group_ids.clear();
        });
        let mut changed = ChangedFields::new();
        changed.insert(id("a"), changed_fields(&next[&id("a")], &remote[&id("a")]));

        let rebased = change.apply_latest_changes(&remote, &changed, DeltaSide::To);
        let delta = &rebased.updated()[&id("a")];
        assert_eq!(
            delta.to().get(&ElementField::BackgroundColor),
            Some(&ElementValue::Text("yellow".to_string()))
        );
        assert_eq!(
            delta.to().get(&ElementField::GroupIds),
            change.updated()[&id("a")].to().get(&ElementField::GroupIds)
        );
        assert_eq!(delta.from(), change.updated()[&id("a")].from());
    }

    #[test]
    fn rebase_leaves_fields_the_update_did_not_touch() {
        let prev = map([rect("a")]);
        let mut next = prev.clone();
        mutate_element(&mut next, &id("a"), |el| el.x = 10.0);
        let change = ElementSetChange::calculate(&prev, &next);

        // A later local edit moved the element again, then a collaborator
        // changed only its stroke.
        let mut live = next.clone();
        mutate_element(&mut live, &id("a"), |el| el.x = 20.0);
        let before_remote = live.clone();
        mutate_element(&mut live, &id("a"), |el| el.stroke_color = "green".to_string());

        let mut changed = ChangedFields::new();
        changed.insert(
            id("a"),
            changed_fields(&before_remote[&id("a")], &live[&id("a")]),
        );
        let rebased = change.apply_latest_changes(&live, &changed, DeltaSide::To);
        assert_eq!(rebased, change);

        let untouched = change.apply_latest_changes(&live, &ChangedFields::new(), DeltaSide::To);
        assert_eq!(untouched, change);
    }

    #[test]
    fn validate_flags_each_bucket() {
        let bad = Delta::new(deleted_partial(false), deleted_partial(true));
        let mut buckets = BTreeMap::new();
        buckets.insert(id("a"), bad);

        let change = ElementSetChange::create_with_mode(
            buckets.clone(),
            BTreeMap::new(),
            BTreeMap::new(),
            InvariantMode::Log,
        );
        assert_eq!(
            change.validate(),
            Err(ChangeInvariantError::AddedNotFromDeleted { id: id("a") })
        );

        let change = ElementSetChange::create_with_mode(
            BTreeMap::new(),
            BTreeMap::new(),
            buckets,
            InvariantMode::Log,
        );
        assert!(matches!(
            change.validate(),
            Err(ChangeInvariantError::UpdatedTogglesDeletion { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn fatal_mode_panics() {
        let bad = Delta::new(deleted_partial(true), deleted_partial(false));
        let mut removed = BTreeMap::new();
        removed.insert(id("a"), bad);
        let _ = ElementSetChange::create_with_mode(
            BTreeMap::new(),
            removed,
            BTreeMap::new(),
            InvariantMode::Fatal,
        );
    }
}
