#![forbid(unsafe_code)]

//! Reversible change to the observed view state.

use std::collections::BTreeSet;

use crate::config::GroupVisibility;
use crate::delta::{Delta, DeltaSide, Partial, merge_set, set_difference};
use crate::element::{ElementId, ElementMap, GroupId};
use crate::view_state::{ViewField, ViewState, ViewValue};

/// A [`Delta`] over the observed subset of [`ViewState`].
///
/// Selection sets are stored as member differences (`from` holds members
/// that were deselected, `to` holds members that were selected), so that
/// applying the change merges into whatever the live selection is instead
/// of overwriting it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewStateChange {
    delta: Delta<ViewState>,
}

impl ViewStateChange {
    /// A change that does nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an explicit delta.
    #[must_use]
    pub fn new(delta: Delta<ViewState>) -> Self {
        Self { delta }
    }

    /// Diff two view states over the observed fields.
    #[must_use]
    pub fn calculate(prev: &ViewState, next: &ViewState) -> Self {
        Self {
            delta: Delta::calculate_with(prev, next, reduce_selection_differences),
        }
    }

    /// The underlying delta.
    #[must_use]
    pub fn delta(&self) -> &Delta<ViewState> {
        &self.delta
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            delta: self.delta.inverse(),
        }
    }

    /// Apply the `to` side onto `view`.
    ///
    /// Returns whether the change is visible against `elements` (which
    /// should already reflect the element half of the same history entry).
    pub fn apply_to(
        &self,
        view: &mut ViewState,
        elements: &ElementMap,
        groups: GroupVisibility,
    ) -> bool {
        let from = self.delta.from();
        let to = self.delta.to();

        for field in self.delta.fields() {
            match field {
                ViewField::SelectedElementIds => {
                    let added = element_ids(to.get(&field));
                    let removed = element_ids(from.get(&field));
                    view.selected_element_ids =
                        merge_set(&view.selected_element_ids, &added, &removed);
                }
                ViewField::SelectedGroupIds => {
                    let added = group_ids(to.get(&field));
                    let removed = group_ids(from.get(&field));
                    view.selected_group_ids = merge_set(&view.selected_group_ids, &added, &removed);
                }
                _ => {
                    if let Some(value) = to.get(&field) {
                        crate::delta::Record::set(view, field, value.clone());
                    }
                }
            }
        }

        self.contains_visible_difference(elements, groups)
    }

    /// Whether applying this change is observable.
    ///
    /// Name and background changes are always visible. Element references
    /// are visible when at least one referenced element is alive. Group
    /// references follow `groups`.
    #[must_use]
    pub fn contains_visible_difference(
        &self,
        elements: &ElementMap,
        groups: GroupVisibility,
    ) -> bool {
        let from = self.delta.from();
        let to = self.delta.to();

        self.delta.fields().any(|field| {
            if !field.is_element_relevant() {
                return true;
            }
            let values = [from.get(&field), to.get(&field)];
            match field {
                ViewField::SelectedElementIds
                | ViewField::SelectedLinearElementId
                | ViewField::EditingLinearElementId => values
                    .into_iter()
                    .flatten()
                    .flat_map(referenced_elements)
                    .any(|id| is_alive(elements, &id)),
                ViewField::SelectedGroupIds | ViewField::EditingGroupId => match groups {
                    GroupVisibility::Always => true,
                    GroupVisibility::Precise => values
                        .into_iter()
                        .flatten()
                        .flat_map(referenced_groups)
                        .any(|group| group_is_alive(elements, &group)),
                },
                ViewField::Name | ViewField::ViewBackgroundColor => true,
            }
        })
    }

    /// Refresh one side with the live values of `view` for the fields in
    /// `changed`.
    ///
    /// Selection sets are differences, not snapshots, and are kept.
    #[must_use]
    pub fn apply_latest_changes(
        &self,
        view: &ViewState,
        changed: &BTreeSet<ViewField>,
        side: DeltaSide,
    ) -> Self {
        Self {
            delta: self.delta.with_latest(side, view, |field| {
                field.is_reference() || !changed.contains(&field)
            }),
        }
    }
}

fn reduce_selection_differences(from: &mut Partial<ViewState>, to: &mut Partial<ViewState>) {
    let elements = match (
        from.get(&ViewField::SelectedElementIds),
        to.get(&ViewField::SelectedElementIds),
    ) {
        (Some(ViewValue::ElementIds(prev)), Some(ViewValue::ElementIds(next))) => {
            Some((set_difference(prev, next), set_difference(next, prev)))
        }
        _ => None,
    };
    if let Some((removed, added)) = elements {
        from.insert(ViewField::SelectedElementIds, ViewValue::ElementIds(removed));
        to.insert(ViewField::SelectedElementIds, ViewValue::ElementIds(added));
    }

    let groups = match (
        from.get(&ViewField::SelectedGroupIds),
        to.get(&ViewField::SelectedGroupIds),
    ) {
        (Some(ViewValue::GroupIds(prev)), Some(ViewValue::GroupIds(next))) => {
            Some((set_difference(prev, next), set_difference(next, prev)))
        }
        _ => None,
    };
    if let Some((removed, added)) = groups {
        from.insert(ViewField::SelectedGroupIds, ViewValue::GroupIds(removed));
        to.insert(ViewField::SelectedGroupIds, ViewValue::GroupIds(added));
    }
}

fn element_ids(value: Option<&ViewValue>) -> BTreeSet<ElementId> {
    match value {
        Some(ViewValue::ElementIds(ids)) => ids.clone(),
        _ => BTreeSet::new(),
    }
}

fn group_ids(value: Option<&ViewValue>) -> BTreeSet<GroupId> {
    match value {
        Some(ViewValue::GroupIds(ids)) => ids.clone(),
        _ => BTreeSet::new(),
    }
}

fn referenced_elements(value: &ViewValue) -> Vec<ElementId> {
    match value {
        ViewValue::ElementIds(ids) => ids.iter().cloned().collect(),
        ViewValue::Element(Some(id)) => vec![id.clone()],
        _ => Vec::new(),
    }
}

fn referenced_groups(value: &ViewValue) -> Vec<GroupId> {
    match value {
        ViewValue::GroupIds(ids) => ids.iter().cloned().collect(),
        ViewValue::Group(Some(id)) => vec![id.clone()],
        _ => Vec::new(),
    }
}

fn is_alive(elements: &ElementMap, id: &ElementId) -> bool {
    elements.get(id).is_some_and(|el| !el.is_deleted)
}

fn group_is_alive(elements: &ElementMap, group: &GroupId) -> bool {
    elements
        .values()
        .any(|el| !el.is_deleted && el.group_ids.contains(group))
}
