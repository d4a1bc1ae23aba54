#![forbid(unsafe_code)]

//! View and selection state.
//!
//! Only the observed subset of [`ViewState`] participates in history: the
//! fields enumerated by [`ViewField`]. Scroll, zoom and the active tool are
//! carried for the host but never diffed, inverted or replayed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::delta::Record;
use crate::element::{ElementId, GroupId};

/// Live view state of one editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewState {
    // Observed by history.
    pub name: String,
    pub view_background_color: String,
    pub selected_element_ids: BTreeSet<ElementId>,
    pub selected_group_ids: BTreeSet<GroupId>,
    pub editing_group_id: Option<GroupId>,
    pub selected_linear_element_id: Option<ElementId>,
    pub editing_linear_element_id: Option<ElementId>,

    // Opaque to history.
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub zoom: f64,
    pub active_tool: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            name: String::new(),
            view_background_color: "#ffffff".to_string(),
            selected_element_ids: BTreeSet::new(),
            selected_group_ids: BTreeSet::new(),
            editing_group_id: None,
            selected_linear_element_id: None,
            editing_linear_element_id: None,
            scroll_x: 0.0,
            scroll_y: 0.0,
            zoom: 1.0,
            active_tool: "selection".to_string(),
        }
    }
}

impl ViewState {
    /// Select exactly `ids`.
    pub fn select<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = ElementId>,
    {
        self.selected_element_ids = ids.into_iter().collect();
    }
}

/// Observed view-state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewField {
    Name,
    ViewBackgroundColor,
    SelectedElementIds,
    SelectedGroupIds,
    EditingGroupId,
    SelectedLinearElementId,
    EditingLinearElementId,
}

impl ViewField {
    pub const ALL: &'static [ViewField] = &[
        Self::Name,
        Self::ViewBackgroundColor,
        Self::SelectedElementIds,
        Self::SelectedGroupIds,
        Self::EditingGroupId,
        Self::SelectedLinearElementId,
        Self::EditingLinearElementId,
    ];

    /// Fields whose visibility depends on the elements they reference.
    #[must_use]
    pub const fn is_element_relevant(self) -> bool {
        !matches!(self, Self::Name | Self::ViewBackgroundColor)
    }

    /// Set-valued fields stored as member differences in deltas.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::SelectedElementIds | Self::SelectedGroupIds)
    }
}

/// Value of a single [`ViewField`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewValue {
    Text(String),
    ElementIds(BTreeSet<ElementId>),
    GroupIds(BTreeSet<GroupId>),
    Group(Option<GroupId>),
    Element(Option<ElementId>),
}

impl Record for ViewState {
    type Field = ViewField;
    type Value = ViewValue;

    const FIELDS: &'static [ViewField] = ViewField::ALL;

    fn get(&self, field: ViewField) -> ViewValue {
        match field {
            ViewField::Name => ViewValue::Text(self.name.clone()),
            ViewField::ViewBackgroundColor => ViewValue::Text(self.view_background_color.clone()),
            ViewField::SelectedElementIds => ViewValue::ElementIds(self.selected_element_ids.clone()),
            ViewField::SelectedGroupIds => ViewValue::GroupIds(self.selected_group_ids.clone()),
            ViewField::EditingGroupId => ViewValue::Group(self.editing_group_id.clone()),
            ViewField::SelectedLinearElementId => {
                ViewValue::Element(self.selected_linear_element_id.clone())
            }
            ViewField::EditingLinearElementId => {
                ViewValue::Element(self.editing_linear_element_id.clone())
            }
        }
    }

    fn set(&mut self, field: ViewField, value: ViewValue) {
        match (field, value) {
            (ViewField::Name, ViewValue::Text(v)) => self.name = v,
            (ViewField::ViewBackgroundColor, ViewValue::Text(v)) => self.view_background_color = v,
            (ViewField::SelectedElementIds, ViewValue::ElementIds(v)) => {
                self.selected_element_ids = v;
            }
            (ViewField::SelectedGroupIds, ViewValue::GroupIds(v)) => self.selected_group_ids = v,
            (ViewField::EditingGroupId, ViewValue::Group(v)) => self.editing_group_id = v,
            (ViewField::SelectedLinearElementId, ViewValue::Element(v)) => {
                self.selected_linear_element_id = v;
            }
            (ViewField::EditingLinearElementId, ViewValue::Element(v)) => {
                self.editing_linear_element_id = v;
            }
            (field, value) => {
                tracing::warn!(
                    target: "sketch.history",
                    ?field,
                    ?value,
                    "ignoring view value of mismatched shape"
                );
            }
        }
    }
}
