#![forbid(unsafe_code)]

//! Versioned document elements.
//!
//! An [`Element`] is a soft-deletable record with a stable id, a monotonic
//! `version` and a random `version_nonce`. Elements are never physically
//! removed from an [`ElementMap`]; deletion flips `is_deleted`.
//!
//! Labels are text elements with a `container_id`; the container lists the
//! label in its `bound_elements`. Arrows bind to shapes through
//! `start_binding` / `end_binding` and are listed by the shape the same way.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::delta::Record;

/// Stable element identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Group identifier shared by grouped elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Shape of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Rectangle,
    Ellipse,
    Diamond,
    Text,
    Arrow,
    Line,
}

impl ElementKind {
    /// Text elements can be bound into a container as its label.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Shapes that can host a text label.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Rectangle | Self::Ellipse | Self::Diamond)
    }

    /// Elements made of points rather than a box.
    #[must_use]
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::Arrow | Self::Line)
    }
}

/// What kind of element a `bound_elements` entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundKind {
    Text,
    Arrow,
}

/// One entry of a container's `bound_elements` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundElement {
    pub id: ElementId,
    pub kind: BoundKind,
}

impl BoundElement {
    /// A text label entry.
    #[must_use]
    pub fn text(id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            kind: BoundKind::Text,
        }
    }

    /// An arrow entry.
    #[must_use]
    pub fn arrow(id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            kind: BoundKind::Arrow,
        }
    }
}

/// Id-keyed, insertion-ordered element store.
pub type ElementMap = IndexMap<ElementId, Element>;

/// A versioned document element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub stroke_color: String,
    pub background_color: String,
    pub stroke_width: f64,
    pub opacity: f64,
    pub text: String,
    pub font_size: f64,
    pub container_id: Option<ElementId>,
    pub bound_elements: Vec<BoundElement>,
    pub group_ids: Vec<GroupId>,
    pub start_binding: Option<ElementId>,
    pub end_binding: Option<ElementId>,
    pub locked: bool,
    pub link: Option<String>,
    pub custom_data: Option<serde_json::Value>,
    pub is_deleted: bool,
    pub version: u64,
    pub version_nonce: u32,
}

impl Element {
    /// A fresh, visible element with default styling.
    #[must_use]
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            angle: 0.0,
            stroke_color: "#1e1e1e".to_string(),
            background_color: "transparent".to_string(),
            stroke_width: 2.0,
            opacity: 100.0,
            text: String::new(),
            font_size: 20.0,
            container_id: None,
            bound_elements: Vec::new(),
            group_ids: Vec::new(),
            start_binding: None,
            end_binding: None,
            locked: false,
            link: None,
            custom_data: None,
            is_deleted: false,
            version: 1,
            version_nonce: rand::random(),
        }
    }

    /// Rebuild an element from a partial snapshot.
    ///
    /// Fields missing from `partial` keep their defaults.
    #[must_use]
    pub fn from_partial(id: ElementId, partial: &crate::delta::Partial<Element>) -> Self {
        let mut element = Self::new(id, ElementKind::default());
        crate::delta::apply_partial(&mut element, partial);
        element
    }

    #[must_use]
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = color.into();
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: impl Into<ElementId>) -> Self {
        self.container_id = Some(container.into());
        self
    }

    #[must_use]
    pub fn with_bound_element(mut self, bound: BoundElement) -> Self {
        self.bound_elements.push(bound);
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<GroupId>) -> Self {
        self.group_ids.push(group.into());
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, start: Option<ElementId>, end: Option<ElementId>) -> Self {
        self.start_binding = start;
        self.end_binding = end;
        self
    }

    /// Advance the version and draw a new nonce.
    pub fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
        self.version_nonce = rand::random();
    }

    /// `(version, version_nonce)`; a change in either signals a new write.
    #[must_use]
    pub const fn version_marker(&self) -> (u64, u32) {
        (self.version, self.version_nonce)
    }

    /// Id of the first bound text label, if any.
    #[must_use]
    pub fn bound_text_id(&self) -> Option<&ElementId> {
        self.bound_elements
            .iter()
            .find(|b| b.kind == BoundKind::Text)
            .map(|b| &b.id)
    }

    /// True if this element lists `id` in its bound elements.
    #[must_use]
    pub fn lists_bound(&self, id: &ElementId) -> bool {
        self.bound_elements.iter().any(|b| &b.id == id)
    }
}

/// Apply `f` to the element and bump its version.
///
/// Returns false when `id` is unknown.
pub fn mutate_element<F>(elements: &mut ElementMap, id: &ElementId, f: F) -> bool
where
    F: FnOnce(&mut Element),
{
    match elements.get_mut(id) {
        Some(element) => {
            f(element);
            element.bump_version();
            true
        }
        None => false,
    }
}

/// Insert (or replace) an element under its own id.
pub fn insert_element(elements: &mut ElementMap, element: Element) {
    elements.insert(element.id.clone(), element);
}

// ============================================================================
// Record
// ============================================================================

/// Diffable element fields.
///
/// `id`, `version` and `version_nonce` are bookkeeping and deliberately
/// absent: they must never be replayed by history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementField {
    Kind,
    X,
    Y,
    Width,
    Height,
    Angle,
    StrokeColor,
    BackgroundColor,
    StrokeWidth,
    Opacity,
    Text,
    FontSize,
    ContainerId,
    BoundElements,
    GroupIds,
    StartBinding,
    EndBinding,
    Locked,
    Link,
    CustomData,
    IsDeleted,
}

impl ElementField {
    pub const ALL: &'static [ElementField] = &[
        Self::Kind,
        Self::X,
        Self::Y,
        Self::Width,
        Self::Height,
        Self::Angle,
        Self::StrokeColor,
        Self::BackgroundColor,
        Self::StrokeWidth,
        Self::Opacity,
        Self::Text,
        Self::FontSize,
        Self::ContainerId,
        Self::BoundElements,
        Self::GroupIds,
        Self::StartBinding,
        Self::EndBinding,
        Self::Locked,
        Self::Link,
        Self::CustomData,
        Self::IsDeleted,
    ];

    /// Id-keyed list fields that are stored as member differences in deltas.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::BoundElements | Self::GroupIds)
    }

    /// Fields a rebase must never overwrite with the live value.
    #[must_use]
    pub const fn is_identity_sensitive(self) -> bool {
        matches!(
            self,
            Self::IsDeleted | Self::BoundElements | Self::GroupIds | Self::CustomData
        )
    }

    /// Fields whose change moves or reshapes the element's box.
    #[must_use]
    pub const fn is_geometry(self) -> bool {
        matches!(
            self,
            Self::X | Self::Y | Self::Width | Self::Height | Self::Angle
        )
    }
}

/// Value of a single [`ElementField`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Kind(ElementKind),
    Number(f64),
    Text(String),
    OptionalText(Option<String>),
    Ref(Option<ElementId>),
    Bindings(Vec<BoundElement>),
    Groups(Vec<GroupId>),
    Flag(bool),
    Custom(Option<serde_json::Value>),
}

impl ElementValue {
    /// Borrow the binding list, if this is one.
    #[must_use]
    pub fn as_bindings(&self) -> Option<&[BoundElement]> {
        match self {
            Self::Bindings(list) => Some(list),
            _ => None,
        }
    }

    /// Borrow the group list, if this is one.
    #[must_use]
    pub fn as_groups(&self) -> Option<&[GroupId]> {
        match self {
            Self::Groups(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl Record for Element {
    type Field = ElementField;
    type Value = ElementValue;

    const FIELDS: &'static [ElementField] = ElementField::ALL;

    fn get(&self, field: ElementField) -> ElementValue {
        use ElementField as F;
        use ElementValue as V;
        match field {
            F::Kind => V::Kind(self.kind),
            F::X => V::Number(self.x),
            F::Y => V::Number(self.y),
            F::Width => V::Number(self.width),
            F::Height => V::Number(self.height),
            F::Angle => V::Number(self.angle),
            F::StrokeColor => V::Text(self.stroke_color.clone()),
            F::BackgroundColor => V::Text(self.background_color.clone()),
            F::StrokeWidth => V::Number(self.stroke_width),
            F::Opacity => V::Number(self.opacity),
            F::Text => V::Text(self.text.clone()),
            F::FontSize => V::Number(self.font_size),
            F::ContainerId => V::Ref(self.container_id.clone()),
            F::BoundElements => V::Bindings(self.bound_elements.clone()),
            F::GroupIds => V::Groups(self.group_ids.clone()),
            F::StartBinding => V::Ref(self.start_binding.clone()),
            F::EndBinding => V::Ref(self.end_binding.clone()),
            F::Locked => V::Flag(self.locked),
            F::Link => V::OptionalText(self.link.clone()),
            F::CustomData => V::Custom(self.custom_data.clone()),
            F::IsDeleted => V::Flag(self.is_deleted),
        }
    }

    fn set(&mut self, field: ElementField, value: ElementValue) {
        use ElementField as F;
        use ElementValue as V;
        match (field, value) {
            (F::Kind, V::Kind(kind)) => self.kind = kind,
            (F::X, V::Number(v)) => self.x = v,
            (F::Y, V::Number(v)) => self.y = v,
            (F::Width, V::Number(v)) => self.width = v,
            (F::Height, V::Number(v)) => self.height = v,
            (F::Angle, V::Number(v)) => self.angle = v,
            (F::StrokeColor, V::Text(v)) => self.stroke_color = v,
            (F::BackgroundColor, V::Text(v)) => self.background_color = v,
            (F::StrokeWidth, V::Number(v)) => self.stroke_width = v,
            (F::Opacity, V::Number(v)) => self.opacity = v,
            (F::Text, V::Text(v)) => self.text = v,
            (F::FontSize, V::Number(v)) => self.font_size = v,
            (F::ContainerId, V::Ref(v)) => self.container_id = v,
            (F::BoundElements, V::Bindings(v)) => self.bound_elements = v,
            (F::GroupIds, V::Groups(v)) => self.group_ids = v,
            (F::StartBinding, V::Ref(v)) => self.start_binding = v,
            (F::EndBinding, V::Ref(v)) => self.end_binding = v,
            (F::Locked, V::Flag(v)) => self.locked = v,
            (F::Link, V::OptionalText(v)) => self.link = v,
            (F::CustomData, V::Custom(v)) => self.custom_data = v,
            (F::IsDeleted, V::Flag(v)) => self.is_deleted = v,
            (field, value) => {
                tracing::warn!(
                    target: "sketch.history",
                    element = %self.id,
                    ?field,
                    ?value,
                    "ignoring value of mismatched shape"
                );
            }
        }
    }

    fn same_value(field: ElementField, a: &ElementValue, b: &ElementValue) -> bool {
        match (field, a, b) {
            (ElementField::BoundElements, ElementValue::Bindings(a), ElementValue::Bindings(b)) => {
                a.len() == b.len() && a.iter().all(|member| b.contains(member))
            }
            _ => a == b,
        }
    }
}
