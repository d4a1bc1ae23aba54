#![forbid(unsafe_code)]

//! Binding-graph repair after an element set change is applied.
//!
//! Applying deltas element by element can leave the container/label and
//! shape/arrow graph one-sided: a label whose container is gone, a container
//! listing a label that points elsewhere, an arrow bound to a deleted shape.
//! [`repair_after_apply`] walks the ids touched by a change and fixes those
//! references against the live map, then recomputes label geometry.
//!
//! Repairs that only touch references are metadata and never count as
//! visible. Restoring or deleting an element and moving a label do.

use std::collections::BTreeSet;

use super::elements::{ElementDelta, ElementDeltas};
use crate::element::{
    BoundElement, BoundKind, Element, ElementField, ElementId, ElementMap, ElementValue,
};

/// Gap kept between a container's edge and its label.
pub const BOUND_TEXT_PADDING: f64 = 5.0;

/// Fit `label` into `container`: centered, no wider than the container
/// minus padding, rotated with it.
pub fn redraw_text_bounding_box(label: &mut Element, container: &Element) {
    let max_width = (container.width - 2.0 * BOUND_TEXT_PADDING).max(0.0);
    label.width = label.width.min(max_width);
    label.x = container.x + (container.width - label.width) / 2.0;
    label.y = container.y + (container.height - label.height) / 2.0;
    label.angle = container.angle;
}

/// Repair bindings around every element touched by a change.
///
/// Returns true if a repair produced a visible difference.
pub(crate) fn repair_after_apply(
    elements: &mut ElementMap,
    removed: &ElementDeltas,
    added: &ElementDeltas,
    updated: &ElementDeltas,
) -> bool {
    let mut repair = BindingRepair::new(elements);
    for id in removed.keys() {
        repair.after_deletion(id, added);
    }
    for id in added.keys() {
        repair.after_addition(id);
    }
    for (id, delta) in updated {
        repair.after_update(id, delta);
    }
    repair.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repair {
    /// Reference bookkeeping only.
    Metadata,
    /// Deletion, restore or geometry.
    Visual,
}

struct BindingRepair<'a> {
    elements: &'a mut ElementMap,
    redraw: BTreeSet<ElementId>,
    visible: bool,
}

impl<'a> BindingRepair<'a> {
    fn new(elements: &'a mut ElementMap) -> Self {
        Self {
            elements,
            redraw: BTreeSet::new(),
            visible: false,
        }
    }

    /// Run `f` on one element; bump its version if anything changed.
    fn edit<F>(&mut self, id: &ElementId, repair: Repair, f: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        let before = element.clone();
        f(element);
        if *element == before {
            return false;
        }
        element.bump_version();
        let touches_alive = !before.is_deleted || !element.is_deleted;
        if repair == Repair::Visual && touches_alive {
            self.visible = true;
        }
        tracing::trace!(
            target: "sketch.history",
            element = %id,
            ?repair,
            "repaired binding"
        );
        true
    }

    fn alive(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id).filter(|el| !el.is_deleted)
    }

    fn ids_where<P>(&self, predicate: P) -> Vec<ElementId>
    where
        P: Fn(&Element) -> bool,
    {
        self.elements
            .values()
            .filter(|el| predicate(*el))
            .map(|el| el.id.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Removed
    // ------------------------------------------------------------------

    fn after_deletion(&mut self, id: &ElementId, added: &ElementDeltas) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        if !element.is_deleted {
            return;
        }
        let kind = element.kind;

        // Labels follow their container; the reference stays so a later
        // restore can bring them back together.
        if kind.is_container() {
            let labels = self.ids_where(|el| {
                el.kind.is_text()
                    && !el.is_deleted
                    && el.container_id.as_ref() == Some(id)
                    && !added.contains_key(&el.id)
            });
            for label in labels {
                self.edit(&label, Repair::Visual, |el| el.is_deleted = true);
            }
        }

        let arrows = self.ids_where(|el| {
            el.start_binding.as_ref() == Some(id) || el.end_binding.as_ref() == Some(id)
        });
        for arrow in arrows {
            self.edit(&arrow, Repair::Metadata, |el| {
                if el.start_binding.as_ref() == Some(id) {
                    el.start_binding = None;
                }
                if el.end_binding.as_ref() == Some(id) {
                    el.end_binding = None;
                }
            });
        }

        if kind.is_linear() {
            let hosts = self.ids_where(|el| {
                el.bound_elements
                    .iter()
                    .any(|b| b.kind == BoundKind::Arrow && &b.id == id)
            });
            for host in hosts {
                self.edit(&host, Repair::Metadata, |el| {
                    el.bound_elements
                        .retain(|b| !(b.kind == BoundKind::Arrow && &b.id == id));
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Added
    // ------------------------------------------------------------------

    fn after_addition(&mut self, id: &ElementId) {
        let Some(element) = self.alive(id) else {
            return;
        };
        let kind = element.kind;
        let container = element.container_id.clone();

        if kind.is_text() {
            if let Some(container) = container {
                self.rebind_label(id, &container);
            }
        }
        if kind.is_linear() {
            self.rebind_arrow(id);
        }
        if !kind.is_text() {
            self.rebind_container(id);
        }
    }

    fn rebind_label(&mut self, label: &ElementId, container: &ElementId) {
        let Some(host) = self.elements.get(container) else {
            tracing::warn!(
                target: "sketch.history",
                label = %label,
                container = %container,
                "unbinding label from missing container"
            );
            self.edit(label, Repair::Metadata, |el| el.container_id = None);
            return;
        };
        if host.is_deleted {
            self.edit(container, Repair::Visual, |el| el.is_deleted = false);
        }
        self.edit(container, Repair::Metadata, |el| {
            if !el.lists_bound(label) {
                el.bound_elements.push(BoundElement::text(label.clone()));
            }
        });
        self.redraw.insert(label.clone());
    }

    fn rebind_arrow(&mut self, arrow: &ElementId) {
        let Some(element) = self.elements.get(arrow) else {
            return;
        };
        let targets = [element.start_binding.clone(), element.end_binding.clone()];

        for target in targets.into_iter().flatten() {
            if self.alive(&target).is_some() {
                self.edit(&target, Repair::Metadata, |el| {
                    if !el.lists_bound(arrow) {
                        el.bound_elements.push(BoundElement::arrow(arrow.clone()));
                    }
                });
            } else {
                tracing::debug!(
                    target: "sketch.history",
                    arrow = %arrow,
                    target_element = %target,
                    "clearing arrow binding to unavailable element"
                );
                self.edit(arrow, Repair::Metadata, |el| {
                    if el.start_binding.as_ref() == Some(&target) {
                        el.start_binding = None;
                    }
                    if el.end_binding.as_ref() == Some(&target) {
                        el.end_binding = None;
                    }
                });
            }
        }
    }

    fn rebind_container(&mut self, container: &ElementId) {
        let Some(element) = self.elements.get(container) else {
            return;
        };
        let entries = element.bound_elements.clone();

        let mut stale = Vec::new();
        for entry in &entries {
            let Some(bound) = self.elements.get(&entry.id) else {
                stale.push(entry.clone());
                continue;
            };
            match entry.kind {
                BoundKind::Text => {
                    if bound.container_id.as_ref() != Some(container) {
                        stale.push(entry.clone());
                    } else {
                        if bound.is_deleted {
                            self.edit(&entry.id, Repair::Visual, |el| el.is_deleted = false);
                        }
                        self.redraw.insert(entry.id.clone());
                    }
                }
                BoundKind::Arrow => {
                    let points_back = bound.start_binding.as_ref() == Some(container)
                        || bound.end_binding.as_ref() == Some(container);
                    if !points_back {
                        stale.push(entry.clone());
                    }
                }
            }
        }

        if !stale.is_empty() {
            tracing::warn!(
                target: "sketch.history",
                container = %container,
                dropped = stale.len(),
                "dropping dangling bound elements"
            );
            self.edit(container, Repair::Metadata, |el| {
                el.bound_elements.retain(|b| !stale.contains(b));
            });
        }
    }

    // ------------------------------------------------------------------
    // Updated
    // ------------------------------------------------------------------

    fn after_update(&mut self, id: &ElementId, delta: &ElementDelta) {
        let Some(element) = self.alive(id) else {
            return;
        };
        let kind = element.kind;
        let container = element.container_id.clone();
        let label = element.bound_text_id().cloned();

        let reshaped = delta.fields().any(ElementField::is_geometry);
        if let Some(label) = label {
            if reshaped || delta.touches(ElementField::BoundElements) {
                self.redraw.insert(label);
            }
        }

        if kind.is_text() {
            if let Some(container) = container {
                if self.alive(&container).is_some() {
                    self.rebind_label(id, &container);
                } else {
                    tracing::warn!(
                        target: "sketch.history",
                        label = %id,
                        container = %container,
                        "unbinding label from unavailable container"
                    );
                    self.edit(id, Repair::Metadata, |el| el.container_id = None);
                }
            }
        }

        if kind.is_linear()
            && (delta.touches(ElementField::StartBinding) || delta.touches(ElementField::EndBinding))
        {
            self.release_previous_targets(id, delta);
            self.rebind_arrow(id);
        }
    }

    /// Drop the arrow from shapes it was bound to before the update.
    fn release_previous_targets(&mut self, arrow: &ElementId, delta: &ElementDelta) {
        let Some(element) = self.elements.get(arrow) else {
            return;
        };
        let current = [element.start_binding.clone(), element.end_binding.clone()];

        let previous: Vec<ElementId> = [ElementField::StartBinding, ElementField::EndBinding]
            .iter()
            .filter_map(|field| match delta.from().get(field) {
                Some(ElementValue::Ref(Some(target))) => Some(target.clone()),
                _ => None,
            })
            .filter(|target| !current.contains(&Some(target.clone())))
            .collect();

        for target in previous {
            self.edit(&target, Repair::Metadata, |el| {
                el.bound_elements
                    .retain(|b| !(b.kind == BoundKind::Arrow && &b.id == arrow));
            });
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    fn finish(mut self) -> bool {
        let labels = std::mem::take(&mut self.redraw);
        for label in labels {
            let Some(container) = self
                .alive(&label)
                .and_then(|el| el.container_id.clone())
                .and_then(|container| self.alive(&container).cloned())
            else {
                continue;
            };
            self.edit(&label, Repair::Visual, |el| {
                redraw_text_bounding_box(el, &container);
            });
        }
        self.visible
    }
}
