#![forbid(unsafe_code)]

//! Property tests for change and history invariants.
//!
//! Validates:
//! - `inverse` is an involution on calculated element-set changes.
//! - Calculated changes and their inverses satisfy the bucket contracts.
//! - Applying a change forward reproduces the edited map; applying its
//!   inverse restores the original fields.
//! - Random push/undo/redo sequences track a reference model and never
//!   exceed the depth limit.
//! - Any sequence of container creation, label binding, undo, redo and
//!   remote container deletion leaves no one-sided label binding.

use proptest::prelude::*;

use sketch_history::{
    BoundElement, Document, Element, ElementId, ElementKind, ElementMap, ElementSetChange,
    HistoryConfig, HistoryEntry, HistoryStack, InvariantMode, Record, RemoteUpdate,
    StoreAction, ViewState, ViewStateChange, insert_element, mutate_element,
};

// ============================================================================
// Strategy helpers
// ============================================================================

const COLORS: &[&str] = &["transparent", "red", "blue", "yellow"];
const KINDS: &[ElementKind] = &[
    ElementKind::Rectangle,
    ElementKind::Ellipse,
    ElementKind::Diamond,
];

/// Local edits that can be made to a scene of unbound shapes.
#[derive(Debug, Clone)]
enum Edit {
    Move(usize, i16, i16),
    Paint(usize, usize),
    Delete(usize),
    Restore(usize),
    Drop(usize),
    Add(usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (any::<usize>(), any::<i16>(), any::<i16>()).prop_map(|(i, x, y)| Edit::Move(i, x, y)),
        3 => (any::<usize>(), 0..COLORS.len()).prop_map(|(i, c)| Edit::Paint(i, c)),
        1 => any::<usize>().prop_map(Edit::Delete),
        1 => any::<usize>().prop_map(Edit::Restore),
        1 => any::<usize>().prop_map(Edit::Drop),
        2 => (0..KINDS.len()).prop_map(Edit::Add),
    ]
}

fn scene(count: usize) -> ElementMap {
    let mut elements = ElementMap::new();
    for i in 0..count {
        insert_element(
            &mut elements,
            Element::new(format!("e{i}"), KINDS[i % KINDS.len()]),
        );
    }
    elements
}

fn apply_edits(elements: &mut ElementMap, edits: &[Edit]) {
    for (step, edit) in edits.iter().enumerate() {
        if let Edit::Add(kind) = edit {
            insert_element(elements, Element::new(format!("n{step}"), KINDS[*kind]));
            continue;
        }
        if elements.is_empty() {
            continue;
        }
        let len = elements.len();
        match *edit {
            Edit::Move(i, x, y) => {
                let id = elements[i % len].id.clone();
                mutate_element(elements, &id, |el| {
                    el.x = f64::from(x);
                    el.y = f64::from(y);
                });
            }
            Edit::Paint(i, c) => {
                let id = elements[i % len].id.clone();
                mutate_element(elements, &id, |el| el.background_color = COLORS[c].into());
            }
            Edit::Delete(i) => {
                let id = elements[i % len].id.clone();
                mutate_element(elements, &id, |el| el.is_deleted = true);
            }
            Edit::Restore(i) => {
                let id = elements[i % len].id.clone();
                mutate_element(elements, &id, |el| el.is_deleted = false);
            }
            Edit::Drop(i) => {
                elements.shift_remove_index(i % len);
            }
            Edit::Add(_) => {}
        }
    }
}

fn same_fields(a: &Element, b: &Element) -> bool {
    Element::FIELDS
        .iter()
        .all(|&field| Element::same_value(field, &a.get(field), &b.get(field)))
}

fn edited_pair() -> impl Strategy<Value = (ElementMap, ElementMap)> {
    (1usize..6, prop::collection::vec(edit_strategy(), 1..20)).prop_map(|(count, edits)| {
        let prev = scene(count);
        let mut next = prev.clone();
        apply_edits(&mut next, &edits);
        (prev, next)
    })
}

// ============================================================================
// Invariant 1: inverse is an involution and keeps the bucket contracts
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn inverse_is_involution((prev, next) in edited_pair()) {
        let change = ElementSetChange::calculate_with_mode(&prev, &next, InvariantMode::Log);
        prop_assert_eq!(change.inverse().inverse(), change.clone());
        prop_assert!(change.validate().is_ok());
        prop_assert!(change.inverse().validate().is_ok());
    }
}

// ============================================================================
// Invariant 2: forward apply reproduces, inverse apply restores
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn apply_reproduces_next((prev, next) in edited_pair()) {
        let change = ElementSetChange::calculate_with_mode(&prev, &next, InvariantMode::Log);
        let mut live = prev.clone();
        change.apply_to(&mut live);

        for (id, expected) in &next {
            match live.get(id) {
                Some(actual) => prop_assert!(same_fields(actual, expected), "{} differs", id),
                None => prop_assert!(expected.is_deleted, "{} missing", id),
            }
        }
        for (id, element) in &prev {
            if !next.contains_key(id) {
                prop_assert!(live[id].is_deleted);
                prop_assert_eq!(live[id].x, element.x);
            }
        }
    }

    #[test]
    fn inverse_restores_prev((prev, next) in edited_pair()) {
        let change = ElementSetChange::calculate_with_mode(&prev, &next, InvariantMode::Log);
        let mut live = next.clone();
        change.inverse().apply_to(&mut live);

        for (id, expected) in &prev {
            prop_assert!(live.contains_key(id), "{} not restored", id);
            prop_assert!(same_fields(&live[id], expected), "{} differs", id);
        }
        for (id, element) in &live {
            if !prev.contains_key(id) {
                prop_assert!(element.is_deleted, "{} survived undo", id);
            }
        }
    }
}

// ============================================================================
// Invariant 3: history stack tracks a reference model
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push(i16),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-4i16..4).prop_map(Op::Push),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn stack_tracks_model(
        max_depth in 1usize..6,
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let mut stack = HistoryStack::new(HistoryConfig::new(max_depth));
        let mut elements = scene(1);
        let mut view = ViewState::default();
        let target = elements[0].id.clone();

        let mut current = 0.0_f64;
        let mut undo_model: Vec<(f64, f64)> = Vec::new();
        let mut redo_model: Vec<(f64, f64)> = Vec::new();

        for op in ops {
            match op {
                Op::Push(x) => {
                    let next = f64::from(x);
                    let prev = elements.clone();
                    mutate_element(&mut elements, &target, |el| el.x = next);
                    stack.push(HistoryEntry::new(
                        ViewStateChange::empty(),
                        ElementSetChange::calculate(&prev, &elements),
                    ));

                    redo_model.clear();
                    if next != current {
                        undo_model.push((current, next));
                        if undo_model.len() > max_depth {
                            undo_model.remove(0);
                        }
                        current = next;
                    }
                    prop_assert_eq!(stack.redo_depth(), 0);
                }
                Op::Undo => {
                    let step = stack.undo(&mut elements, &mut view);
                    match undo_model.pop() {
                        Some((from, to)) => {
                            prop_assert!(step.is_some_and(|s| s.visible && s.entries == 1));
                            current = from;
                            redo_model.push((from, to));
                        }
                        None => prop_assert!(step.is_none()),
                    }
                }
                Op::Redo => {
                    let step = stack.redo(&mut elements, &mut view);
                    match redo_model.pop() {
                        Some((from, to)) => {
                            prop_assert!(step.is_some_and(|s| s.visible && s.entries == 1));
                            current = to;
                            undo_model.push((from, to));
                        }
                        None => prop_assert!(step.is_none()),
                    }
                }
            }

            prop_assert_eq!(elements[&target].x, current);
            prop_assert_eq!(stack.undo_depth(), undo_model.len());
            prop_assert_eq!(stack.redo_depth(), redo_model.len());
            prop_assert!(stack.undo_depth() <= max_depth);
        }
    }
}

// ============================================================================
// Invariant 4: container/label bindings stay two-sided
// ============================================================================

#[derive(Debug, Clone)]
enum BindingOp {
    CreateContainer,
    BindLabel,
    Undo,
    Redo,
    RemoteDeleteContainer,
}

fn binding_op_strategy() -> impl Strategy<Value = BindingOp> {
    prop_oneof![
        2 => Just(BindingOp::CreateContainer),
        3 => Just(BindingOp::BindLabel),
        3 => Just(BindingOp::Undo),
        3 => Just(BindingOp::Redo),
        2 => Just(BindingOp::RemoteDeleteContainer),
    ]
}

fn alive<'a>(doc: &'a Document, id: &ElementId) -> Option<&'a Element> {
    doc.elements().get(id).filter(|el| !el.is_deleted)
}

fn run_binding_op(doc: &mut Document, op: &BindingOp) {
    let container = ElementId::from("box");
    let label = ElementId::from("label");

    match op {
        BindingOp::CreateContainer => {
            let state = doc.elements().get(&container).map(|el| el.is_deleted);
            doc.mutate(StoreAction::Capture, |els, _| match state {
                None => insert_element(
                    els,
                    Element::new("box", ElementKind::Rectangle).with_size(120.0, 60.0),
                ),
                Some(true) => {
                    mutate_element(els, &container, |el| el.is_deleted = false);
                }
                Some(false) => {}
            });
        }
        BindingOp::BindLabel => {
            let Some(host) = alive(doc, &container) else {
                return;
            };
            let listed = host.lists_bound(&label);
            let bound =
                alive(doc, &label).is_some_and(|el| el.container_id.as_ref() == Some(&container));
            if bound {
                return;
            }
            let exists = doc.elements().contains_key(&label);
            doc.mutate(StoreAction::Capture, |els, _| {
                if exists {
                    mutate_element(els, &label, |el| {
                        el.is_deleted = false;
                        el.container_id = Some(container.clone());
                    });
                } else {
                    insert_element(
                        els,
                        Element::new("label", ElementKind::Text)
                            .with_size(30.0, 20.0)
                            .with_container("box"),
                    );
                }
                if !listed {
                    mutate_element(els, &container, |el| {
                        el.bound_elements.push(BoundElement::text("label"));
                    });
                }
            });
        }
        BindingOp::Undo => {
            doc.undo();
        }
        BindingOp::Redo => {
            doc.redo();
        }
        BindingOp::RemoteDeleteContainer => {
            let Some(host) = alive(doc, &container) else {
                return;
            };
            // A collaborator's editor deletes bound text with its container.
            let mut update = vec![host.clone()];
            if let Some(text) =
                alive(doc, &label).filter(|el| el.container_id.as_ref() == Some(&container))
            {
                update.push(text.clone());
            }
            for element in &mut update {
                element.is_deleted = true;
                element.bump_version();
            }
            doc.apply_remote(RemoteUpdate::elements(update));
        }
    }
}

/// The first alive label whose container is missing, deleted, or does not
/// list it back.
fn dangling_label(elements: &ElementMap) -> Option<ElementId> {
    elements
        .values()
        .filter(|el| !el.is_deleted && el.kind.is_text())
        .find(|label| {
            label.container_id.as_ref().is_some_and(|container| {
                elements
                    .get(container)
                    .is_none_or(|host| host.is_deleted || !host.lists_bound(&label.id))
            })
        })
        .map(|label| label.id.clone())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn bindings_stay_two_sided(ops in prop::collection::vec(binding_op_strategy(), 1..40)) {
        let mut doc = Document::new(HistoryConfig::default());
        for op in &ops {
            run_binding_op(&mut doc, op);
            let dangling = dangling_label(doc.elements());
            prop_assert!(dangling.is_none(), "{:?} dangles after {:?}", dangling, op);
        }
    }
}
