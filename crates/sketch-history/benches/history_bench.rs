//! Benchmarks for element-set diffing and undo/redo application.
//!
//! Run with: cargo bench -p sketch-history --bench history_bench
//!
//! Scenes hold N rectangles; one edit touches every tenth element.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use sketch_history::{
    Element, ElementKind, ElementMap, ElementSetChange, HistoryConfig, HistoryEntry,
    HistoryStack, ViewState, ViewStateChange, insert_element, mutate_element,
};

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn scene(count: usize) -> ElementMap {
    let mut elements = ElementMap::new();
    for i in 0..count {
        insert_element(
            &mut elements,
            Element::new(format!("e{i}"), ElementKind::Rectangle),
        );
    }
    elements
}

fn edited(prev: &ElementMap) -> ElementMap {
    let mut next = prev.clone();
    let ids: Vec<_> = next.keys().step_by(10).cloned().collect();
    for id in ids {
        mutate_element(&mut next, &id, |el| {
            el.x += 5.0;
            el.background_color = "red".to_string();
        });
    }
    next
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_set_change/calculate");
    for &size in SIZES {
        let prev = scene(size);
        let next = edited(&prev);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ElementSetChange::calculate(black_box(&prev), black_box(&next)));
        });
    }
    group.finish();
}

fn bench_undo_redo(c: &mut Criterion) {
    let mut group = c.benchmark_group("history/undo_redo");
    for &size in SIZES {
        let prev = scene(size);
        let next = edited(&prev);
        let entry = HistoryEntry::new(
            ViewStateChange::empty(),
            ElementSetChange::calculate(&prev, &next),
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut stack = HistoryStack::new(HistoryConfig::unlimited());
            stack.push(entry.clone());
            let mut elements = next.clone();
            let mut view = ViewState::default();
            b.iter(|| {
                black_box(stack.undo(&mut elements, &mut view));
                black_box(stack.redo(&mut elements, &mut view));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_calculate, bench_undo_redo);
criterion_main!(benches);
