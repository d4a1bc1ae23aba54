#![forbid(unsafe_code)]

//! Structural deltas over closed-field records.
//!
//! A [`Delta`] captures, for one record type, the subset of fields whose
//! values differ between a `from` and a `to` snapshot, together with the two
//! partial snapshots themselves. Everything else in the crate (view-state
//! changes, element-set changes, history entries) is built from deltas.
//!
//! Records opt in by implementing [`Record`]: a closed enumeration of the
//! fields that participate in diffing, plus get/set accessors over a value
//! enum. Fields that are not enumerated (identifiers, version counters) can
//! never appear in a delta and so can never be replayed.
//!
//! # Invariants
//!
//! 1. A field appears in `from`/`to` only if the two values differed under
//!    [`Record::same_value`] when the delta was calculated.
//! 2. A delta is never mutated after construction; rebasing produces a new one.
//!
//! ```text
//! prev  { x: 1, y: 2, color: red  }
//! next  { x: 1, y: 5, color: blue }
//!
//! from  {       y: 2, color: red  }
//! to    {       y: 5, color: blue }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A record with a closed, compile-time enumeration of diffable fields.
pub trait Record: Clone {
    /// Field selector.
    type Field: Copy + Ord + fmt::Debug + 'static;
    /// Value carried by any one field.
    type Value: Clone + PartialEq + fmt::Debug;

    /// Every field that participates in diffing, in a stable order.
    const FIELDS: &'static [Self::Field];

    /// Read a field.
    fn get(&self, field: Self::Field) -> Self::Value;

    /// Write a field. Values of the wrong shape for `field` are ignored.
    fn set(&mut self, field: Self::Field, value: Self::Value);

    /// Declared comparison strategy for a field.
    ///
    /// Defaults to exact equality. Set-like fields override this to compare
    /// members regardless of order.
    fn same_value(field: Self::Field, a: &Self::Value, b: &Self::Value) -> bool {
        let _ = field;
        a == b
    }
}

/// A partial snapshot of a record: only some fields are present.
pub type Partial<R> = BTreeMap<<R as Record>::Field, <R as Record>::Value>;

/// Selects one side of a [`Delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaSide {
    /// The state before the change.
    From,
    /// The state after the change.
    To,
}

/// Before/after diff restricted to changed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta<R: Record> {
    from: Partial<R>,
    to: Partial<R>,
}

impl<R: Record> Default for Delta<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: Record> Delta<R> {
    /// Compose a delta from two explicit partials.
    #[must_use]
    pub fn new(from: Partial<R>, to: Partial<R>) -> Self {
        Self { from, to }
    }

    /// A delta with no fields on either side.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            from: BTreeMap::new(),
            to: BTreeMap::new(),
        }
    }

    /// Diff two full records.
    #[must_use]
    pub fn calculate(prev: &R, next: &R) -> Self {
        Self::calculate_with(prev, next, |_, _| {})
    }

    /// Diff two full records, then run `postprocess` over both partials
    /// before the delta is frozen.
    pub fn calculate_with<F>(prev: &R, next: &R, postprocess: F) -> Self
    where
        F: FnOnce(&mut Partial<R>, &mut Partial<R>),
    {
        let mut from = BTreeMap::new();
        let mut to = BTreeMap::new();

        for &field in R::FIELDS {
            let before = prev.get(field);
            let after = next.get(field);
            if !R::same_value(field, &before, &after) {
                from.insert(field, before);
                to.insert(field, after);
            }
        }

        postprocess(&mut from, &mut to);
        Self { from, to }
    }

    /// The "before" partial.
    #[must_use]
    pub fn from(&self) -> &Partial<R> {
        &self.from
    }

    /// The "after" partial.
    #[must_use]
    pub fn to(&self) -> &Partial<R> {
        &self.to
    }

    /// One side of the delta.
    #[must_use]
    pub fn side(&self, side: DeltaSide) -> &Partial<R> {
        match side {
            DeltaSide::From => &self.from,
            DeltaSide::To => &self.to,
        }
    }

    /// True iff both partials are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }

    /// True if either side mentions `field`.
    #[must_use]
    pub fn touches(&self, field: R::Field) -> bool {
        self.from.contains_key(&field) || self.to.contains_key(&field)
    }

    /// Every field mentioned on either side, in field order.
    pub fn fields(&self) -> impl Iterator<Item = R::Field> + '_ {
        let keys: BTreeSet<R::Field> = self.from.keys().chain(self.to.keys()).copied().collect();
        keys.into_iter()
    }

    /// Swap `from` and `to`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Rebase one side onto the latest known state of the record.
    ///
    /// Every field present on `side` is replaced by its current value in
    /// `latest`, except fields for which `keep` returns true. The other side
    /// is left untouched.
    #[must_use]
    pub fn with_latest<K>(&self, side: DeltaSide, latest: &R, keep: K) -> Self
    where
        K: Fn(R::Field) -> bool,
    {
        let refresh = |partial: &Partial<R>| -> Partial<R> {
            partial
                .iter()
                .map(|(&field, value)| {
                    if keep(field) {
                        (field, value.clone())
                    } else {
                        (field, latest.get(field))
                    }
                })
                .collect()
        };

        match side {
            DeltaSide::From => Self {
                from: refresh(&self.from),
                to: self.to.clone(),
            },
            DeltaSide::To => Self {
                from: self.from.clone(),
                to: refresh(&self.to),
            },
        }
    }

    /// True iff at least one field of `left` is absent from, or holds a
    /// different value in, `right`.
    #[must_use]
    pub fn is_left_different(left: &Partial<R>, right: &Partial<R>) -> bool {
        left.iter().any(|(field, value)| match right.get(field) {
            Some(other) => !R::same_value(*field, value, other),
            None => true,
        })
    }

    /// Mirror of [`Delta::is_left_different`], driven by the keys of `right`.
    #[must_use]
    pub fn is_right_different(left: &Partial<R>, right: &Partial<R>) -> bool {
        Self::is_left_different(right, left)
    }
}

/// Fields whose values differ between two full records.
#[must_use]
pub fn changed_fields<R: Record>(prev: &R, next: &R) -> BTreeSet<R::Field> {
    R::FIELDS
        .iter()
        .copied()
        .filter(|&field| !R::same_value(field, &prev.get(field), &next.get(field)))
        .collect()
}

/// Overwrite every field of `partial` onto `record`.
pub fn apply_partial<R: Record>(record: &mut R, partial: &Partial<R>) {
    for (field, value) in partial {
        record.set(*field, value.clone());
    }
}

/// Merge member lists: drop `removed` from `prev`, then overlay `added`.
///
/// Members of `prev` keep their relative order; `added` members not already
/// present are appended in their own order.
#[must_use]
pub fn merge_members<T: Clone + PartialEq>(prev: &[T], added: &[T], removed: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = prev
        .iter()
        .filter(|member| !removed.contains(member))
        .cloned()
        .collect();
    for member in added {
        if !merged.contains(member) {
            merged.push(member.clone());
        }
    }
    merged
}

/// Set flavour of [`merge_members`].
#[must_use]
pub fn merge_set<T: Clone + Ord>(
    prev: &BTreeSet<T>,
    added: &BTreeSet<T>,
    removed: &BTreeSet<T>,
) -> BTreeSet<T> {
    prev.difference(removed).chain(added.iter()).cloned().collect()
}

/// Members of `a` that are not in `b`, in `a`'s order.
#[must_use]
pub fn member_difference<T: Clone + PartialEq>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().filter(|m| !b.contains(m)).cloned().collect()
}

/// Members of `a` that are not in `b`.
#[must_use]
pub fn set_difference<T: Clone + Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.difference(b).cloned().collect()
}
