//! Position arithmetic for dense ordered scopes.
//!
//! # Responsibility
//! - Compute which contiguous run of positions moves, and by how much, for
//!   insert, remove, and in-scope reposition.
//! - Validate caller-supplied positions and reorder sets.
//!
//! # Invariants
//! - Every plan, applied to a dense scope, yields a dense scope once the
//!   moved record is written to its new slot.
//! - Only records strictly between the old and new index are touched.

use std::collections::HashSet;
use std::hash::Hash;

/// Contiguous run `[from, to]` of positions shifted by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionShift {
    pub from: i64,
    pub to: i64,
    pub delta: i64,
}

impl PositionShift {
    fn new(from: i64, to: i64, delta: i64) -> Option<Self> {
        (from <= to).then_some(Self { from, to, delta })
    }

    /// Returns whether `position` falls inside the shifted run.
    pub fn covers(&self, position: i64) -> bool {
        (self.from..=self.to).contains(&position)
    }

    /// Returns the shifted value of `position`.
    pub fn apply(&self, position: i64) -> i64 {
        if self.covers(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// Shift that opens slot `at` in a scope of `len` records.
pub fn insertion_shift(at: i64, len: i64) -> Option<PositionShift> {
    PositionShift::new(at, len - 1, 1)
}

/// Shift that closes the gap left at `removed` in a scope that held `len`
/// records before the removal.
pub fn removal_shift(removed: i64, len: i64) -> Option<PositionShift> {
    PositionShift::new(removed + 1, len - 1, -1)
}

/// Shift for moving one record from `old` to `target` inside its scope.
///
/// Returns `None` when `old == target`.
pub fn reposition_shift(old: i64, target: i64) -> Option<PositionShift> {
    if old < target {
        PositionShift::new(old + 1, target, -1)
    } else if old > target {
        PositionShift::new(target, old - 1, 1)
    } else {
        None
    }
}

/// Returns `true` when the valid range is `0..=max` and `position` is in it.
pub fn within_slots(position: i64, max: i64) -> bool {
    (0..=max).contains(&position)
}

/// Returns whether `positions` is exactly `{0, .., n-1}`.
pub fn is_dense(positions: &[i64]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .zip(0_i64..)
        .all(|(position, expected)| *position == expected)
}

/// Reorder set problems, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermutationMismatch<T> {
    Length { expected: usize, actual: usize },
    Duplicate(T),
    Unknown(T),
}

/// Checks that `proposed` is a permutation of `current`.
pub fn check_permutation<T>(current: &[T], proposed: &[T]) -> Result<(), PermutationMismatch<T>>
where
    T: Copy + Eq + Hash,
{
    if current.len() != proposed.len() {
        return Err(PermutationMismatch::Length {
            expected: current.len(),
            actual: proposed.len(),
        });
    }

    let known: HashSet<T> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(proposed.len());
    for id in proposed {
        if !seen.insert(*id) {
            return Err(PermutationMismatch::Duplicate(*id));
        }
        if !known.contains(id) {
            return Err(PermutationMismatch::Unknown(*id));
        }
    }
    Ok(())
}
