//! Advisory locks keyed by ordering scope.
//!
//! # Responsibility
//! - Serialize mutations on the same scope (a board's column list, or one
//!   column's placement list) across all connections of one process.
//! - Bound the wait with a timeout instead of blocking indefinitely.
//!
//! # Invariants
//! - A lock set is granted all at once or not at all, so a waiter never holds
//!   part of its set.
//! - Keys are sorted before use: board scopes precede column scopes, columns
//!   ascend by id.
//! - Dropping a [`ScopeGuard`] releases its whole set and wakes waiters.

use crate::model::board::{BoardId, ColumnId};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One ordering scope.
///
/// Variant order defines lock order: every `Board` key sorts before every
/// `Column` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    Board(BoardId),
    Column(ColumnId),
}

impl Display for ScopeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Board(id) => write!(f, "board:{id}"),
            Self::Column(id) => write!(f, "column:{id}"),
        }
    }
}

/// Process-wide registry of held scope keys.
#[derive(Debug, Default)]
pub struct ScopeLockRegistry {
    held: Mutex<HashSet<ScopeKey>>,
    released: Condvar,
}

/// RAII guard for one granted lock set.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    registry: &'a ScopeLockRegistry,
    keys: Vec<ScopeKey>,
}

impl ScopeLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every key in `scopes` within `timeout`.
    ///
    /// # Errors
    /// - Returns the first still-held key when the timeout elapses.
    pub fn acquire(
        &self,
        scopes: &[ScopeKey],
        timeout: Duration,
    ) -> Result<ScopeGuard<'_>, ScopeKey> {
        let mut keys = scopes.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let Some(blocked) = keys.iter().find(|key| held.contains(key)).copied() else {
                held.extend(keys.iter().copied());
                return Ok(ScopeGuard {
                    registry: self,
                    keys,
                });
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(blocked);
            }
            let (next, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            held = next;
        }
    }

    /// Returns whether `key` is currently held by any guard.
    pub fn is_held(&self, key: &ScopeKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

impl ScopeGuard<'_> {
    /// Keys held by this guard, in lock order.
    pub fn keys(&self) -> &[ScopeKey] {
        &self.keys
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .registry
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.registry.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::{ScopeKey, ScopeLockRegistry};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn keys_are_sorted_board_first() {
        let registry = ScopeLockRegistry::new();
        let board = ScopeKey::Board(Uuid::new_v4());
        let low = ScopeKey::Column(Uuid::from_u128(1));
        let high = ScopeKey::Column(Uuid::from_u128(2));

        let guard = registry
            .acquire(&[high, board, low, high], Duration::from_millis(10))
            .expect("free keys are granted");
        assert_eq!(guard.keys(), &[board, low, high]);
    }

    #[test]
    fn held_key_times_out_and_reports_blocker() {
        let registry = ScopeLockRegistry::new();
        let board = ScopeKey::Board(Uuid::new_v4());
        let column = ScopeKey::Column(Uuid::new_v4());

        let _first = registry
            .acquire(&[column], Duration::from_millis(10))
            .expect("first acquire");
        let blocked = registry
            .acquire(&[board, column], Duration::from_millis(30))
            .expect_err("overlapping set must time out");
        assert_eq!(blocked, column);
        assert!(!registry.is_held(&board), "partial sets are never held");
    }

    #[test]
    fn disjoint_sets_are_granted_concurrently() {
        let registry = ScopeLockRegistry::new();
        let _a = registry
            .acquire(&[ScopeKey::Board(Uuid::new_v4())], Duration::from_millis(10))
            .expect("first board");
        let _b = registry
            .acquire(&[ScopeKey::Board(Uuid::new_v4())], Duration::from_millis(10))
            .expect("second board");
    }

    #[test]
    fn release_wakes_waiter() {
        let registry = Arc::new(ScopeLockRegistry::new());
        let key = ScopeKey::Board(Uuid::new_v4());
        let guard = registry
            .acquire(&[key], Duration::from_millis(10))
            .expect("first acquire");

        let waiter = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || -> Result<Vec<ScopeKey>, ScopeKey> {
                let guard = registry.acquire(&[key], Duration::from_secs(5))?;
                let keys = guard.keys().to_vec();
                drop(guard);
                Ok(keys)
            })
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);

        let keys = waiter
            .join()
            .expect("waiter thread")
            .expect("waiter acquires after release");
        assert_eq!(keys, vec![key]);
        assert!(!registry.is_held(&key));
    }
}
