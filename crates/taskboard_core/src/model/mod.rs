//! Domain model for boards, columns and task placements.
//!
//! # Responsibility
//! - Define the flat records persisted by the placement store.
//! - Define read models and the position arithmetic used by the engines.
//!
//! # Invariants
//! - Records reference each other by id only.
//! - Timestamps are epoch milliseconds assigned by the mutating call site.

pub mod board;
pub mod directory;
pub mod ordering;
pub mod view;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
///
/// A clock set before the Unix epoch yields `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
