//! Board use-case services.
//!
//! # Responsibility
//! - Compose placement store primitives into ordering operations.
//! - Keep identity checks in the calling layer; engines carry no user.
//!
//! # Invariants
//! - Each mutation is one scope-locked transaction.
//! - Outcome logs carry ids and codes only, never titles or task text.

use crate::error::{BoardError, BoardResult};
use log::{error, info, warn};
use std::time::Instant;

pub mod access_gate;
pub mod board_api;
pub mod board_view;
pub mod column_engine;
pub mod task_engine;

/// Runs one engine operation and logs its outcome under `event`.
pub(crate) fn observed<T>(
    event: &'static str,
    operation: impl FnOnce() -> BoardResult<T>,
) -> BoardResult<T> {
    let started_at = Instant::now();
    let result = operation();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(BoardError::Store(err)) => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code=store error={err}"
        ),
        Err(err) => warn!(
            "event={event} module=service status=rejected duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
    result
}
