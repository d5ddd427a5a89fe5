//! Board, column and placement records.
//!
//! # Responsibility
//! - Define the flat, id-referencing records owned by the placement engine.
//! - Provide constructors that stamp identity and timestamps explicitly.
//!
//! # Invariants
//! - Relations are foreign-key fields only; no record holds another record.
//! - `position` is dense per scope: a board's columns and a column's
//!   placements are numbered `0..len` with no gaps or duplicates.
//! - `Placement::board_uuid` always equals the owning column's board.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable board identifier.
pub type BoardId = Uuid;
/// Stable column identifier.
pub type ColumnId = Uuid;
/// Stable placement identifier.
pub type PlacementId = Uuid;
/// Identifier of an externally-owned task.
pub type TaskId = Uuid;
/// Identifier of an externally-owned project.
pub type ProjectId = Uuid;
/// Identifier of an externally-owned user.
pub type UserId = Uuid;

/// Upper bound for column titles, in characters.
pub const MAX_COLUMN_TITLE_CHARS: usize = 255;

/// Top-level ordered container of columns for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub board_uuid: BoardId,
    pub project_uuid: ProjectId,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms timestamp of the last applied mutation on this board.
    pub updated_at: i64,
}

impl Board {
    /// Creates a new board record with a generated id.
    pub fn new(project_uuid: ProjectId, now_ms: i64) -> Self {
        Self {
            board_uuid: Uuid::new_v4(),
            project_uuid,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Named ordered bucket of placements, belonging to exactly one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub column_uuid: ColumnId,
    pub board_uuid: BoardId,
    pub title: String,
    /// Index within the owning board.
    pub position: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

impl BoardColumn {
    /// Creates a new column record with a generated id.
    pub fn new(board_uuid: BoardId, title: impl Into<String>, position: i64, now_ms: i64) -> Self {
        Self {
            column_uuid: Uuid::new_v4(),
            board_uuid,
            title: title.into(),
            position,
            created_at: now_ms,
        }
    }
}

/// A task's membership and position within exactly one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub placement_uuid: PlacementId,
    pub column_uuid: ColumnId,
    /// Denormalized owner board, used for board-scoped task uniqueness.
    pub board_uuid: BoardId,
    pub task_uuid: TaskId,
    /// Index within the owning column.
    pub position: i64,
}

impl Placement {
    /// Creates a new placement record with a generated id.
    pub fn new(column: &BoardColumn, task_uuid: TaskId, position: i64) -> Self {
        Self {
            placement_uuid: Uuid::new_v4(),
            column_uuid: column.column_uuid,
            board_uuid: column.board_uuid,
            task_uuid,
            position,
        }
    }
}
