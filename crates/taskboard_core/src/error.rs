//! Error taxonomy surfaced by the ordering engines and the calling layer.
//!
//! # Invariants
//! - Only [`BoardError::Busy`] is retryable; every other kind is terminal.
//! - Each error carries a stable `code()` used as `error_code=` in log lines.

use crate::model::board::{BoardId, ColumnId, ProjectId, TaskId, UserId};
use crate::repo::scope_lock::ScopeKey;
use crate::repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by engine and API operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Board,
    Column,
    Placement,
    Task,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Board => "board",
            Self::Column => "column",
            Self::Placement => "placement",
            Self::Task => "task",
        }
    }
}

/// Mutation that was denied by the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    View,
    Mutate,
    CreateBoard,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Mutate => "mutate",
            Self::CreateBoard => "create_board",
        }
    }
}

/// Why a request was rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Column title is blank after trim.
    BlankTitle,
    /// Column title exceeds the maximum length.
    TitleTooLong { max: usize, actual: usize },
    /// Board creation was requested with no starter columns.
    EmptyStarterColumns,
    /// Deleting this column would leave its board with no columns.
    LastColumn(ColumnId),
    /// Reorder list length differs from the board's column count.
    ReorderLength { expected: usize, actual: usize },
    /// Reorder list names one column twice.
    ReorderDuplicate(ColumnId),
    /// Reorder list names a column that is not on the board.
    ReorderUnknown(ColumnId),
    /// Position is outside `0..=max`.
    PositionOutOfRange { position: i64, max: i64 },
    /// Move target column belongs to another board.
    CrossBoardMove {
        source_board: BoardId,
        target_board: BoardId,
    },
    /// Task belongs to a different project than the board.
    TaskOutsideProject { task: TaskId, project: ProjectId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "column title must not be blank"),
            Self::TitleTooLong { max, actual } => {
                write!(f, "column title has {actual} characters; at most {max} allowed")
            }
            Self::EmptyStarterColumns => write!(f, "a board needs at least one starter column"),
            Self::LastColumn(id) => {
                write!(f, "cannot delete the last column of a board: {id}")
            }
            Self::ReorderLength { expected, actual } => write!(
                f,
                "column order must list all {expected} columns exactly once, got {actual}"
            ),
            Self::ReorderDuplicate(id) => write!(f, "column order lists {id} more than once"),
            Self::ReorderUnknown(id) => write!(f, "column order lists foreign column {id}"),
            Self::PositionOutOfRange { position, max } => {
                write!(f, "position {position} is outside 0..={max}")
            }
            Self::CrossBoardMove {
                source_board,
                target_board,
            } => write!(
                f,
                "cannot move placement from board {source_board} to board {target_board}"
            ),
            Self::TaskOutsideProject { task, project } => {
                write!(f, "task {task} does not belong to project {project}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Why a mutation could not start or finish in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusyReason {
    /// Scope lock was not granted within the configured timeout.
    ScopeLocked(ScopeKey),
    /// SQLite reported `SQLITE_BUSY`/`SQLITE_LOCKED`.
    DatabaseLocked,
    /// The record left the locked scope between lookup and lock.
    ScopeChanged(ScopeKey),
}

/// Errors from ordering engine and board API operations.
#[derive(Debug)]
pub enum BoardError {
    NotFound { entity: EntityKind, id: Uuid },
    Forbidden {
        user: UserId,
        target: Uuid,
        access: Access,
    },
    Validation(ValidationError),
    Conflict { task: TaskId, board: BoardId },
    Busy(BusyReason),
    Store(StoreError),
}

impl BoardError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Returns whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::Validation(_) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Busy(_) => "busy",
            Self::Store(_) => "store",
        }
    }
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::Forbidden {
                user,
                target,
                access,
            } => write!(
                f,
                "user {user} is not allowed to {} {target}",
                access.as_str()
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { task, board } => {
                write!(f, "task {task} is already placed on board {board}")
            }
            Self::Busy(BusyReason::ScopeLocked(scope)) => {
                write!(f, "scope {scope} is busy; retry later")
            }
            Self::Busy(BusyReason::DatabaseLocked) => write!(f, "database is busy; retry later"),
            Self::Busy(BusyReason::ScopeChanged(scope)) => {
                write!(f, "scope {scope} changed concurrently; retry later")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for BoardError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for BoardError {
    fn from(value: StoreError) -> Self {
        if value.is_busy() {
            return Self::Busy(BusyReason::DatabaseLocked);
        }
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::from(value).into()
    }
}
