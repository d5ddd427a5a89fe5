//! Read models assembled by the board aggregate builder.

use crate::model::board::{BoardId, ColumnId, PlacementId, ProjectId, TaskId, UserId};
use crate::model::directory::{TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};

/// Board with ordered columns, each with ordered cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub board_uuid: BoardId,
    pub project_uuid: ProjectId,
    pub created_at: i64,
    pub updated_at: i64,
    pub columns: Vec<ColumnView>,
}

/// One column of a [`BoardView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnView {
    pub column_uuid: ColumnId,
    pub board_uuid: BoardId,
    pub title: String,
    pub position: i64,
    pub created_at: i64,
    pub cards: Vec<PlacementCard>,
}

/// Placement joined with its task content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementCard {
    pub placement_uuid: PlacementId,
    pub board_uuid: BoardId,
    pub column_uuid: ColumnId,
    /// Position of the owning column on the board.
    pub column_number: i64,
    /// Position within the owning column.
    pub position: i64,
    pub task_uuid: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_uuid: Option<UserId>,
    pub assignee_name: Option<String>,
    pub deadline: Option<String>,
}

impl BoardView {
    /// Returns the column at `position`, if any.
    pub fn column_at(&self, position: i64) -> Option<&ColumnView> {
        self.columns.iter().find(|column| column.position == position)
    }

    /// Returns the column with the given id, if any.
    pub fn column(&self, column_uuid: ColumnId) -> Option<&ColumnView> {
        self.columns
            .iter()
            .find(|column| column.column_uuid == column_uuid)
    }
}

impl ColumnView {
    /// Task ids in card order.
    pub fn task_order(&self) -> Vec<TaskId> {
        self.cards.iter().map(|card| card.task_uuid).collect()
    }
}
