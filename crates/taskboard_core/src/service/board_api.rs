//! Board calling layer: identity-aware entry points over the engines.
//!
//! # Responsibility
//! - Resolve the target board, consult the access gate, then delegate.
//!
//! # Invariants
//! - Unknown ids surface as `NotFound` before any access decision.
//! - A denied request never reaches an engine.

use crate::config::EngineConfig;
use crate::error::{Access, BoardError, BoardResult, EntityKind};
use crate::model::board::{
    Board, BoardColumn, BoardId, ColumnId, Placement, PlacementId, ProjectId, TaskId, UserId,
};
use crate::model::view::{BoardView, PlacementCard};
use crate::repo::placement_store::PlacementStore;
use crate::service::access_gate::AccessGate;
use crate::service::board_view::BoardAggregateBuilder;
use crate::service::column_engine::ColumnOrderingEngine;
use crate::service::task_engine::TaskOrderingEngine;
use log::info;
use uuid::Uuid;

/// One entry point per board operation, each taking the acting user.
pub struct BoardApi<'s, G: AccessGate> {
    store: &'s PlacementStore,
    gate: G,
    starter_columns: Vec<String>,
}

impl<'s, G: AccessGate> BoardApi<'s, G> {
    /// Creates an API with the default starter columns.
    pub fn new(store: &'s PlacementStore, gate: G) -> Self {
        Self::with_config(store, gate, &EngineConfig::default())
    }

    pub fn with_config(store: &'s PlacementStore, gate: G, config: &EngineConfig) -> Self {
        Self {
            store,
            gate,
            starter_columns: config.starter_columns.clone(),
        }
    }

    pub fn get_board(&self, user_uuid: UserId, board_uuid: BoardId) -> BoardResult<BoardView> {
        self.require_board(board_uuid)?;
        self.check_view(user_uuid, board_uuid)?;
        self.views().build(board_uuid)
    }

    /// View of the project's first board.
    pub fn get_project_board(
        &self,
        user_uuid: UserId,
        project_uuid: ProjectId,
    ) -> BoardResult<BoardView> {
        let board_uuid = self.views().board_of_project(project_uuid)?;
        self.check_view(user_uuid, board_uuid)?;
        self.views().build(board_uuid)
    }

    /// Creates a board seeded with the configured starter columns.
    pub fn create_board(&self, user_uuid: UserId, project_uuid: ProjectId) -> BoardResult<Board> {
        if !self.store.read(|tx| Ok(tx.project_exists(project_uuid)?))? {
            return Err(BoardError::not_found(EntityKind::Project, project_uuid));
        }
        if !self.gate.can_create_board(user_uuid, project_uuid) {
            return Err(denied(user_uuid, project_uuid, Access::CreateBoard));
        }
        self.columns()
            .create_board(project_uuid, &self.starter_columns)
    }

    pub fn add_column(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
        title: &str,
    ) -> BoardResult<BoardColumn> {
        self.require_board(board_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.columns().append(board_uuid, title)
    }

    pub fn rename_column(
        &self,
        user_uuid: UserId,
        column_uuid: ColumnId,
        title: &str,
    ) -> BoardResult<BoardColumn> {
        let board_uuid = self.board_of_column(column_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.columns().rename(column_uuid, title)
    }

    pub fn delete_column(&self, user_uuid: UserId, column_uuid: ColumnId) -> BoardResult<()> {
        let board_uuid = self.board_of_column(column_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.columns().delete(column_uuid)
    }

    /// Reorders columns and returns the rebuilt board view.
    pub fn reorder_columns(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
        new_order: &[ColumnId],
    ) -> BoardResult<BoardView> {
        self.require_board(board_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.columns().reorder(board_uuid, new_order)?;
        self.views().build(board_uuid)
    }

    pub fn add_placement(
        &self,
        user_uuid: UserId,
        column_uuid: ColumnId,
        task_uuid: TaskId,
        position: Option<i64>,
    ) -> BoardResult<Placement> {
        let board_uuid = self.board_of_column(column_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.tasks().add_placement(column_uuid, task_uuid, position)
    }

    pub fn remove_placement(
        &self,
        user_uuid: UserId,
        placement_uuid: PlacementId,
    ) -> BoardResult<()> {
        let board_uuid = self.board_of_placement(placement_uuid)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.tasks().remove_placement(placement_uuid)
    }

    pub fn move_placement(
        &self,
        user_uuid: UserId,
        placement_uuid: PlacementId,
        target_column: ColumnId,
        target_position: i64,
    ) -> BoardResult<Placement> {
        let board_uuid = self.board_of_placement(placement_uuid)?;
        self.board_of_column(target_column)?;
        self.check_mutate(user_uuid, board_uuid)?;
        self.tasks()
            .move_placement(placement_uuid, target_column, target_position)
    }

    pub fn list_columns(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
    ) -> BoardResult<Vec<BoardColumn>> {
        self.require_board(board_uuid)?;
        self.check_view(user_uuid, board_uuid)?;
        self.views().list_columns(board_uuid)
    }

    pub fn column_cards(
        &self,
        user_uuid: UserId,
        column_uuid: ColumnId,
    ) -> BoardResult<Vec<PlacementCard>> {
        let board_uuid = self.board_of_column(column_uuid)?;
        self.check_view(user_uuid, board_uuid)?;
        self.views().column_cards(column_uuid)
    }

    pub fn board_cards(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
    ) -> BoardResult<Vec<PlacementCard>> {
        self.require_board(board_uuid)?;
        self.check_view(user_uuid, board_uuid)?;
        self.views().board_cards(board_uuid)
    }

    fn columns(&self) -> ColumnOrderingEngine<'s> {
        ColumnOrderingEngine::new(self.store)
    }

    fn tasks(&self) -> TaskOrderingEngine<'s> {
        TaskOrderingEngine::new(self.store)
    }

    fn views(&self) -> BoardAggregateBuilder<'s> {
        BoardAggregateBuilder::new(self.store)
    }

    fn require_board(&self, board_uuid: BoardId) -> BoardResult<()> {
        let exists = self
            .store
            .read(|tx| Ok(tx.get_board(board_uuid)?.is_some()))?;
        if exists {
            Ok(())
        } else {
            Err(BoardError::not_found(EntityKind::Board, board_uuid))
        }
    }

    fn board_of_column(&self, column_uuid: ColumnId) -> BoardResult<BoardId> {
        self.store
            .board_of_column(column_uuid)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Column, column_uuid))
    }

    fn board_of_placement(&self, placement_uuid: PlacementId) -> BoardResult<BoardId> {
        self.store
            .board_of_placement(placement_uuid)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Placement, placement_uuid))
    }

    fn check_view(&self, user_uuid: UserId, board_uuid: BoardId) -> BoardResult<()> {
        if self.gate.can_view(user_uuid, board_uuid) {
            return Ok(());
        }
        Err(denied(user_uuid, board_uuid, Access::View))
    }

    fn check_mutate(&self, user_uuid: UserId, board_uuid: BoardId) -> BoardResult<()> {
        if self.gate.can_mutate(user_uuid, board_uuid) {
            return Ok(());
        }
        Err(denied(user_uuid, board_uuid, Access::Mutate))
    }
}

fn denied(user_uuid: UserId, target: Uuid, access: Access) -> BoardError {
    info!(
        "event=access_denied module=api status=rejected access={} error_code=forbidden",
        access.as_str()
    );
    BoardError::Forbidden {
        user: user_uuid,
        target,
        access,
    }
}
