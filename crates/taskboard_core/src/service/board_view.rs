//! Board aggregate builder.
//!
//! Every view is assembled inside one read transaction, so columns and cards
//! come from the same snapshot.

use crate::error::{BoardError, BoardResult, EntityKind};
use crate::model::board::{BoardColumn, BoardId, ColumnId, ProjectId};
use crate::model::view::{BoardView, ColumnView, PlacementCard};
use crate::repo::placement_store::{PlacementStore, StoreTx};
use std::collections::HashMap;

/// Read-side assembler for board views and card listings.
pub struct BoardAggregateBuilder<'s> {
    store: &'s PlacementStore,
}

impl<'s> BoardAggregateBuilder<'s> {
    pub fn new(store: &'s PlacementStore) -> Self {
        Self { store }
    }

    /// Board with ordered columns, each carrying ordered cards.
    pub fn build(&self, board_uuid: BoardId) -> BoardResult<BoardView> {
        self.store.read(|tx| assemble(tx, board_uuid))
    }

    /// View of the project's earliest-created board.
    pub fn build_for_project(&self, project_uuid: ProjectId) -> BoardResult<BoardView> {
        self.store.read(|tx| {
            let board_uuid = project_board(tx, project_uuid)?;
            assemble(tx, board_uuid)
        })
    }

    /// Id of the project's earliest-created board.
    pub fn board_of_project(&self, project_uuid: ProjectId) -> BoardResult<BoardId> {
        self.store.read(|tx| project_board(tx, project_uuid))
    }

    /// Columns of a board in position order, without cards.
    pub fn list_columns(&self, board_uuid: BoardId) -> BoardResult<Vec<BoardColumn>> {
        self.store.read(|tx| {
            if tx.get_board(board_uuid)?.is_none() {
                return Err(BoardError::not_found(EntityKind::Board, board_uuid));
            }
            Ok(tx.list_columns(board_uuid)?)
        })
    }

    pub fn column_cards(&self, column_uuid: ColumnId) -> BoardResult<Vec<PlacementCard>> {
        self.store.read(|tx| {
            if tx.get_column(column_uuid)?.is_none() {
                return Err(BoardError::not_found(EntityKind::Column, column_uuid));
            }
            Ok(tx.column_cards(column_uuid)?)
        })
    }

    pub fn board_cards(&self, board_uuid: BoardId) -> BoardResult<Vec<PlacementCard>> {
        self.store.read(|tx| {
            if tx.get_board(board_uuid)?.is_none() {
                return Err(BoardError::not_found(EntityKind::Board, board_uuid));
            }
            Ok(tx.board_cards(board_uuid)?)
        })
    }
}

fn project_board(tx: &StoreTx<'_>, project_uuid: ProjectId) -> BoardResult<BoardId> {
    if !tx.project_exists(project_uuid)? {
        return Err(BoardError::not_found(EntityKind::Project, project_uuid));
    }
    // A project without boards reports the board as missing, keyed by project.
    tx.first_board_of_project(project_uuid)?
        .map(|board| board.board_uuid)
        .ok_or_else(|| BoardError::not_found(EntityKind::Board, project_uuid))
}

fn assemble(tx: &StoreTx<'_>, board_uuid: BoardId) -> BoardResult<BoardView> {
    let board = tx
        .get_board(board_uuid)?
        .ok_or_else(|| BoardError::not_found(EntityKind::Board, board_uuid))?;

    let mut cards_by_column: HashMap<ColumnId, Vec<PlacementCard>> = HashMap::new();
    for card in tx.board_cards(board_uuid)? {
        cards_by_column
            .entry(card.column_uuid)
            .or_default()
            .push(card);
    }

    let columns = tx
        .list_columns(board_uuid)?
        .into_iter()
        .map(|column| ColumnView {
            cards: cards_by_column
                .remove(&column.column_uuid)
                .unwrap_or_default(),
            column_uuid: column.column_uuid,
            board_uuid: column.board_uuid,
            title: column.title,
            position: column.position,
            created_at: column.created_at,
        })
        .collect();

    Ok(BoardView {
        board_uuid: board.board_uuid,
        project_uuid: board.project_uuid,
        created_at: board.created_at,
        updated_at: board.updated_at,
        columns,
    })
}
