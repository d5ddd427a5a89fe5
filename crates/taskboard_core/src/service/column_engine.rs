//! Column ordering engine.
//!
//! # Responsibility
//! - Create boards with their starter columns.
//! - Append, rename, delete and reorder columns within one board.
//!
//! # Invariants
//! - A board's column positions are `0..n` after every committed operation.
//! - A board always keeps at least one column.
//! - Every column mutation holds the board scope lock.

use crate::error::{BoardError, BoardResult, EntityKind, ValidationError};
use crate::model::board::{Board, BoardColumn, BoardId, ColumnId, ProjectId, MAX_COLUMN_TITLE_CHARS};
use crate::model::now_epoch_ms;
use crate::model::ordering::{check_permutation, removal_shift, PermutationMismatch};
use crate::repo::placement_store::PlacementStore;
use crate::repo::scope_lock::ScopeKey;
use crate::service::observed;

/// Column operations over one placement store.
pub struct ColumnOrderingEngine<'s> {
    store: &'s PlacementStore,
}

impl<'s> ColumnOrderingEngine<'s> {
    pub fn new(store: &'s PlacementStore) -> Self {
        Self { store }
    }

    /// Creates a board for `project_uuid` with `starter_titles` at `0..k`.
    ///
    /// # Errors
    /// - `Validation` for an empty starter set or an invalid title.
    /// - `NotFound` for an unknown project.
    pub fn create_board(
        &self,
        project_uuid: ProjectId,
        starter_titles: &[String],
    ) -> BoardResult<Board> {
        observed("board_create", || {
            if starter_titles.is_empty() {
                return Err(ValidationError::EmptyStarterColumns.into());
            }
            let titles = starter_titles
                .iter()
                .map(|title| normalize_column_title(title))
                .collect::<Result<Vec<_>, _>>()?;

            // A new board is invisible to other writers until commit.
            self.store.write(&[], |tx| {
                if !tx.project_exists(project_uuid)? {
                    return Err(BoardError::not_found(EntityKind::Project, project_uuid));
                }
                let now = now_epoch_ms();
                let board = Board::new(project_uuid, now);
                tx.insert_board(&board)?;
                for (position, title) in (0_i64..).zip(titles) {
                    tx.insert_column(&BoardColumn::new(board.board_uuid, title, position, now))?;
                }
                tx.verify_column_order(board.board_uuid)?;
                Ok(board)
            })
        })
    }

    /// Appends a column at the end of the board.
    pub fn append(&self, board_uuid: BoardId, title: &str) -> BoardResult<BoardColumn> {
        observed("column_append", || {
            let title = normalize_column_title(title)?;
            self.store.write(&[ScopeKey::Board(board_uuid)], |tx| {
                if tx.get_board(board_uuid)?.is_none() {
                    return Err(BoardError::not_found(EntityKind::Board, board_uuid));
                }
                let now = now_epoch_ms();
                let position = tx.count_columns(board_uuid)?;
                let column = BoardColumn::new(board_uuid, title, position, now);
                tx.insert_column(&column)?;
                tx.touch_board(board_uuid, now)?;
                tx.verify_column_order(board_uuid)?;
                Ok(column)
            })
        })
    }

    /// Renames a column; its position is unchanged.
    pub fn rename(&self, column_uuid: ColumnId, title: &str) -> BoardResult<BoardColumn> {
        observed("column_rename", || {
            let title = normalize_column_title(title)?;
            let board_uuid = self.board_of(column_uuid)?;
            self.store.write(&[ScopeKey::Board(board_uuid)], |tx| {
                let mut column = tx
                    .get_column(column_uuid)?
                    .ok_or_else(|| BoardError::not_found(EntityKind::Column, column_uuid))?;
                tx.rename_column(column_uuid, &title)?;
                tx.touch_board(board_uuid, now_epoch_ms())?;
                column.title = title;
                Ok(column)
            })
        })
    }

    /// Deletes a column with its placements and closes the position gap.
    ///
    /// # Errors
    /// - `Validation(LastColumn)` when the column is the board's only one.
    pub fn delete(&self, column_uuid: ColumnId) -> BoardResult<()> {
        observed("column_delete", || {
            let board_uuid = self.board_of(column_uuid)?;
            let scopes = [ScopeKey::Board(board_uuid), ScopeKey::Column(column_uuid)];
            self.store.write(&scopes, |tx| {
                let column = tx
                    .get_column(column_uuid)?
                    .ok_or_else(|| BoardError::not_found(EntityKind::Column, column_uuid))?;
                let count = tx.count_columns(board_uuid)?;
                if count <= 1 {
                    return Err(ValidationError::LastColumn(column_uuid).into());
                }

                tx.delete_column(column_uuid)?;
                if let Some(shift) = removal_shift(column.position, count) {
                    tx.shift_columns(board_uuid, shift)?;
                }
                tx.touch_board(board_uuid, now_epoch_ms())?;
                tx.verify_column_order(board_uuid)?;
                Ok(())
            })
        })
    }

    /// Assigns `position = index` for every column id in `new_order`.
    ///
    /// Returns the board's columns in their new order.
    ///
    /// # Errors
    /// - `Validation` unless `new_order` is a permutation of the board's
    ///   current column ids.
    pub fn reorder(
        &self,
        board_uuid: BoardId,
        new_order: &[ColumnId],
    ) -> BoardResult<Vec<BoardColumn>> {
        observed("column_reorder", || {
            self.store.write(&[ScopeKey::Board(board_uuid)], |tx| {
                if tx.get_board(board_uuid)?.is_none() {
                    return Err(BoardError::not_found(EntityKind::Board, board_uuid));
                }
                let current: Vec<ColumnId> = tx
                    .list_columns(board_uuid)?
                    .into_iter()
                    .map(|column| column.column_uuid)
                    .collect();
                check_permutation(&current, new_order).map_err(reorder_error)?;

                for (position, column_uuid) in (0_i64..).zip(new_order) {
                    tx.set_column_position(*column_uuid, position)?;
                }
                tx.touch_board(board_uuid, now_epoch_ms())?;
                tx.verify_column_order(board_uuid)?;
                Ok(tx.list_columns(board_uuid)?)
            })
        })
    }

    fn board_of(&self, column_uuid: ColumnId) -> BoardResult<BoardId> {
        self.store
            .board_of_column(column_uuid)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Column, column_uuid))
    }
}

/// Trims a column title and enforces the non-blank and length rules.
pub fn normalize_column_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    let actual = trimmed.chars().count();
    if actual > MAX_COLUMN_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: MAX_COLUMN_TITLE_CHARS,
            actual,
        });
    }
    Ok(trimmed.to_string())
}

fn reorder_error(mismatch: PermutationMismatch<ColumnId>) -> ValidationError {
    match mismatch {
        PermutationMismatch::Length { expected, actual } => {
            ValidationError::ReorderLength { expected, actual }
        }
        PermutationMismatch::Duplicate(id) => ValidationError::ReorderDuplicate(id),
        PermutationMismatch::Unknown(id) => ValidationError::ReorderUnknown(id),
    }
}
