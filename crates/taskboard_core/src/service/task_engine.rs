//! Task ordering engine.
//!
//! # Responsibility
//! - Add, remove and move placements within and across columns.
//! - List placements of a column or a whole board.
//!
//! # Invariants
//! - A column's placement positions are `0..m` after every committed operation.
//! - A task has at most one live placement per board.
//! - Same-column moves hold only the column scope; cross-column moves hold the
//!   board scope and both column scopes.
//! - A move to the placement's current slot writes nothing.

use crate::error::{BoardError, BoardResult, BusyReason, EntityKind, ValidationError};
use crate::model::board::{BoardId, ColumnId, Placement, PlacementId, TaskId};
use crate::model::now_epoch_ms;
use crate::model::ordering::{insertion_shift, removal_shift, reposition_shift, within_slots};
use crate::repo::placement_store::{PlacementStore, StoreTx};
use crate::repo::scope_lock::ScopeKey;
use crate::service::observed;

/// Placement operations over one placement store.
pub struct TaskOrderingEngine<'s> {
    store: &'s PlacementStore,
}

impl<'s> TaskOrderingEngine<'s> {
    pub fn new(store: &'s PlacementStore) -> Self {
        Self { store }
    }

    /// Places `task_uuid` in a column, appending when `position` is `None`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown column or task.
    /// - `Validation` when the task belongs to another project or `position`
    ///   is outside `0..=count`.
    /// - `Conflict` when the task is already placed on the board.
    pub fn add_placement(
        &self,
        column_uuid: ColumnId,
        task_uuid: TaskId,
        position: Option<i64>,
    ) -> BoardResult<Placement> {
        observed("placement_add", || {
            self.store.write(&[ScopeKey::Column(column_uuid)], |tx| {
                let column = tx
                    .get_column(column_uuid)?
                    .ok_or_else(|| BoardError::not_found(EntityKind::Column, column_uuid))?;
                let task_project = tx
                    .task_project(task_uuid)?
                    .ok_or_else(|| BoardError::not_found(EntityKind::Task, task_uuid))?;
                let board = tx
                    .get_board(column.board_uuid)?
                    .ok_or_else(|| BoardError::not_found(EntityKind::Board, column.board_uuid))?;
                if task_project != board.project_uuid {
                    return Err(ValidationError::TaskOutsideProject {
                        task: task_uuid,
                        project: board.project_uuid,
                    }
                    .into());
                }
                if tx.placement_of_task(board.board_uuid, task_uuid)?.is_some() {
                    return Err(BoardError::Conflict {
                        task: task_uuid,
                        board: board.board_uuid,
                    });
                }

                let count = tx.count_placements(column_uuid)?;
                let position = position.unwrap_or(count);
                if !within_slots(position, count) {
                    return Err(ValidationError::PositionOutOfRange {
                        position,
                        max: count,
                    }
                    .into());
                }
                if let Some(shift) = insertion_shift(position, count) {
                    tx.shift_placements(column_uuid, shift)?;
                }
                let placement = Placement::new(&column, task_uuid, position);
                tx.insert_placement(&placement)?;
                tx.touch_board(board.board_uuid, now_epoch_ms())?;
                tx.verify_placement_order(column_uuid)?;
                Ok(placement)
            })
        })
    }

    /// Removes a placement and closes the gap it leaves.
    pub fn remove_placement(&self, placement_uuid: PlacementId) -> BoardResult<()> {
        observed("placement_remove", || {
            let located = self.locate(placement_uuid)?;
            let column_uuid = located.column_uuid;
            self.store.write(&[ScopeKey::Column(column_uuid)], |tx| {
                let placement = reload(tx, placement_uuid, column_uuid)?;
                let count = tx.count_placements(column_uuid)?;
                tx.delete_placement(placement_uuid)?;
                if let Some(shift) = removal_shift(placement.position, count) {
                    tx.shift_placements(column_uuid, shift)?;
                }
                tx.touch_board(placement.board_uuid, now_epoch_ms())?;
                tx.verify_placement_order(column_uuid)?;
                Ok(())
            })
        })
    }

    /// Moves a placement to `target_position` in `target_column`.
    ///
    /// # Errors
    /// - `Validation` when the target column is on another board or the
    ///   position is out of range (`0..count` in place, `0..=count` across).
    /// - `Busy(ScopeChanged)` when the placement moved while waiting for locks.
    pub fn move_placement(
        &self,
        placement_uuid: PlacementId,
        target_column: ColumnId,
        target_position: i64,
    ) -> BoardResult<Placement> {
        observed("placement_move", || {
            let located = self.locate(placement_uuid)?;
            if located.column_uuid == target_column {
                self.move_within(placement_uuid, target_column, target_position)
            } else {
                self.move_across(located, target_column, target_position)
            }
        })
    }

    /// Placements of one column in position order.
    pub fn list_column(&self, column_uuid: ColumnId) -> BoardResult<Vec<Placement>> {
        self.store.read(|tx| {
            if tx.get_column(column_uuid)?.is_none() {
                return Err(BoardError::not_found(EntityKind::Column, column_uuid));
            }
            Ok(tx.list_placements(column_uuid)?)
        })
    }

    /// Placements of one board in (column position, placement position) order.
    pub fn list_board(&self, board_uuid: BoardId) -> BoardResult<Vec<Placement>> {
        self.store.read(|tx| {
            if tx.get_board(board_uuid)?.is_none() {
                return Err(BoardError::not_found(EntityKind::Board, board_uuid));
            }
            let mut placements = Vec::new();
            for column in tx.list_columns(board_uuid)? {
                placements.extend(tx.list_placements(column.column_uuid)?);
            }
            Ok(placements)
        })
    }

    fn move_within(
        &self,
        placement_uuid: PlacementId,
        column_uuid: ColumnId,
        target_position: i64,
    ) -> BoardResult<Placement> {
        self.store.write(&[ScopeKey::Column(column_uuid)], |tx| {
            let mut placement = reload(tx, placement_uuid, column_uuid)?;
            let max = tx.count_placements(column_uuid)? - 1;
            if !within_slots(target_position, max) {
                return Err(ValidationError::PositionOutOfRange {
                    position: target_position,
                    max,
                }
                .into());
            }
            let Some(shift) = reposition_shift(placement.position, target_position) else {
                return Ok(placement);
            };

            tx.shift_placements(column_uuid, shift)?;
            tx.set_placement_slot(placement_uuid, column_uuid, target_position)?;
            tx.touch_board(placement.board_uuid, now_epoch_ms())?;
            tx.verify_placement_order(column_uuid)?;
            placement.position = target_position;
            Ok(placement)
        })
    }

    fn move_across(
        &self,
        located: Placement,
        target_column: ColumnId,
        target_position: i64,
    ) -> BoardResult<Placement> {
        let source_column = located.column_uuid;
        let scopes = [
            ScopeKey::Board(located.board_uuid),
            ScopeKey::Column(source_column),
            ScopeKey::Column(target_column),
        ];
        self.store.write(&scopes, |tx| {
            let mut placement = reload(tx, located.placement_uuid, source_column)?;
            let target = tx
                .get_column(target_column)?
                .ok_or_else(|| BoardError::not_found(EntityKind::Column, target_column))?;
            if target.board_uuid != placement.board_uuid {
                return Err(ValidationError::CrossBoardMove {
                    source_board: placement.board_uuid,
                    target_board: target.board_uuid,
                }
                .into());
            }

            let source_len = tx.count_placements(source_column)?;
            let target_len = tx.count_placements(target_column)?;
            if !within_slots(target_position, target_len) {
                return Err(ValidationError::PositionOutOfRange {
                    position: target_position,
                    max: target_len,
                }
                .into());
            }

            if let Some(shift) = removal_shift(placement.position, source_len) {
                tx.shift_placements(source_column, shift)?;
            }
            if let Some(shift) = insertion_shift(target_position, target_len) {
                tx.shift_placements(target_column, shift)?;
            }
            tx.set_placement_slot(placement.placement_uuid, target_column, target_position)?;
            tx.touch_board(placement.board_uuid, now_epoch_ms())?;
            tx.verify_placement_order(source_column)?;
            tx.verify_placement_order(target_column)?;

            placement.column_uuid = target_column;
            placement.position = target_position;
            Ok(placement)
        })
    }

    /// Current record of a placement, read outside any scope lock.
    pub fn locate(&self, placement_uuid: PlacementId) -> BoardResult<Placement> {
        self.store.read(|tx| {
            tx.get_placement(placement_uuid)?
                .ok_or_else(|| BoardError::not_found(EntityKind::Placement, placement_uuid))
        })
    }
}

/// Re-reads a placement under lock and checks it is still in `column_uuid`.
fn reload(
    tx: &StoreTx<'_>,
    placement_uuid: PlacementId,
    column_uuid: ColumnId,
) -> BoardResult<Placement> {
    let placement = tx
        .get_placement(placement_uuid)?
        .ok_or_else(|| BoardError::not_found(EntityKind::Placement, placement_uuid))?;
    if placement.column_uuid != column_uuid {
        return Err(BoardError::Busy(BusyReason::ScopeChanged(ScopeKey::Column(
            column_uuid,
        ))));
    }
    Ok(placement)
}
