//! Placement store: durable board, column and placement records.
//!
//! # Responsibility
//! - Own one SQLite connection per worker and hand out read snapshots and
//!   scope-locked write transactions.
//! - Provide point lookups, scope-ordered listings and the record-level
//!   writes the ordering engines compose into one transaction.
//!
//! # Invariants
//! - Every write runs inside `BEGIN IMMEDIATE` while holding its scope locks;
//!   a transaction that is not committed rolls back every statement.
//! - Scope listings are deterministic: `position ASC, uuid ASC`.
//! - Lock and database waits are bounded; contention surfaces as `Busy`.

use crate::config::EngineConfig;
use crate::db::open_db_with_timeout;
use crate::error::{BoardError, BoardResult, BusyReason};
use crate::model::board::{
    Board, BoardColumn, BoardId, ColumnId, Placement, PlacementId, ProjectId, TaskId,
};
use crate::model::directory::{TaskPriority, TaskStatus};
use crate::model::ordering::{is_dense, PositionShift};
use crate::model::view::PlacementCard;
use crate::repo::scope_lock::{ScopeKey, ScopeLockRegistry};
use crate::repo::{
    ensure_connection_ready, parse_optional_uuid, parse_uuid, StoreError, StoreResult,
};
use log::debug;
use rusqlite::{params, Connection, Params, Row, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Lock timeout applied when the caller does not configure one.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

const CARD_SELECT_SQL: &str = "SELECT
    p.placement_uuid AS placement_uuid,
    p.board_uuid AS board_uuid,
    p.column_uuid AS column_uuid,
    c.position AS column_number,
    p.position AS position,
    t.task_uuid AS task_uuid,
    t.title AS title,
    t.description AS description,
    t.status AS status,
    t.priority AS priority,
    t.assignee_uuid AS assignee_uuid,
    t.assignee_name AS assignee_name,
    t.deadline AS deadline
FROM placements p
INNER JOIN board_columns c ON c.column_uuid = p.column_uuid
INNER JOIN tasks t ON t.task_uuid = p.task_uuid";

/// Shareable recipe for opening worker stores on one database file.
///
/// Every store connected through the same handle (or its clones) shares one
/// scope lock registry.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    path: PathBuf,
    locks: Arc<ScopeLockRegistry>,
    lock_timeout: Duration,
    busy_timeout: Duration,
}

impl StoreHandle {
    /// Creates a handle for the database at `path` using config timeouts.
    pub fn new(path: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self {
            path: path.into(),
            locks: Arc::new(ScopeLockRegistry::new()),
            lock_timeout: config.lock_timeout(),
            busy_timeout: config.busy_timeout(),
        }
    }

    /// Opens a new connection and wraps it in a store for one worker.
    pub fn connect(&self) -> StoreResult<PlacementStore> {
        let conn = open_db_with_timeout(&self.path, self.busy_timeout)?;
        PlacementStore::with_locks(conn, Arc::clone(&self.locks), self.lock_timeout)
    }
}

/// SQLite-backed placement store bound to one connection.
pub struct PlacementStore {
    conn: Connection,
    locks: Arc<ScopeLockRegistry>,
    lock_timeout: Duration,
}

impl PlacementStore {
    /// Creates a store with a private lock registry.
    ///
    /// Suitable when this is the only connection writing boards in-process.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        Self::with_locks(conn, Arc::new(ScopeLockRegistry::new()), DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates a store that shares `locks` with other connections.
    pub fn with_locks(
        conn: Connection,
        locks: Arc<ScopeLockRegistry>,
        lock_timeout: Duration,
    ) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn,
            locks,
            lock_timeout,
        })
    }

    /// Underlying connection, for directory records owned by collaborators.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn lock_registry(&self) -> &Arc<ScopeLockRegistry> {
        &self.locks
    }

    /// Runs `read` against one consistent snapshot.
    pub fn read<T>(&self, read: impl FnOnce(&StoreTx<'_>) -> BoardResult<T>) -> BoardResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)?;
        let store_tx = StoreTx { tx };
        let value = read(&store_tx)?;
        store_tx.tx.commit()?;
        Ok(value)
    }

    /// Runs `write` atomically while holding every lock in `scopes`.
    ///
    /// # Errors
    /// - `Busy` when a scope lock or the database write lock is not granted
    ///   in time.
    /// - Any error returned by `write`; nothing is committed in that case.
    pub fn write<T>(
        &self,
        scopes: &[ScopeKey],
        write: impl FnOnce(&StoreTx<'_>) -> BoardResult<T>,
    ) -> BoardResult<T> {
        let guard = self
            .locks
            .acquire(scopes, self.lock_timeout)
            .map_err(|scope| BoardError::Busy(BusyReason::ScopeLocked(scope)))?;
        debug!(
            "event=scope_lock module=store status=ok scopes={}",
            guard.keys().len()
        );

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let store_tx = StoreTx { tx };
        let value = write(&store_tx)?;
        store_tx.tx.commit()?;
        drop(guard);
        Ok(value)
    }

    /// Resolves the board that owns `column_uuid`.
    pub fn board_of_column(&self, column_uuid: ColumnId) -> BoardResult<Option<BoardId>> {
        self.read(|tx| Ok(tx.get_column(column_uuid)?.map(|column| column.board_uuid)))
    }

    /// Resolves the board that owns `placement_uuid`.
    pub fn board_of_placement(&self, placement_uuid: PlacementId) -> BoardResult<Option<BoardId>> {
        self.read(|tx| {
            Ok(tx
                .get_placement(placement_uuid)?
                .map(|placement| placement.board_uuid))
        })
    }
}

/// Open transaction on the placement store.
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn get_board(&self, board_uuid: BoardId) -> StoreResult<Option<Board>> {
        self.query_one(
            "SELECT board_uuid, project_uuid, created_at, updated_at
             FROM boards
             WHERE board_uuid = ?1;",
            [board_uuid.to_string()],
            parse_board_row,
        )
    }

    /// Earliest-created board of a project.
    pub fn first_board_of_project(&self, project_uuid: ProjectId) -> StoreResult<Option<Board>> {
        self.query_one(
            "SELECT board_uuid, project_uuid, created_at, updated_at
             FROM boards
             WHERE project_uuid = ?1
             ORDER BY created_at ASC, board_uuid ASC
             LIMIT 1;",
            [project_uuid.to_string()],
            parse_board_row,
        )
    }

    pub fn project_exists(&self, project_uuid: ProjectId) -> StoreResult<bool> {
        let exists: i64 = self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE project_uuid = ?1);",
            [project_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Owning project of a task, or `None` for an unknown task.
    pub fn task_project(&self, task_uuid: TaskId) -> StoreResult<Option<ProjectId>> {
        let value: Option<String> = self.query_one(
            "SELECT project_uuid FROM tasks WHERE task_uuid = ?1;",
            [task_uuid.to_string()],
            |row| Ok(row.get(0)?),
        )?;
        value
            .map(|value| parse_uuid(&value, "tasks.project_uuid"))
            .transpose()
    }

    pub fn get_column(&self, column_uuid: ColumnId) -> StoreResult<Option<BoardColumn>> {
        self.query_one(
            "SELECT column_uuid, board_uuid, title, position, created_at
             FROM board_columns
             WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
            parse_column_row,
        )
    }

    pub fn list_columns(&self, board_uuid: BoardId) -> StoreResult<Vec<BoardColumn>> {
        self.query_all(
            "SELECT column_uuid, board_uuid, title, position, created_at
             FROM board_columns
             WHERE board_uuid = ?1
             ORDER BY position ASC, column_uuid ASC;",
            [board_uuid.to_string()],
            parse_column_row,
        )
    }

    pub fn count_columns(&self, board_uuid: BoardId) -> StoreResult<i64> {
        let count = self.tx.query_row(
            "SELECT COUNT(*) FROM board_columns WHERE board_uuid = ?1;",
            [board_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_placement(&self, placement_uuid: PlacementId) -> StoreResult<Option<Placement>> {
        self.query_one(
            "SELECT placement_uuid, column_uuid, board_uuid, task_uuid, position
             FROM placements
             WHERE placement_uuid = ?1;",
            [placement_uuid.to_string()],
            parse_placement_row,
        )
    }

    pub fn list_placements(&self, column_uuid: ColumnId) -> StoreResult<Vec<Placement>> {
        self.query_all(
            "SELECT placement_uuid, column_uuid, board_uuid, task_uuid, position
             FROM placements
             WHERE column_uuid = ?1
             ORDER BY position ASC, placement_uuid ASC;",
            [column_uuid.to_string()],
            parse_placement_row,
        )
    }

    pub fn count_placements(&self, column_uuid: ColumnId) -> StoreResult<i64> {
        let count = self.tx.query_row(
            "SELECT COUNT(*) FROM placements WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Live placement of `task_uuid` anywhere on `board_uuid`.
    pub fn placement_of_task(
        &self,
        board_uuid: BoardId,
        task_uuid: TaskId,
    ) -> StoreResult<Option<Placement>> {
        self.query_one(
            "SELECT placement_uuid, column_uuid, board_uuid, task_uuid, position
             FROM placements
             WHERE board_uuid = ?1
               AND task_uuid = ?2;",
            [board_uuid.to_string(), task_uuid.to_string()],
            parse_placement_row,
        )
    }

    /// Cards of one column in placement order.
    pub fn column_cards(&self, column_uuid: ColumnId) -> StoreResult<Vec<PlacementCard>> {
        self.query_all(
            &format!(
                "{CARD_SELECT_SQL}
                 WHERE p.column_uuid = ?1
                 ORDER BY p.position ASC, p.placement_uuid ASC;"
            ),
            [column_uuid.to_string()],
            parse_card_row,
        )
    }

    /// Cards of one board in (column position, placement position) order.
    pub fn board_cards(&self, board_uuid: BoardId) -> StoreResult<Vec<PlacementCard>> {
        self.query_all(
            &format!(
                "{CARD_SELECT_SQL}
                 WHERE p.board_uuid = ?1
                 ORDER BY c.position ASC, c.column_uuid ASC, p.position ASC, p.placement_uuid ASC;"
            ),
            [board_uuid.to_string()],
            parse_card_row,
        )
    }

    pub fn insert_board(&self, board: &Board) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO boards (board_uuid, project_uuid, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                board.board_uuid.to_string(),
                board.project_uuid.to_string(),
                board.created_at,
                board.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Stamps `updated_at` on a board after an applied mutation.
    pub fn touch_board(&self, board_uuid: BoardId, now_ms: i64) -> StoreResult<()> {
        self.tx.execute(
            "UPDATE boards SET updated_at = ?2 WHERE board_uuid = ?1;",
            params![board_uuid.to_string(), now_ms],
        )?;
        Ok(())
    }

    pub fn insert_column(&self, column: &BoardColumn) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO board_columns (column_uuid, board_uuid, title, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                column.column_uuid.to_string(),
                column.board_uuid.to_string(),
                column.title.as_str(),
                column.position,
                column.created_at,
            ],
        )?;
        Ok(())
    }

    /// Returns the number of changed rows.
    pub fn rename_column(&self, column_uuid: ColumnId, title: &str) -> StoreResult<usize> {
        let changed = self.tx.execute(
            "UPDATE board_columns SET title = ?2 WHERE column_uuid = ?1;",
            params![column_uuid.to_string(), title],
        )?;
        Ok(changed)
    }

    /// Deletes a column and, explicitly, every placement it owns.
    pub fn delete_column(&self, column_uuid: ColumnId) -> StoreResult<()> {
        let removed = self.tx.execute(
            "DELETE FROM placements WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
        )?;
        self.tx.execute(
            "DELETE FROM board_columns WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
        )?;
        debug!("event=column_cascade module=store status=ok placements_removed={removed}");
        Ok(())
    }

    pub fn shift_columns(&self, board_uuid: BoardId, shift: PositionShift) -> StoreResult<usize> {
        let changed = self.tx.execute(
            "UPDATE board_columns
             SET position = position + ?4
             WHERE board_uuid = ?1
               AND position BETWEEN ?2 AND ?3;",
            params![board_uuid.to_string(), shift.from, shift.to, shift.delta],
        )?;
        Ok(changed)
    }

    pub fn set_column_position(&self, column_uuid: ColumnId, position: i64) -> StoreResult<()> {
        self.tx.execute(
            "UPDATE board_columns SET position = ?2 WHERE column_uuid = ?1;",
            params![column_uuid.to_string(), position],
        )?;
        Ok(())
    }

    pub fn insert_placement(&self, placement: &Placement) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO placements (placement_uuid, column_uuid, board_uuid, task_uuid, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                placement.placement_uuid.to_string(),
                placement.column_uuid.to_string(),
                placement.board_uuid.to_string(),
                placement.task_uuid.to_string(),
                placement.position,
            ],
        )?;
        Ok(())
    }

    pub fn delete_placement(&self, placement_uuid: PlacementId) -> StoreResult<()> {
        self.tx.execute(
            "DELETE FROM placements WHERE placement_uuid = ?1;",
            [placement_uuid.to_string()],
        )?;
        Ok(())
    }

    pub fn shift_placements(
        &self,
        column_uuid: ColumnId,
        shift: PositionShift,
    ) -> StoreResult<usize> {
        let changed = self.tx.execute(
            "UPDATE placements
             SET position = position + ?4
             WHERE column_uuid = ?1
               AND position BETWEEN ?2 AND ?3;",
            params![column_uuid.to_string(), shift.from, shift.to, shift.delta],
        )?;
        Ok(changed)
    }

    /// Writes a placement's column and position.
    pub fn set_placement_slot(
        &self,
        placement_uuid: PlacementId,
        column_uuid: ColumnId,
        position: i64,
    ) -> StoreResult<()> {
        self.tx.execute(
            "UPDATE placements
             SET column_uuid = ?2,
                 position = ?3
             WHERE placement_uuid = ?1;",
            params![placement_uuid.to_string(), column_uuid.to_string(), position],
        )?;
        Ok(())
    }

    /// Fails with `BrokenOrdering` unless the board's column positions are dense.
    pub fn verify_column_order(&self, board_uuid: BoardId) -> StoreResult<()> {
        let positions: Vec<i64> = self.query_all(
            "SELECT position FROM board_columns WHERE board_uuid = ?1;",
            [board_uuid.to_string()],
            |row| Ok(row.get(0)?),
        )?;
        if is_dense(&positions) {
            return Ok(());
        }
        Err(StoreError::BrokenOrdering(ScopeKey::Board(board_uuid)))
    }

    /// Fails with `BrokenOrdering` unless the column's placement positions are dense.
    pub fn verify_placement_order(&self, column_uuid: ColumnId) -> StoreResult<()> {
        let positions: Vec<i64> = self.query_all(
            "SELECT position FROM placements WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
            |row| Ok(row.get(0)?),
        )?;
        if is_dense(&positions) {
            return Ok(());
        }
        Err(StoreError::BrokenOrdering(ScopeKey::Column(column_uuid)))
    }

    fn query_one<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        parse: fn(&Row<'_>) -> StoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let mut stmt = self.tx.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse(row)?)),
            None => Ok(None),
        }
    }

    fn query_all<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        parse: fn(&Row<'_>) -> StoreResult<T>,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = self.tx.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }
        Ok(items)
    }
}

fn parse_board_row(row: &Row<'_>) -> StoreResult<Board> {
    let board_uuid: String = row.get("board_uuid")?;
    let project_uuid: String = row.get("project_uuid")?;
    Ok(Board {
        board_uuid: parse_uuid(&board_uuid, "boards.board_uuid")?,
        project_uuid: parse_uuid(&project_uuid, "boards.project_uuid")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_column_row(row: &Row<'_>) -> StoreResult<BoardColumn> {
    let column_uuid: String = row.get("column_uuid")?;
    let board_uuid: String = row.get("board_uuid")?;
    Ok(BoardColumn {
        column_uuid: parse_uuid(&column_uuid, "board_columns.column_uuid")?,
        board_uuid: parse_uuid(&board_uuid, "board_columns.board_uuid")?,
        title: row.get("title")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_placement_row(row: &Row<'_>) -> StoreResult<Placement> {
    let placement_uuid: String = row.get("placement_uuid")?;
    let column_uuid: String = row.get("column_uuid")?;
    let board_uuid: String = row.get("board_uuid")?;
    let task_uuid: String = row.get("task_uuid")?;
    Ok(Placement {
        placement_uuid: parse_uuid(&placement_uuid, "placements.placement_uuid")?,
        column_uuid: parse_uuid(&column_uuid, "placements.column_uuid")?,
        board_uuid: parse_uuid(&board_uuid, "placements.board_uuid")?,
        task_uuid: parse_uuid(&task_uuid, "placements.task_uuid")?,
        position: row.get("position")?,
    })
}

fn parse_card_row(row: &Row<'_>) -> StoreResult<PlacementCard> {
    let placement_uuid: String = row.get("placement_uuid")?;
    let board_uuid: String = row.get("board_uuid")?;
    let column_uuid: String = row.get("column_uuid")?;
    let task_uuid: String = row.get("task_uuid")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(PlacementCard {
        placement_uuid: parse_uuid(&placement_uuid, "placements.placement_uuid")?,
        board_uuid: parse_uuid(&board_uuid, "placements.board_uuid")?,
        column_uuid: parse_uuid(&column_uuid, "placements.column_uuid")?,
        column_number: row.get("column_number")?,
        position: row.get("position")?,
        task_uuid: parse_uuid(&task_uuid, "tasks.task_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        assignee_uuid: parse_optional_uuid(row.get("assignee_uuid")?, "tasks.assignee_uuid")?,
        assignee_name: row.get("assignee_name")?,
        deadline: row.get("deadline")?,
    })
}
