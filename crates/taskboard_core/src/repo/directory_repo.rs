//! Directory repository: projects, memberships and task content.
//!
//! # Responsibility
//! - Persist the collaborator-owned records the board engine reads.
//! - Resolve a user's standing in a project for the access gate.
//!
//! # Invariants
//! - The project owner is never stored as a member row; ownership wins over
//!   any role.
//! - Unknown projects and boards resolve to `None`, never to `Outsider`.

use crate::model::board::{BoardId, ProjectId, TaskId, UserId};
use crate::model::directory::{
    Project, ProjectRole, Standing, TaskContent, TaskPriority, TaskStatus,
};
use crate::repo::{ensure_connection_ready, parse_optional_uuid, parse_uuid, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for directory records.
pub trait DirectoryRepository {
    fn create_project(&self, project: &Project) -> StoreResult<()>;
    fn get_project(&self, project_uuid: ProjectId) -> StoreResult<Option<Project>>;
    /// Inserts or replaces the role of `user_uuid` in a project.
    fn set_member_role(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
        role: ProjectRole,
        now_ms: i64,
    ) -> StoreResult<()>;
    fn create_task(&self, task: &TaskContent, now_ms: i64) -> StoreResult<()>;
    fn get_task(&self, task_uuid: TaskId) -> StoreResult<Option<TaskContent>>;
    /// Standing of a user in a project; `None` for an unknown project.
    fn standing_in_project(
        &self,
        user_uuid: UserId,
        project_uuid: ProjectId,
    ) -> StoreResult<Option<Standing>>;
    /// Standing of a user in the project owning a board; `None` for an
    /// unknown board.
    fn standing_on_board(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
    ) -> StoreResult<Option<Standing>>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn create_project(&self, project: &Project) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO projects (project_uuid, name, owner_uuid, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                project.project_uuid.to_string(),
                project.name.as_str(),
                project.owner_uuid.to_string(),
                project.created_at,
                project.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_project(&self, project_uuid: ProjectId) -> StoreResult<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT project_uuid, name, owner_uuid, created_at, updated_at
                 FROM projects
                 WHERE project_uuid = ?1;",
                [project_uuid.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, name, owner, created_at, updated_at)| {
            Ok(Project {
                project_uuid: parse_uuid(&id, "projects.project_uuid")?,
                name,
                owner_uuid: parse_uuid(&owner, "projects.owner_uuid")?,
                created_at,
                updated_at,
            })
        })
        .transpose()
    }

    fn set_member_role(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
        role: ProjectRole,
        now_ms: i64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO project_members (project_uuid, user_uuid, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_uuid, user_uuid) DO UPDATE SET role = excluded.role;",
            params![
                project_uuid.to_string(),
                user_uuid.to_string(),
                role.as_str(),
                now_ms,
            ],
        )?;
        Ok(())
    }

    fn create_task(&self, task: &TaskContent, now_ms: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO tasks (
                task_uuid, project_uuid, title, description, status, priority,
                assignee_uuid, assignee_name, deadline, created_at, updated_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10);",
            params![
                task.task_uuid.to_string(),
                task.project_uuid.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                task.assignee_uuid.map(|id| id.to_string()),
                task.assignee_name.as_deref(),
                task.deadline.as_deref(),
                now_ms,
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, task_uuid: TaskId) -> StoreResult<Option<TaskContent>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_uuid, project_uuid, title, description, status, priority,
                    assignee_uuid, assignee_name, deadline
             FROM tasks
             WHERE task_uuid = ?1;",
        )?;
        let mut rows = stmt.query([task_uuid.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    fn standing_in_project(
        &self,
        user_uuid: UserId,
        project_uuid: ProjectId,
    ) -> StoreResult<Option<Standing>> {
        let owner: Option<String> = self
            .conn
            .query_row(
                "SELECT owner_uuid FROM projects WHERE project_uuid = ?1;",
                [project_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Ok(None);
        };
        if parse_uuid(&owner, "projects.owner_uuid")? == user_uuid {
            return Ok(Some(Standing::Owner));
        }

        let role: Option<String> = self
            .conn
            .query_row(
                "SELECT role
                 FROM project_members
                 WHERE project_uuid = ?1
                   AND user_uuid = ?2;",
                [project_uuid.to_string(), user_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match role {
            Some(value) => {
                let role = ProjectRole::parse(&value).ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "invalid role `{value}` in project_members.role"
                    ))
                })?;
                Ok(Some(Standing::Member(role)))
            }
            None => Ok(Some(Standing::Outsider)),
        }
    }

    fn standing_on_board(
        &self,
        user_uuid: UserId,
        board_uuid: BoardId,
    ) -> StoreResult<Option<Standing>> {
        let project: Option<String> = self
            .conn
            .query_row(
                "SELECT project_uuid FROM boards WHERE board_uuid = ?1;",
                [board_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match project {
            Some(value) => {
                let project_uuid = parse_uuid(&value, "boards.project_uuid")?;
                self.standing_in_project(user_uuid, project_uuid)
            }
            None => Ok(None),
        }
    }
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<TaskContent> {
    let task_uuid: String = row.get(0)?;
    let project_uuid: String = row.get(1)?;
    let status: String = row.get(4)?;
    let priority: String = row.get(5)?;

    Ok(TaskContent {
        task_uuid: parse_uuid(&task_uuid, "tasks.task_uuid")?,
        project_uuid: parse_uuid(&project_uuid, "tasks.project_uuid")?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: TaskStatus::parse(&status).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid task status `{status}` in tasks.status"))
        })?,
        priority: TaskPriority::parse(&priority).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid task priority `{priority}` in tasks.priority"
            ))
        })?,
        assignee_uuid: parse_optional_uuid(row.get(6)?, "tasks.assignee_uuid")?,
        assignee_name: row.get(7)?,
        deadline: row.get(8)?,
    })
}
