//! Records owned by external collaborators.
//!
//! Projects, memberships and task content live outside the placement engine.
//! Core only reads them: task content is joined into board views, and
//! ownership/roles feed the access gate.

use crate::model::board::{ProjectId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project record as seen by the board engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_uuid: ProjectId,
    pub name: String,
    pub owner_uuid: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Role of a non-owner project member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    ProjectManager,
    TeamMember,
    Spectator,
}

impl ProjectRole {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectManager => "project_manager",
            Self::TeamMember => "team_member",
            Self::Spectator => "spectator",
        }
    }

    /// Parses a storage/wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project_manager" => Some(Self::ProjectManager),
            "team_member" => Some(Self::TeamMember),
            "spectator" => Some(Self::Spectator),
            _ => None,
        }
    }
}

/// Relationship between one user and one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Owner,
    Member(ProjectRole),
    Outsider,
}

/// Task lifecycle state, owned by the task content subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Task urgency, owned by the task content subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Task content displayed on board cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub task_uuid: TaskId,
    pub project_uuid: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_uuid: Option<UserId>,
    pub assignee_name: Option<String>,
    /// Calendar date in `YYYY-MM-DD` form.
    pub deadline: Option<String>,
}

impl TaskContent {
    /// Creates pending, medium-priority, unassigned task content.
    pub fn new(project_uuid: ProjectId, title: impl Into<String>) -> Self {
        Self {
            task_uuid: Uuid::new_v4(),
            project_uuid,
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            assignee_uuid: None,
            assignee_name: None,
            deadline: None,
        }
    }
}
