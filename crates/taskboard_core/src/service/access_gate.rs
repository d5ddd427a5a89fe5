//! Access gate contract and the project-role implementation.
//!
//! # Invariants
//! - A gate answers yes/no only; lookup failures deny and are logged.
//! - Owners and project managers can view and mutate; team members and
//!   spectators can only view.

use crate::model::board::{BoardId, ProjectId, UserId};
use crate::model::directory::{ProjectRole, Standing};
use crate::repo::directory_repo::DirectoryRepository;
use crate::repo::StoreResult;
use log::warn;

/// Authorization decisions consulted by the calling layer.
pub trait AccessGate {
    fn can_view(&self, user_uuid: UserId, board_uuid: BoardId) -> bool;
    fn can_mutate(&self, user_uuid: UserId, board_uuid: BoardId) -> bool;
    fn can_create_board(&self, user_uuid: UserId, project_uuid: ProjectId) -> bool;
}

/// Gate deciding from project ownership and membership roles.
pub struct ProjectRoleGate<R: DirectoryRepository> {
    directory: R,
}

impl<R: DirectoryRepository> ProjectRoleGate<R> {
    pub fn new(directory: R) -> Self {
        Self { directory }
    }
}

impl<R: DirectoryRepository> AccessGate for ProjectRoleGate<R> {
    fn can_view(&self, user_uuid: UserId, board_uuid: BoardId) -> bool {
        let standing = resolved(
            "view",
            self.directory.standing_on_board(user_uuid, board_uuid),
        );
        matches!(standing, Standing::Owner | Standing::Member(_))
    }

    fn can_mutate(&self, user_uuid: UserId, board_uuid: BoardId) -> bool {
        let standing = resolved(
            "mutate",
            self.directory.standing_on_board(user_uuid, board_uuid),
        );
        manages(standing)
    }

    fn can_create_board(&self, user_uuid: UserId, project_uuid: ProjectId) -> bool {
        let standing = resolved(
            "create_board",
            self.directory.standing_in_project(user_uuid, project_uuid),
        );
        manages(standing)
    }
}

fn manages(standing: Standing) -> bool {
    matches!(
        standing,
        Standing::Owner | Standing::Member(ProjectRole::ProjectManager)
    )
}

fn resolved(check: &'static str, lookup: StoreResult<Option<Standing>>) -> Standing {
    match lookup {
        Ok(Some(standing)) => standing,
        Ok(None) => Standing::Outsider,
        Err(err) => {
            warn!(
                "event=access_check module=gate status=error check={check} error_code=store error={err}"
            );
            Standing::Outsider
        }
    }
}
