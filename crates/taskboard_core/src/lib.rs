//! Ordered placement engine for project task boards.
//! This crate owns board, column and placement ordering invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_timeout, DbError};
pub use error::{Access, BoardError, BoardResult, BusyReason, EntityKind, ValidationError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::board::{
    Board, BoardColumn, BoardId, ColumnId, Placement, PlacementId, ProjectId, TaskId, UserId,
};
pub use model::directory::{Project, ProjectRole, Standing, TaskContent, TaskPriority, TaskStatus};
pub use model::view::{BoardView, ColumnView, PlacementCard};
pub use repo::directory_repo::{DirectoryRepository, SqliteDirectoryRepository};
pub use repo::placement_store::{PlacementStore, StoreHandle};
pub use repo::scope_lock::{ScopeKey, ScopeLockRegistry};
pub use repo::{StoreError, StoreResult};
pub use service::access_gate::{AccessGate, ProjectRoleGate};
pub use service::board_api::BoardApi;
pub use service::board_view::BoardAggregateBuilder;
pub use service::column_engine::ColumnOrderingEngine;
pub use service::task_engine::TaskOrderingEngine;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
