use crate::cli::*;
use anyhow::{bail, Context};
use log::info;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use taskboard_core::model::now_epoch_ms;
use taskboard_core::{
    init_logging_from_config, BoardApi, DirectoryRepository, EngineConfig, PlacementStore,
    Project, ProjectRoleGate, SqliteDirectoryRepository, StoreHandle, TaskContent, UserId,
};
use uuid::Uuid;

type Api<'s> = BoardApi<'s, ProjectRoleGate<SqliteDirectoryRepository<'s>>>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir.clone();
    }
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .context("no database given; pass --db or set database_path in the config")?;
    let store = StoreHandle::new(db_path, &config).connect()?;
    let gate = ProjectRoleGate::new(SqliteDirectoryRepository::try_new(store.connection())?);
    let api = BoardApi::with_config(&store, gate, &config);

    let started_at = Instant::now();
    let name = cli.command.name();
    let user = cli.user;
    let result = match cli.command {
        Command::Project(args) => cmd_project(&store, user, args.action),
        Command::Member(args) => cmd_member(&store, user, args.action),
        Command::Task(args) => cmd_task(&store, args.action),
        Command::Board(args) => cmd_board(&api, user, args.action),
        Command::Column(args) => cmd_column(&api, user, args.action),
        Command::Placement(args) => cmd_placement(&api, user, args.action),
    };
    info!(
        "event=cli_command module=cli status={} command={name} duration_ms={}",
        if result.is_ok() { "ok" } else { "error" },
        started_at.elapsed().as_millis()
    );
    result
}

fn cmd_project(
    store: &PlacementStore,
    user: Option<UserId>,
    action: ProjectAction,
) -> anyhow::Result<()> {
    let owner = acting_user(user)?;
    let directory = SqliteDirectoryRepository::try_new(store.connection())?;
    match action {
        ProjectAction::Create { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("project name must not be blank");
            }
            let now = now_epoch_ms();
            let project = Project {
                project_uuid: Uuid::new_v4(),
                name: name.to_string(),
                owner_uuid: owner,
                created_at: now,
                updated_at: now,
            };
            directory.create_project(&project)?;
            print_json(&project)
        }
    }
}

fn cmd_member(
    store: &PlacementStore,
    user: Option<UserId>,
    action: MemberAction,
) -> anyhow::Result<()> {
    let acting = acting_user(user)?;
    let directory = SqliteDirectoryRepository::try_new(store.connection())?;
    match action {
        MemberAction::Set {
            project,
            member,
            role,
        } => {
            let record = directory
                .get_project(project)?
                .with_context(|| format!("project not found: {project}"))?;
            if record.owner_uuid != acting {
                bail!("only the project owner can change member roles");
            }
            if member == record.owner_uuid {
                bail!("the project owner cannot also hold a member role");
            }
            directory.set_member_role(project, member, role.into(), now_epoch_ms())?;
            print_json(&json!({
                "project_uuid": project,
                "user_uuid": member,
                "role": taskboard_core::ProjectRole::from(role),
            }))
        }
    }
}

fn cmd_task(store: &PlacementStore, action: TaskAction) -> anyhow::Result<()> {
    let directory = SqliteDirectoryRepository::try_new(store.connection())?;
    match action {
        TaskAction::Create(args) => {
            if directory.get_project(args.project)?.is_none() {
                bail!("project not found: {}", args.project);
            }
            if args.title.trim().is_empty() {
                bail!("task title must not be blank");
            }
            let mut task = TaskContent::new(args.project, args.title.trim());
            task.description = args.description;
            task.status = args.status.into();
            task.priority = args.priority.into();
            task.assignee_uuid = args.assignee;
            task.assignee_name = args.assignee_name;
            task.deadline = args.deadline;
            directory.create_task(&task, now_epoch_ms())?;
            print_json(&task)
        }
    }
}

fn cmd_board(api: &Api<'_>, user: Option<UserId>, action: BoardAction) -> anyhow::Result<()> {
    let user = acting_user(user)?;
    match action {
        BoardAction::Create { project } => print_json(&api.create_board(user, project)?),
        BoardAction::Get { board } => print_json(&api.get_board(user, board)?),
        BoardAction::ShowProject { project } => {
            print_json(&api.get_project_board(user, project)?)
        }
        BoardAction::Cards { board } => print_json(&api.board_cards(user, board)?),
    }
}

fn cmd_column(api: &Api<'_>, user: Option<UserId>, action: ColumnAction) -> anyhow::Result<()> {
    let user = acting_user(user)?;
    match action {
        ColumnAction::Add { board, title } => print_json(&api.add_column(user, board, &title)?),
        ColumnAction::Rename { column, title } => {
            print_json(&api.rename_column(user, column, &title)?)
        }
        ColumnAction::Delete { column } => {
            api.delete_column(user, column)?;
            print_json(&json!({ "deleted_column": column }))
        }
        ColumnAction::Reorder { board, order } => {
            print_json(&api.reorder_columns(user, board, &order)?)
        }
        ColumnAction::List { board } => print_json(&api.list_columns(user, board)?),
        ColumnAction::Cards { column } => print_json(&api.column_cards(user, column)?),
    }
}

fn cmd_placement(
    api: &Api<'_>,
    user: Option<UserId>,
    action: PlacementAction,
) -> anyhow::Result<()> {
    let user = acting_user(user)?;
    match action {
        PlacementAction::Add {
            column,
            task,
            position,
        } => print_json(&api.add_placement(user, column, task, position)?),
        PlacementAction::Remove { placement } => {
            api.remove_placement(user, placement)?;
            print_json(&json!({ "removed_placement": placement }))
        }
        PlacementAction::Move {
            placement,
            column,
            position,
        } => print_json(&api.move_placement(user, placement, column, position)?),
    }
}

fn acting_user(user: Option<UserId>) -> anyhow::Result<UserId> {
    user.context("this command needs the acting user; pass --user <UUID>")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
