use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use taskboard_core::{ProjectRole, TaskPriority, TaskStatus};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "taskboard",
    about = "Ordered project task boards backed by SQLite",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database file; overrides `database_path` from the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML engine config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true)]
    pub user: Option<Uuid>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage projects
    Project(ProjectArgs),
    /// Manage project membership
    Member(MemberArgs),
    /// Manage task content
    Task(TaskArgs),
    /// Create and inspect boards
    Board(BoardArgs),
    /// Add, rename, delete and reorder columns
    Column(ColumnArgs),
    /// Add, remove and move task placements
    Placement(PlacementArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Member(_) => "member",
            Self::Task(_) => "task",
            Self::Board(_) => "board",
            Self::Column(_) => "column",
            Self::Placement(_) => "placement",
        }
    }
}

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project owned by the acting user
    Create {
        #[arg(long)]
        name: String,
    },
}

#[derive(Args)]
pub struct MemberArgs {
    #[command(subcommand)]
    pub action: MemberAction,
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Grant or change a member's role (project owner only)
    Set {
        #[arg(long)]
        project: Uuid,
        #[arg(long)]
        member: Uuid,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    ProjectManager,
    TeamMember,
    Spectator,
}

impl From<RoleArg> for ProjectRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::ProjectManager => Self::ProjectManager,
            RoleArg::TeamMember => Self::TeamMember,
            RoleArg::Spectator => Self::Spectator,
        }
    }
}

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create task content in a project
    Create(TaskCreateArgs),
}

#[derive(Args)]
pub struct TaskCreateArgs {
    #[arg(long)]
    pub project: Uuid,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum, default_value = "pending")]
    pub status: StatusArg,
    #[arg(long, value_enum, default_value = "medium")]
    pub priority: PriorityArg,
    #[arg(long)]
    pub assignee: Option<Uuid>,
    #[arg(long)]
    pub assignee_name: Option<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Pending,
    InProgress,
    Completed,
    OnHold,
    Canceled,
}

impl From<StatusArg> for TaskStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Completed => Self::Completed,
            StatusArg::OnHold => Self::OnHold,
            StatusArg::Canceled => Self::Canceled,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<PriorityArg> for TaskPriority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Critical => Self::Critical,
        }
    }
}

#[derive(Args)]
pub struct BoardArgs {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Create a board with the configured starter columns
    Create {
        #[arg(long)]
        project: Uuid,
    },
    /// Show a board with ordered columns and cards
    Get {
        #[arg(long)]
        board: Uuid,
    },
    /// Show the first board of a project
    ShowProject {
        #[arg(long)]
        project: Uuid,
    },
    /// List every card of a board in board order
    Cards {
        #[arg(long)]
        board: Uuid,
    },
}

#[derive(Args)]
pub struct ColumnArgs {
    #[command(subcommand)]
    pub action: ColumnAction,
}

#[derive(Subcommand)]
pub enum ColumnAction {
    /// Append a column to a board
    Add {
        #[arg(long)]
        board: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Rename a column
    Rename {
        #[arg(long)]
        column: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Delete a column and its placements
    Delete {
        #[arg(long)]
        column: Uuid,
    },
    /// Reorder all columns of a board
    Reorder {
        #[arg(long)]
        board: Uuid,
        /// Every column id of the board, comma separated, in the new order
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<Uuid>,
    },
    /// List a board's columns in order, without cards
    List {
        #[arg(long)]
        board: Uuid,
    },
    /// List the cards of one column
    Cards {
        #[arg(long)]
        column: Uuid,
    },
}

#[derive(Args)]
pub struct PlacementArgs {
    #[command(subcommand)]
    pub action: PlacementAction,
}

#[derive(Subcommand)]
pub enum PlacementAction {
    /// Place a task in a column, appending unless a position is given
    Add {
        #[arg(long)]
        column: Uuid,
        #[arg(long)]
        task: Uuid,
        #[arg(long)]
        position: Option<i64>,
    },
    /// Remove a placement
    Remove {
        #[arg(long)]
        placement: Uuid,
    },
    /// Move a placement within or across columns of one board
    Move {
        #[arg(long)]
        placement: Uuid,
        #[arg(long)]
        column: Uuid,
        #[arg(long)]
        position: i64,
    },
}
