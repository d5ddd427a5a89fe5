use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    Board, BoardError, ColumnId, ColumnOrderingEngine, DirectoryRepository, EntityKind,
    PlacementStore, Project, ProjectId, SqliteDirectoryRepository, TaskContent, TaskId,
    TaskOrderingEngine, ValidationError,
};
use uuid::Uuid;

struct Fixture {
    store: PlacementStore,
    project: ProjectId,
}

impl Fixture {
    fn new() -> Self {
        let store = PlacementStore::try_new(open_db_in_memory().unwrap()).unwrap();
        let project = Project {
            project_uuid: Uuid::new_v4(),
            name: "Release".to_string(),
            owner_uuid: Uuid::new_v4(),
            created_at: 1,
            updated_at: 1,
        };
        SqliteDirectoryRepository::try_new(store.connection())
            .unwrap()
            .create_project(&project)
            .unwrap();
        Self {
            store,
            project: project.project_uuid,
        }
    }

    fn board(&self, titles: &[&str]) -> (Board, Vec<ColumnId>) {
        let titles: Vec<String> = titles.iter().map(|title| (*title).to_string()).collect();
        let board = ColumnOrderingEngine::new(&self.store)
            .create_board(self.project, &titles)
            .unwrap();
        let columns = self
            .store
            .read(|tx| Ok(tx.list_columns(board.board_uuid)?))
            .unwrap()
            .into_iter()
            .map(|column| column.column_uuid)
            .collect();
        (board, columns)
    }

    fn task(&self, title: &str) -> TaskId {
        self.task_in(self.project, title)
    }

    fn task_in(&self, project: ProjectId, title: &str) -> TaskId {
        let task = TaskContent::new(project, title);
        SqliteDirectoryRepository::try_new(self.store.connection())
            .unwrap()
            .create_task(&task, 1)
            .unwrap();
        task.task_uuid
    }

    fn engine(&self) -> TaskOrderingEngine<'_> {
        TaskOrderingEngine::new(&self.store)
    }

    /// `(task, position)` pairs of a column in position order.
    fn layout(&self, column: ColumnId) -> Vec<(TaskId, i64)> {
        self.engine()
            .list_column(column)
            .unwrap()
            .into_iter()
            .map(|placement| (placement.task_uuid, placement.position))
            .collect()
    }
}

#[test]
fn add_without_position_appends() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");

    let first = fx.engine().add_placement(columns[0], t1, None).unwrap();
    let second = fx.engine().add_placement(columns[0], t2, None).unwrap();

    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);
    assert_eq!(fx.layout(columns[0]), vec![(t1, 0), (t2, 1)]);
}

#[test]
fn add_at_position_shifts_tail() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let t3 = fx.task("t3");
    fx.engine().add_placement(columns[0], t1, None).unwrap();
    fx.engine().add_placement(columns[0], t2, None).unwrap();

    fx.engine().add_placement(columns[0], t3, Some(1)).unwrap();

    assert_eq!(fx.layout(columns[0]), vec![(t1, 0), (t3, 1), (t2, 2)]);
}

#[test]
fn add_rejects_positions_past_the_end() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    fx.engine().add_placement(columns[0], t1, None).unwrap();

    let err = fx.engine().add_placement(columns[0], t2, Some(2)).unwrap_err();
    assert!(matches!(
        err,
        BoardError::Validation(ValidationError::PositionOutOfRange {
            position: 2,
            max: 1
        })
    ));
    let err = fx.engine().add_placement(columns[0], t2, Some(-1)).unwrap_err();
    assert_eq!(err.code(), "validation");
    assert_eq!(fx.layout(columns[0]), vec![(t1, 0)]);
}

#[test]
fn same_task_twice_on_one_board_conflicts() {
    let fx = Fixture::new();
    let (board, columns) = fx.board(&["To Do", "Done"]);
    let task = fx.task("Ship it");

    fx.engine().add_placement(columns[0], task, None).unwrap();
    let err = fx.engine().add_placement(columns[1], task, None).unwrap_err();

    match err {
        BoardError::Conflict { task: t, board: b } => {
            assert_eq!(t, task);
            assert_eq!(b, board.board_uuid);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fx.layout(columns[1]).is_empty());
}

#[test]
fn same_task_may_sit_on_two_boards() {
    let fx = Fixture::new();
    let (_, first) = fx.board(&["To Do"]);
    let (_, second) = fx.board(&["To Do"]);
    let task = fx.task("Shared");

    fx.engine().add_placement(first[0], task, None).unwrap();
    fx.engine().add_placement(second[0], task, None).unwrap();
}

#[test]
fn add_rejects_unknown_column_task_and_foreign_project() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let task = fx.task("Known");

    let err = fx
        .engine()
        .add_placement(Uuid::new_v4(), task, None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::NotFound {
            entity: EntityKind::Column,
            ..
        }
    ));

    let err = fx
        .engine()
        .add_placement(columns[0], Uuid::new_v4(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::NotFound {
            entity: EntityKind::Task,
            ..
        }
    ));

    let other_project = Project {
        project_uuid: Uuid::new_v4(),
        name: "Other".to_string(),
        owner_uuid: Uuid::new_v4(),
        created_at: 1,
        updated_at: 1,
    };
    SqliteDirectoryRepository::try_new(fx.store.connection())
        .unwrap()
        .create_project(&other_project)
        .unwrap();
    let foreign = fx.task_in(other_project.project_uuid, "Foreign");
    let err = fx
        .engine()
        .add_placement(columns[0], foreign, None)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::Validation(ValidationError::TaskOutsideProject { .. })
    ));
}

#[test]
fn add_then_remove_restores_sequence() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let t3 = fx.task("t3");
    fx.engine().add_placement(columns[0], t1, None).unwrap();
    fx.engine().add_placement(columns[0], t2, None).unwrap();
    let before = fx.layout(columns[0]);

    let added = fx.engine().add_placement(columns[0], t3, Some(0)).unwrap();
    fx.engine().remove_placement(added.placement_uuid).unwrap();

    assert_eq!(fx.layout(columns[0]), before);
}

#[test]
fn remove_closes_gap() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let t3 = fx.task("t3");
    fx.engine().add_placement(columns[0], t1, None).unwrap();
    let middle = fx.engine().add_placement(columns[0], t2, None).unwrap();
    fx.engine().add_placement(columns[0], t3, None).unwrap();

    fx.engine().remove_placement(middle.placement_uuid).unwrap();

    assert_eq!(fx.layout(columns[0]), vec![(t1, 0), (t3, 1)]);
    let err = fx
        .engine()
        .remove_placement(middle.placement_uuid)
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::NotFound {
            entity: EntityKind::Placement,
            ..
        }
    ));
}

#[test]
fn move_forward_within_column() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let t3 = fx.task("t3");
    let moved = fx.engine().add_placement(columns[0], t1, None).unwrap();
    fx.engine().add_placement(columns[0], t2, None).unwrap();
    fx.engine().add_placement(columns[0], t3, None).unwrap();

    let result = fx
        .engine()
        .move_placement(moved.placement_uuid, columns[0], 2)
        .unwrap();

    assert_eq!(result.position, 2);
    assert_eq!(fx.layout(columns[0]), vec![(t2, 0), (t3, 1), (t1, 2)]);
}

#[test]
fn move_backward_within_column() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let tasks: Vec<TaskId> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|title| fx.task(title))
        .collect();
    let mut placements = Vec::new();
    for task in &tasks {
        placements.push(fx.engine().add_placement(columns[0], *task, None).unwrap());
    }

    fx.engine()
        .move_placement(placements[3].placement_uuid, columns[0], 1)
        .unwrap();

    assert_eq!(
        fx.layout(columns[0]),
        vec![
            (tasks[0], 0),
            (tasks[3], 1),
            (tasks[1], 2),
            (tasks[2], 3),
            (tasks[4], 4),
        ]
    );
}

#[test]
fn move_to_current_slot_changes_nothing() {
    let fx = Fixture::new();
    let (board, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    fx.engine().add_placement(columns[0], t1, None).unwrap();
    let second = fx.engine().add_placement(columns[0], t2, None).unwrap();
    fx.store
        .connection()
        .execute(
            "UPDATE boards SET updated_at = 7 WHERE board_uuid = ?1;",
            [board.board_uuid.to_string()],
        )
        .unwrap();
    let before = fx.engine().list_board(board.board_uuid).unwrap();

    let result = fx
        .engine()
        .move_placement(second.placement_uuid, columns[0], 1)
        .unwrap();

    assert_eq!(result, second);
    assert_eq!(fx.engine().list_board(board.board_uuid).unwrap(), before);
    let stamped = fx
        .store
        .read(|tx| Ok(tx.get_board(board.board_uuid)?))
        .unwrap()
        .unwrap();
    assert_eq!(stamped.updated_at, 7);
}

#[test]
fn move_within_column_rejects_end_slot() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["To Do"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let first = fx.engine().add_placement(columns[0], t1, None).unwrap();
    fx.engine().add_placement(columns[0], t2, None).unwrap();

    let err = fx
        .engine()
        .move_placement(first.placement_uuid, columns[0], 2)
        .unwrap_err();

    assert!(matches!(
        err,
        BoardError::Validation(ValidationError::PositionOutOfRange {
            position: 2,
            max: 1
        })
    ));
    assert_eq!(fx.layout(columns[0]), vec![(t1, 0), (t2, 1)]);
}

#[test]
fn move_across_columns_reindexes_both() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["X", "Y"]);
    let (x, y) = (columns[0], columns[1]);
    let a = fx.task("a");
    let t = fx.task("t");
    let b = fx.task("b");
    let c = fx.task("c");
    let d = fx.task("d");
    fx.engine().add_placement(x, a, None).unwrap();
    let moving = fx.engine().add_placement(x, t, None).unwrap();
    fx.engine().add_placement(x, b, None).unwrap();
    fx.engine().add_placement(y, c, None).unwrap();
    fx.engine().add_placement(y, d, None).unwrap();

    let moved = fx
        .engine()
        .move_placement(moving.placement_uuid, y, 0)
        .unwrap();

    assert_eq!(moved.column_uuid, y);
    assert_eq!(moved.position, 0);
    assert_eq!(moved.placement_uuid, moving.placement_uuid);
    assert_eq!(fx.layout(x), vec![(a, 0), (b, 1)]);
    assert_eq!(fx.layout(y), vec![(t, 0), (c, 1), (d, 2)]);
}

#[test]
fn move_across_columns_may_append() {
    let fx = Fixture::new();
    let (_, columns) = fx.board(&["X", "Y"]);
    let a = fx.task("a");
    let c = fx.task("c");
    let moving = fx.engine().add_placement(columns[0], a, None).unwrap();
    fx.engine().add_placement(columns[1], c, None).unwrap();

    fx.engine()
        .move_placement(moving.placement_uuid, columns[1], 1)
        .unwrap();

    assert!(fx.layout(columns[0]).is_empty());
    assert_eq!(fx.layout(columns[1]), vec![(c, 0), (a, 1)]);

    let err = fx
        .engine()
        .move_placement(moving.placement_uuid, columns[0], 1)
        .unwrap_err();
    assert_eq!(err.code(), "validation");
}

#[test]
fn move_to_another_board_is_rejected() {
    let fx = Fixture::new();
    let (_, first) = fx.board(&["X"]);
    let (_, second) = fx.board(&["Y"]);
    let task = fx.task("t");
    let placement = fx.engine().add_placement(first[0], task, None).unwrap();

    let err = fx
        .engine()
        .move_placement(placement.placement_uuid, second[0], 0)
        .unwrap_err();

    assert!(matches!(
        err,
        BoardError::Validation(ValidationError::CrossBoardMove { .. })
    ));
    assert_eq!(fx.layout(first[0]), vec![(task, 0)]);
    assert!(fx.layout(second[0]).is_empty());
}

#[test]
fn list_board_orders_by_column_then_position() {
    let fx = Fixture::new();
    let (board, columns) = fx.board(&["A", "B"]);
    let t1 = fx.task("t1");
    let t2 = fx.task("t2");
    let t3 = fx.task("t3");
    fx.engine().add_placement(columns[1], t1, None).unwrap();
    fx.engine().add_placement(columns[0], t2, None).unwrap();
    fx.engine().add_placement(columns[0], t3, Some(0)).unwrap();

    let order: Vec<TaskId> = fx
        .engine()
        .list_board(board.board_uuid)
        .unwrap()
        .into_iter()
        .map(|placement| placement.task_uuid)
        .collect();

    assert_eq!(order, vec![t3, t2, t1]);
}

#[test]
fn failed_cross_column_move_rolls_back_applied_shifts() {
    let fx = Fixture::new();
    let (board, columns) = fx.board(&["X", "Y"]);
    let (x, y) = (columns[0], columns[1]);
    let a = fx.task("a");
    let t = fx.task("t");
    let b = fx.task("b");
    let c = fx.task("c");
    fx.engine().add_placement(x, a, None).unwrap();
    let moving = fx.engine().add_placement(x, t, None).unwrap();
    fx.engine().add_placement(x, b, None).unwrap();
    fx.engine().add_placement(y, c, None).unwrap();
    let before = fx.engine().list_board(board.board_uuid).unwrap();

    // Both position shifts run before the moved row changes column.
    fx.store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_column_change
             BEFORE UPDATE OF column_uuid ON placements
             BEGIN
                 SELECT RAISE(ABORT, 'column change rejected');
             END;",
        )
        .unwrap();

    let err = fx
        .engine()
        .move_placement(moving.placement_uuid, y, 0)
        .unwrap_err();

    assert!(matches!(err, BoardError::Store(_)));
    assert!(!err.is_retryable());
    assert_eq!(fx.engine().list_board(board.board_uuid).unwrap(), before);
    assert_eq!(fx.layout(x), vec![(a, 0), (t, 1), (b, 2)]);
    assert_eq!(fx.layout(y), vec![(c, 0)]);
}
