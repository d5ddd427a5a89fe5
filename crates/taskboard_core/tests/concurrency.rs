use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use taskboard_core::db::open_db;
use taskboard_core::{
    BoardError, BoardResult, BusyReason, ColumnId, ColumnOrderingEngine, DirectoryRepository,
    EngineConfig, PlacementId, PlacementStore, Project, ProjectId, ScopeKey,
    SqliteDirectoryRepository, StoreHandle, TaskContent, TaskId, TaskOrderingEngine,
    ValidationError,
};
use uuid::Uuid;

const WORKERS: usize = 4;
const MOVES_PER_WORKER: usize = 30;
const MAX_ATTEMPTS: usize = 200;

struct Seeded {
    project: ProjectId,
    board: Uuid,
    columns: Vec<ColumnId>,
    placements: Vec<PlacementId>,
    tasks: Vec<TaskId>,
}

fn seed(store: &PlacementStore, column_count: usize, task_count: usize) -> Seeded {
    let repo = SqliteDirectoryRepository::try_new(store.connection()).unwrap();
    let project = Project {
        project_uuid: Uuid::new_v4(),
        name: "Load".to_string(),
        owner_uuid: Uuid::new_v4(),
        created_at: 1,
        updated_at: 1,
    };
    repo.create_project(&project).unwrap();

    let titles: Vec<String> = (0..column_count).map(|i| format!("Column {i}")).collect();
    let board = ColumnOrderingEngine::new(store)
        .create_board(project.project_uuid, &titles)
        .unwrap();
    let columns: Vec<ColumnId> = store
        .read(|tx| Ok(tx.list_columns(board.board_uuid)?))
        .unwrap()
        .into_iter()
        .map(|column| column.column_uuid)
        .collect();

    let engine = TaskOrderingEngine::new(store);
    let mut placements = Vec::new();
    let mut tasks = Vec::new();
    for i in 0..task_count {
        let task = TaskContent::new(project.project_uuid, format!("task {i}"));
        repo.create_task(&task, 1).unwrap();
        let placement = engine
            .add_placement(columns[i % column_count], task.task_uuid, None)
            .unwrap();
        placements.push(placement.placement_uuid);
        tasks.push(task.task_uuid);
    }

    Seeded {
        project: project.project_uuid,
        board: board.board_uuid,
        columns,
        placements,
        tasks,
    }
}

fn assert_dense(positions: &[i64]) {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    let expected: Vec<i64> = (0..sorted.len() as i64).collect();
    assert_eq!(sorted, expected);
}

/// Retries `op` on `Busy`, and on a slot that vanished between reading the
/// column and taking its lock.
fn retry<T>(mut op: impl FnMut() -> BoardResult<T>) -> T {
    for _ in 0..MAX_ATTEMPTS {
        match op() {
            Ok(value) => return value,
            Err(err) if err.is_retryable() => {}
            Err(BoardError::Validation(ValidationError::PositionOutOfRange { .. })) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    panic!("operation kept failing after {MAX_ATTEMPTS} attempts");
}

#[test]
fn mixed_concurrent_mutations_keep_every_scope_dense() {
    let dir = tempfile::tempdir().unwrap();
    let handle = StoreHandle::new(dir.path().join("board.db"), &EngineConfig::default());
    let seeded = seed(&handle.connect().unwrap(), 3, 12);

    let mut workers: Vec<thread::JoinHandle<()>> = (0..WORKERS)
        .map(|worker| {
            let handle = handle.clone();
            let columns = seeded.columns.clone();
            // Each worker owns a disjoint set of placements.
            let mut owned: Vec<PlacementId> = seeded
                .placements
                .iter()
                .enumerate()
                .filter(|(index, _)| index % WORKERS == worker)
                .map(|(_, placement)| *placement)
                .collect();
            thread::spawn(move || {
                let store = handle.connect().unwrap();
                let engine = TaskOrderingEngine::new(&store);
                for step in 0..MOVES_PER_WORKER {
                    let slot = step % owned.len();
                    let placement = owned[slot];
                    match step % 3 {
                        0 => {
                            let target = columns[(worker + step) % columns.len()];
                            let moved = retry(|| engine.move_placement(placement, target, 0));
                            assert_eq!(moved.column_uuid, target);
                        }
                        1 => {
                            let moved = retry(|| {
                                let current = engine.locate(placement)?;
                                let last = engine.list_column(current.column_uuid)?.len() as i64 - 1;
                                engine.move_placement(placement, current.column_uuid, last)
                            });
                            assert_eq!(moved.placement_uuid, placement);
                        }
                        _ => {
                            let task = retry(|| engine.locate(placement)).task_uuid;
                            retry(|| engine.remove_placement(placement));
                            let target = columns[(worker + step + 1) % columns.len()];
                            let added = retry(|| engine.add_placement(target, task, Some(0)));
                            owned[slot] = added.placement_uuid;
                        }
                    }
                }
            })
        })
        .collect();

    // Column churn races board-scope writes against the placement workers.
    {
        let handle = handle.clone();
        let board = seeded.board;
        let project = seeded.project;
        workers.push(thread::spawn(move || {
            let store = handle.connect().unwrap();
            let directory = SqliteDirectoryRepository::try_new(store.connection()).unwrap();
            let columns = ColumnOrderingEngine::new(&store);
            let tasks = TaskOrderingEngine::new(&store);
            for step in 0..10 {
                let scratch = retry(|| columns.append(board, &format!("scratch {step}")));
                let spare = TaskContent::new(project, format!("spare {step}"));
                directory.create_task(&spare, 1).unwrap();
                retry(|| tasks.add_placement(scratch.column_uuid, spare.task_uuid, None));
                retry(|| columns.delete(scratch.column_uuid));
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let store = handle.connect().unwrap();
    let engine = TaskOrderingEngine::new(&store);
    let mut seen = HashSet::new();
    for column in &seeded.columns {
        let placements = engine.list_column(*column).unwrap();
        let positions: Vec<i64> = placements.iter().map(|p| p.position).collect();
        assert_dense(&positions);
        for placement in placements {
            assert!(seen.insert(placement.task_uuid), "task placed twice");
        }
    }
    let expected: HashSet<TaskId> = seeded.tasks.iter().copied().collect();
    assert_eq!(seen, expected);
    assert_eq!(engine.list_board(seeded.board).unwrap().len(), seeded.tasks.len());

    let column_positions: Vec<i64> = store
        .read(|tx| Ok(tx.list_columns(seeded.board)?))
        .unwrap()
        .iter()
        .map(|column| column.position)
        .collect();
    assert_eq!(column_positions.len(), seeded.columns.len());
    assert_dense(&column_positions);
}

#[test]
fn concurrent_column_appends_get_distinct_positions() {
    let dir = tempfile::tempdir().unwrap();
    let handle = StoreHandle::new(dir.path().join("columns.db"), &EngineConfig::default());
    let seeded = seed(&handle.connect().unwrap(), 1, 0);

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let handle = handle.clone();
            let board = seeded.board;
            thread::spawn(move || {
                let store = handle.connect().unwrap();
                let engine = ColumnOrderingEngine::new(&store);
                for step in 0..5 {
                    let title = format!("w{worker}-{step}");
                    let mut attempts = 0;
                    while let Err(err) = engine.append(board, &title) {
                        assert!(err.is_retryable(), "unexpected error: {err}");
                        attempts += 1;
                        assert!(attempts < MAX_ATTEMPTS, "append kept failing: {err}");
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let store = handle.connect().unwrap();
    let positions: Vec<i64> = store
        .read(|tx| Ok(tx.list_columns(seeded.board)?))
        .unwrap()
        .iter()
        .map(|column| column.position)
        .collect();
    assert_eq!(positions.len(), 1 + WORKERS * 5);
    assert_dense(&positions);
}

#[test]
fn held_scope_lock_turns_competitor_away_as_busy() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::from_toml_str("lock_timeout_ms = 50").unwrap();
    let handle = StoreHandle::new(dir.path().join("locked.db"), &config);
    let store = handle.connect().unwrap();
    let seeded = seed(&store, 2, 4);
    let column = seeded.columns[0];
    let before = TaskOrderingEngine::new(&store).list_column(column).unwrap();

    let other = handle.connect().unwrap();
    let guard = other
        .lock_registry()
        .acquire(&[ScopeKey::Column(column)], Duration::from_millis(10))
        .unwrap();

    let started_at = Instant::now();
    let err = TaskOrderingEngine::new(&store)
        .move_placement(before[0].placement_uuid, column, 1)
        .unwrap_err();

    assert!(started_at.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        err,
        BoardError::Busy(BusyReason::ScopeLocked(ScopeKey::Column(id))) if id == column
    ));
    assert!(err.is_retryable());
    drop(guard);

    let after = TaskOrderingEngine::new(&store).list_column(column).unwrap();
    assert_eq!(after, before);
}

#[test]
fn database_write_lock_surfaces_as_busy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sqlite-busy.db");
    let config = EngineConfig::from_toml_str("busy_timeout_ms = 50").unwrap();
    let handle = StoreHandle::new(&path, &config);
    let store = handle.connect().unwrap();
    let seeded = seed(&store, 2, 2);

    let blocker = open_db(&path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = ColumnOrderingEngine::new(&store)
        .append(seeded.board, "Late")
        .unwrap_err();
    assert!(matches!(err, BoardError::Busy(BusyReason::DatabaseLocked)));

    blocker.execute_batch("ROLLBACK;").unwrap();
    ColumnOrderingEngine::new(&store)
        .append(seeded.board, "Late")
        .unwrap();
}
