use calen_core::{
    AuthState, BootstrapBatch, Milestone, MilestoneKind, RemoteAdapter, RemoteError, RemoteResult,
    Store, StoreState, SyncCoordinator, SyncOutcome, SyncStatus, Task, UserProfile,
};
use std::cell::{Cell, RefCell};
use uuid::Uuid;

const NOW: i64 = 1_700_000_000_000;

const ID_A: &str = "00000000-0000-4000-8000-000000000001";
const ID_B: &str = "00000000-0000-4000-8000-000000000002";
const ID_C: &str = "00000000-0000-4000-8000-000000000003";

#[derive(Default)]
struct MockRemote {
    fail_task_push: Cell<bool>,
    fail_milestone_push: Cell<bool>,
    fail_category_store: Cell<bool>,
    failing_deletes: Vec<Uuid>,
    pushed_tasks: RefCell<Vec<Vec<Task>>>,
    pushed_milestones: RefCell<Vec<Vec<Milestone>>>,
    deleted_tasks: RefCell<Vec<Uuid>>,
    deleted_milestones: RefCell<Vec<Uuid>>,
    stored_categories: RefCell<Vec<Vec<String>>>,
}

impl RemoteAdapter for MockRemote {
    fn bootstrap_tasks(&self) -> RemoteResult<BootstrapBatch<Task>> {
        Ok(BootstrapBatch {
            user_exists: true,
            entities: Vec::new(),
        })
    }

    fn push_tasks(&self, tasks: &[Task]) -> RemoteResult<Vec<Task>> {
        if self.fail_task_push.get() {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        self.pushed_tasks.borrow_mut().push(tasks.to_vec());
        Ok(tasks
            .iter()
            .cloned()
            .map(|mut task| {
                task.remote_id = Some(format!("srv-{}", task.id));
                task
            })
            .collect())
    }

    fn delete_task(&self, id: Uuid) -> RemoteResult<()> {
        if self.failing_deletes.contains(&id) {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        self.deleted_tasks.borrow_mut().push(id);
        Ok(())
    }

    fn bootstrap_milestones(&self) -> RemoteResult<BootstrapBatch<Milestone>> {
        Ok(BootstrapBatch {
            user_exists: true,
            entities: Vec::new(),
        })
    }

    fn push_milestones(&self, milestones: &[Milestone]) -> RemoteResult<Vec<Milestone>> {
        if self.fail_milestone_push.get() {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        self.pushed_milestones.borrow_mut().push(milestones.to_vec());
        Ok(milestones.to_vec())
    }

    fn delete_milestone(&self, id: Uuid) -> RemoteResult<()> {
        if self.failing_deletes.contains(&id) {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        self.deleted_milestones.borrow_mut().push(id);
        Ok(())
    }

    fn fetch_categories(&self, _email: &str) -> RemoteResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn store_categories(&self, _email: &str, labels: &[String]) -> RemoteResult<()> {
        if self.fail_category_store.get() {
            return Err(RemoteError::Transport("offline".to_string()));
        }
        self.stored_categories.borrow_mut().push(labels.to_vec());
        Ok(())
    }
}

#[test]
fn guest_session_skips_push() {
    let mut store = Store::with_clock(StoreState::default(), fixed_now);
    store.add_task(task_with_id(ID_A, "local only")).unwrap();
    let mut coordinator = SyncCoordinator::new(MockRemote::default());

    let outcome = coordinator.push_pending_tasks(&mut store);

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert!(coordinator.adapter().pushed_tasks.borrow().is_empty());
}

#[test]
fn push_skips_when_nothing_is_pending() {
    let mut store = signed_in_store();
    let mut confirmed = task_with_id(ID_A, "already synced");
    confirmed.confirm_synced();
    store.merge_tasks(vec![confirmed]);
    let mut coordinator = SyncCoordinator::new(MockRemote::default());

    let outcome = coordinator.push_pending_tasks(&mut store);

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert!(coordinator.adapter().pushed_tasks.borrow().is_empty());
}

#[test]
fn push_sends_exactly_the_pending_subset() {
    let mut store = signed_in_store();
    let mut confirmed = task_with_id(ID_C, "already synced");
    confirmed.confirm_synced();
    store.merge_tasks(vec![confirmed]);
    store.add_task(task_with_id(ID_A, "new idea")).unwrap();
    store.toggle_task_completed(parse(ID_C)).unwrap();

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    let outcome = coordinator.push_pending_tasks(&mut store);

    assert_eq!(outcome, SyncOutcome::Completed);
    let pushed = coordinator.adapter().pushed_tasks.borrow();
    assert_eq!(pushed.len(), 1);
    let pushed_titles: Vec<&str> = pushed[0].iter().map(|t| t.title.as_str()).collect();
    assert_eq!(pushed_titles, ["new idea", "already synced"]);
}

#[test]
fn push_never_includes_ids_queued_for_deletion() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_A, "doomed")).unwrap();
    store.add_task(task_with_id(ID_B, "kept")).unwrap();
    store.delete_task(parse(ID_A));

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    coordinator.push_pending_tasks(&mut store);

    let pushed = coordinator.adapter().pushed_tasks.borrow();
    assert_eq!(pushed[0].len(), 1);
    assert_eq!(pushed[0][0].title, "kept");
    assert!(store.task_deletions().contains(&parse(ID_A)));
}

#[test]
fn push_echo_clears_pending_and_merges_in_place() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_B, "second")).unwrap();
    store.add_task(task_with_id(ID_A, "first")).unwrap();

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    coordinator.push_pending_tasks(&mut store);

    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["first", "second"]);
    assert!(store.tasks().iter().all(|t| !t.pending));
    assert!(store.tasks().iter().all(|t| t.remote_id.is_some()));
    assert_eq!(store.sync().status, SyncStatus::Idle);
    assert_eq!(store.sync().last_synced_at_ms, Some(NOW));
}

#[test]
fn push_failure_keeps_pending_for_retry() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_A, "fragile")).unwrap();
    let mut coordinator = SyncCoordinator::new(MockRemote {
        fail_task_push: Cell::new(true),
        ..MockRemote::default()
    });

    let outcome = coordinator.push_pending_tasks(&mut store);

    assert_eq!(outcome, SyncOutcome::Failed);
    assert!(store.tasks()[0].pending);
    assert_eq!(store.sync().status, SyncStatus::Error);
    assert_eq!(store.sync().message.as_deref(), Some("Task sync failed."));

    coordinator.adapter().fail_task_push.set(false);
    let retry = coordinator.push_pending_tasks(&mut store);

    assert_eq!(retry, SyncOutcome::Completed);
    assert!(!store.tasks()[0].pending);
    assert_eq!(store.sync().status, SyncStatus::Idle);
}

#[test]
fn milestone_push_mirrors_task_flow() {
    let mut store = signed_in_store();
    store
        .add_milestone(milestone_with_id(ID_A, "launch"))
        .unwrap();
    let mut coordinator = SyncCoordinator::new(MockRemote {
        fail_milestone_push: Cell::new(true),
        ..MockRemote::default()
    });

    let outcome = coordinator.push_pending_milestones(&mut store);
    assert_eq!(outcome, SyncOutcome::Failed);
    assert_eq!(
        store.sync().message.as_deref(),
        Some("Milestone sync failed.")
    );
    assert!(store.milestones()[0].pending);

    coordinator.adapter().fail_milestone_push.set(false);
    let retry = coordinator.push_pending_milestones(&mut store);

    assert_eq!(retry, SyncOutcome::Completed);
    assert!(!store.milestones()[0].pending);
    assert_eq!(
        coordinator.adapter().pushed_milestones.borrow()[0].len(),
        1
    );
}

#[test]
fn flush_sends_one_delete_per_id_and_clears_queue() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_A, "one")).unwrap();
    store.add_task(task_with_id(ID_B, "two")).unwrap();
    store.delete_task(parse(ID_A));
    store.delete_task(parse(ID_B));

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    let outcome = coordinator.flush_task_deletions(&mut store);

    assert_eq!(outcome, SyncOutcome::Completed);
    assert!(store.task_deletions().is_empty());
    let deleted = coordinator.adapter().deleted_tasks.borrow();
    assert_eq!(deleted.len(), 2);
    assert!(deleted.contains(&parse(ID_A)));
    assert!(deleted.contains(&parse(ID_B)));
}

#[test]
fn flush_never_touches_sync_status() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_A, "one")).unwrap();
    store.delete_task(parse(ID_A));

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    coordinator.flush_task_deletions(&mut store);

    assert_eq!(store.sync().status, SyncStatus::Idle);
    assert_eq!(store.sync().last_synced_at_ms, None);
    assert_eq!(store.sync().message, None);
}

#[test]
fn flush_failures_keep_only_failed_ids_queued() {
    let mut store = signed_in_store();
    store.add_task(task_with_id(ID_A, "sticky")).unwrap();
    store.add_task(task_with_id(ID_B, "smooth")).unwrap();
    store.delete_task(parse(ID_A));
    store.delete_task(parse(ID_B));

    let mut coordinator = SyncCoordinator::new(MockRemote {
        failing_deletes: vec![parse(ID_A)],
        ..MockRemote::default()
    });
    let outcome = coordinator.flush_task_deletions(&mut store);

    assert_eq!(outcome, SyncOutcome::Failed);
    assert!(store.task_deletions().contains(&parse(ID_A)));
    assert!(!store.task_deletions().contains(&parse(ID_B)));
}

#[test]
fn flush_skips_when_queue_is_empty() {
    let mut store = signed_in_store();
    let mut coordinator = SyncCoordinator::new(MockRemote::default());

    assert_eq!(
        coordinator.flush_task_deletions(&mut store),
        SyncOutcome::Skipped
    );
}

#[test]
fn milestone_flush_clears_queue_independently() {
    let mut store = signed_in_store();
    store
        .add_milestone(milestone_with_id(ID_A, "retired goal"))
        .unwrap();
    store.delete_milestone(parse(ID_A));

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    let outcome = coordinator.flush_milestone_deletions(&mut store);

    assert_eq!(outcome, SyncOutcome::Completed);
    assert!(store.milestone_deletions().is_empty());
    assert_eq!(coordinator.adapter().deleted_milestones.borrow().len(), 1);
}

#[test]
fn category_push_skips_without_pending_edits() {
    let mut store = signed_in_store();
    let mut coordinator = SyncCoordinator::new(MockRemote::default());

    let outcome = coordinator.sync_categories(&mut store);

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert!(coordinator.adapter().stored_categories.borrow().is_empty());
}

#[test]
fn category_push_sends_full_registry_and_clears_flag() {
    let mut store = signed_in_store();
    store.add_category("Reading").unwrap();

    let mut coordinator = SyncCoordinator::new(MockRemote::default());
    let outcome = coordinator.sync_categories(&mut store);

    assert_eq!(outcome, SyncOutcome::Completed);
    assert!(!store.categories_pending());
    let stored = coordinator.adapter().stored_categories.borrow();
    assert_eq!(stored[0], ["Work", "School", "Fitness", "Reading"]);
}

#[test]
fn category_push_failure_keeps_flag_for_retry() {
    let mut store = signed_in_store();
    store.add_category("Reading").unwrap();

    let mut coordinator = SyncCoordinator::new(MockRemote {
        fail_category_store: Cell::new(true),
        ..MockRemote::default()
    });

    assert_eq!(coordinator.sync_categories(&mut store), SyncOutcome::Failed);
    assert!(store.categories_pending());

    coordinator.adapter().fail_category_store.set(false);
    assert_eq!(
        coordinator.sync_categories(&mut store),
        SyncOutcome::Completed
    );
    assert!(!store.categories_pending());
}

fn signed_in_store() -> Store {
    let mut state = StoreState::default();
    state.auth = AuthState::SignedIn(UserProfile {
        email: "dev@example.com".to_string(),
        name: None,
        picture: None,
    });
    Store::with_clock(state, fixed_now)
}

fn fixed_now() -> i64 {
    NOW
}

fn parse(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap()
}

fn task_with_id(id: &str, title: &str) -> Task {
    Task::with_id(parse(id), title, NOW + 86_400_000, 3, 500).unwrap()
}

fn milestone_with_id(id: &str, title: &str) -> Milestone {
    Milestone::with_id(
        parse(id),
        title,
        NOW + 14 * 86_400_000,
        MilestoneKind::Countdown,
        500,
    )
    .unwrap()
}
