//! Sync coordinator: drives reconciliation between a store and a remote
//! adapter.
//!
//! # Responsibility
//! - One-shot bootstrap merge per signed-in session.
//! - Incremental push of pending records, per collection.
//! - Deletion flush and category registry exchange.
//!
//! # Invariants
//! - The bootstrap latch is set before any remote call, so a failed run is
//!   not retried implicitly and can never double-apply a partial merge.
//! - Per-collection running flags make re-entrant triggers of the same flow
//!   no-ops; distinct collections never block each other.
//! - Deletion flush and category flows never touch the sync status.
//!
//! # See also
//! - docs/architecture/sync.md

use crate::model::task::ClientId;
use crate::store::state::SyncStatus;
use crate::store::Store;
use crate::sync::adapter::{BootstrapBatch, RemoteAdapter, RemoteResult};
use crate::sync::SyncEntity;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::time::Instant;

const BOOTSTRAP_TASKS_FAILED: &str = "Sync failed. Try again.";
const BOOTSTRAP_MILESTONES_FAILED: &str = "Milestone sync failed. Try again.";
const PUSH_TASKS_FAILED: &str = "Task sync failed.";
const PUSH_MILESTONES_FAILED: &str = "Milestone sync failed.";

/// How a sync flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The flow ran to the end without remote failures.
    Completed,
    /// The flow did not run: guest session, already running, already
    /// bootstrapped, or nothing to send.
    Skipped,
    /// At least one remote call failed. Local state stays usable and the
    /// failed work is retriable.
    Failed,
}

/// Drives bootstrap, push, deletion, and category flows against a store.
///
/// The coordinator owns no entity data. It reads from and writes back to
/// the [`Store`] passed into each flow, and holds only session-scoped
/// progress flags.
pub struct SyncCoordinator<R: RemoteAdapter> {
    adapter: R,
    bootstrapped: bool,
    push_tasks_running: bool,
    push_milestones_running: bool,
    flush_tasks_running: bool,
    flush_milestones_running: bool,
    categories_running: bool,
}

impl<R: RemoteAdapter> SyncCoordinator<R> {
    pub fn new(adapter: R) -> Self {
        Self {
            adapter,
            bootstrapped: false,
            push_tasks_running: false,
            push_milestones_running: false,
            flush_tasks_running: false,
            flush_milestones_running: false,
            categories_running: false,
        }
    }

    pub fn adapter(&self) -> &R {
        &self.adapter
    }

    pub fn has_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Re-arms the bootstrap latch for a fresh session, e.g. after the
    /// signed-in user changes.
    pub fn reset_session(&mut self) {
        self.bootstrapped = false;
    }

    /// Runs the one-shot bootstrap merge for the signed-in session.
    ///
    /// Reconciles tasks, then milestones, then loads the category registry.
    /// Collections are isolated: a task failure does not stop the milestone
    /// or category work. Returns [`SyncOutcome::Failed`] if any collection
    /// failed.
    pub fn bootstrap(&mut self, store: &mut Store) -> SyncOutcome {
        let Some(email) = store.auth().email().map(str::to_owned) else {
            debug!("event=sync_bootstrap module=sync status=skip reason=guest_session");
            return SyncOutcome::Skipped;
        };
        if self.bootstrapped {
            debug!("event=sync_bootstrap module=sync status=skip reason=already_ran");
            return SyncOutcome::Skipped;
        }
        self.bootstrapped = true;

        let started = Instant::now();
        info!("event=sync_bootstrap module=sync status=start");

        let tasks_ok = self.bootstrap_tasks(store);
        let milestones_ok = self.bootstrap_milestones(store);
        let categories_ok = self.load_categories(store, &email);

        if tasks_ok && milestones_ok && categories_ok {
            info!(
                "event=sync_bootstrap module=sync status=ok duration_ms={}",
                started.elapsed().as_millis()
            );
            SyncOutcome::Completed
        } else {
            warn!(
                "event=sync_bootstrap module=sync status=error error_code=partial_failure duration_ms={}",
                started.elapsed().as_millis()
            );
            SyncOutcome::Failed
        }
    }

    fn bootstrap_tasks(&self, store: &mut Store) -> bool {
        store.set_sync_status(SyncStatus::Syncing, None);
        let local = store.tasks().to_vec();
        let adapter = &self.adapter;
        let result = reconcile_bootstrap(
            local,
            || adapter.bootstrap_tasks(),
            |batch| adapter.push_tasks(batch),
        );

        match result {
            Ok(reconciled) => {
                if let Some(tasks) = reconciled {
                    let count = tasks.len();
                    store.replace_tasks(tasks);
                    info!(
                        "event=sync_bootstrap module=sync status=ok collection=tasks count={count}"
                    );
                } else {
                    info!("event=sync_bootstrap module=sync status=ok collection=tasks count=0");
                }
                store.set_sync_status(SyncStatus::Idle, None);
                true
            }
            Err(err) => {
                warn!(
                    "event=sync_bootstrap module=sync status=error collection=tasks error_code=remote_failure message={err}"
                );
                store.set_sync_status(SyncStatus::Error, Some(BOOTSTRAP_TASKS_FAILED.to_owned()));
                false
            }
        }
    }

    fn bootstrap_milestones(&self, store: &mut Store) -> bool {
        store.set_sync_status(SyncStatus::Syncing, None);
        let local = store.milestones().to_vec();
        let adapter = &self.adapter;
        let result = reconcile_bootstrap(
            local,
            || adapter.bootstrap_milestones(),
            |batch| adapter.push_milestones(batch),
        );

        match result {
            Ok(reconciled) => {
                if let Some(milestones) = reconciled {
                    let count = milestones.len();
                    store.replace_milestones(milestones);
                    info!(
                        "event=sync_bootstrap module=sync status=ok collection=milestones count={count}"
                    );
                } else {
                    info!(
                        "event=sync_bootstrap module=sync status=ok collection=milestones count=0"
                    );
                }
                store.set_sync_status(SyncStatus::Idle, None);
                true
            }
            Err(err) => {
                warn!(
                    "event=sync_bootstrap module=sync status=error collection=milestones error_code=remote_failure message={err}"
                );
                store.set_sync_status(
                    SyncStatus::Error,
                    Some(BOOTSTRAP_MILESTONES_FAILED.to_owned()),
                );
                false
            }
        }
    }

    /// One-shot load of the remote category registry. An empty remote
    /// registry keeps the local defaults; failures are logged and swallowed
    /// without touching the sync status.
    fn load_categories(&self, store: &mut Store, email: &str) -> bool {
        match self.adapter.fetch_categories(email) {
            Ok(labels) => {
                if labels.is_empty() {
                    debug!(
                        "event=sync_categories module=sync status=skip direction=load reason=remote_empty"
                    );
                } else {
                    let count = labels.len();
                    store.replace_categories(labels);
                    info!(
                        "event=sync_categories module=sync status=ok direction=load count={count}"
                    );
                }
                true
            }
            Err(err) => {
                warn!(
                    "event=sync_categories module=sync status=error direction=load error_code=remote_failure message={err}"
                );
                false
            }
        }
    }

    /// Pushes pending tasks and merges the confirmed echo back by id.
    ///
    /// On failure the pending flags stay set, so the next trigger retries
    /// the same records.
    pub fn push_pending_tasks(&mut self, store: &mut Store) -> SyncOutcome {
        if !store.auth().is_signed_in() {
            debug!("event=sync_push module=sync status=skip collection=tasks reason=guest_session");
            return SyncOutcome::Skipped;
        }
        if self.push_tasks_running {
            debug!(
                "event=sync_push module=sync status=skip collection=tasks reason=already_running"
            );
            return SyncOutcome::Skipped;
        }
        let pending = store.pending_tasks();
        if pending.is_empty() {
            debug!(
                "event=sync_push module=sync status=skip collection=tasks reason=nothing_pending"
            );
            return SyncOutcome::Skipped;
        }

        self.push_tasks_running = true;
        let adapter = &self.adapter;
        let outcome = run_push(
            store,
            "tasks",
            PUSH_TASKS_FAILED,
            pending,
            |batch| adapter.push_tasks(batch),
            |store, confirmed| {
                store.merge_tasks(confirmed);
            },
        );
        self.push_tasks_running = false;
        outcome
    }

    /// Pushes pending milestones and merges the confirmed echo back by id.
    pub fn push_pending_milestones(&mut self, store: &mut Store) -> SyncOutcome {
        if !store.auth().is_signed_in() {
            debug!(
                "event=sync_push module=sync status=skip collection=milestones reason=guest_session"
            );
            return SyncOutcome::Skipped;
        }
        if self.push_milestones_running {
            debug!(
                "event=sync_push module=sync status=skip collection=milestones reason=already_running"
            );
            return SyncOutcome::Skipped;
        }
        let pending = store.pending_milestones();
        if pending.is_empty() {
            debug!(
                "event=sync_push module=sync status=skip collection=milestones reason=nothing_pending"
            );
            return SyncOutcome::Skipped;
        }

        self.push_milestones_running = true;
        let adapter = &self.adapter;
        let outcome = run_push(
            store,
            "milestones",
            PUSH_MILESTONES_FAILED,
            pending,
            |batch| adapter.push_milestones(batch),
            |store, confirmed| {
                store.merge_milestones(confirmed);
            },
        );
        self.push_milestones_running = false;
        outcome
    }

    /// Flushes queued task deletions, one remote call per id.
    ///
    /// Confirmed ids leave the queue; failed ids stay queued for the next
    /// flush. Never touches the sync status.
    pub fn flush_task_deletions(&mut self, store: &mut Store) -> SyncOutcome {
        if !store.auth().is_signed_in() {
            debug!(
                "event=sync_delete module=sync status=skip collection=tasks reason=guest_session"
            );
            return SyncOutcome::Skipped;
        }
        if self.flush_tasks_running {
            debug!(
                "event=sync_delete module=sync status=skip collection=tasks reason=already_running"
            );
            return SyncOutcome::Skipped;
        }
        let ids: Vec<ClientId> = store.task_deletions().iter().copied().collect();
        if ids.is_empty() {
            debug!("event=sync_delete module=sync status=skip collection=tasks reason=queue_empty");
            return SyncOutcome::Skipped;
        }

        self.flush_tasks_running = true;
        let count = ids.len();
        info!("event=sync_delete module=sync status=start collection=tasks count={count}");

        let mut failures = 0usize;
        for id in ids {
            match self.adapter.delete_task(id) {
                Ok(()) => store.clear_task_deletion(id),
                Err(err) => {
                    failures += 1;
                    warn!(
                        "event=sync_delete module=sync status=error collection=tasks id={id} message={err}"
                    );
                }
            }
        }
        self.flush_tasks_running = false;

        if failures == 0 {
            info!("event=sync_delete module=sync status=ok collection=tasks count={count}");
            SyncOutcome::Completed
        } else {
            warn!(
                "event=sync_delete module=sync status=error collection=tasks failed={failures} of={count}"
            );
            SyncOutcome::Failed
        }
    }

    /// Flushes queued milestone deletions with the same per-id isolation as
    /// `flush_task_deletions`.
    pub fn flush_milestone_deletions(&mut self, store: &mut Store) -> SyncOutcome {
        if !store.auth().is_signed_in() {
            debug!(
                "event=sync_delete module=sync status=skip collection=milestones reason=guest_session"
            );
            return SyncOutcome::Skipped;
        }
        if self.flush_milestones_running {
            debug!(
                "event=sync_delete module=sync status=skip collection=milestones reason=already_running"
            );
            return SyncOutcome::Skipped;
        }
        let ids: Vec<ClientId> = store.milestone_deletions().iter().copied().collect();
        if ids.is_empty() {
            debug!(
                "event=sync_delete module=sync status=skip collection=milestones reason=queue_empty"
            );
            return SyncOutcome::Skipped;
        }

        self.flush_milestones_running = true;
        let count = ids.len();
        info!("event=sync_delete module=sync status=start collection=milestones count={count}");

        let mut failures = 0usize;
        for id in ids {
            match self.adapter.delete_milestone(id) {
                Ok(()) => store.clear_milestone_deletion(id),
                Err(err) => {
                    failures += 1;
                    warn!(
                        "event=sync_delete module=sync status=error collection=milestones id={id} message={err}"
                    );
                }
            }
        }
        self.flush_milestones_running = false;

        if failures == 0 {
            info!("event=sync_delete module=sync status=ok collection=milestones count={count}");
            SyncOutcome::Completed
        } else {
            warn!(
                "event=sync_delete module=sync status=error collection=milestones failed={failures} of={count}"
            );
            SyncOutcome::Failed
        }
    }

    /// Stores the full category registry remotely when it has unsent edits.
    ///
    /// The pending flag is cleared only after the remote store confirms, so
    /// a failed push retries on the next trigger. Never touches the sync
    /// status.
    pub fn sync_categories(&mut self, store: &mut Store) -> SyncOutcome {
        let Some(email) = store.auth().email().map(str::to_owned) else {
            debug!("event=sync_categories module=sync status=skip reason=guest_session");
            return SyncOutcome::Skipped;
        };
        if !store.categories_pending() {
            debug!("event=sync_categories module=sync status=skip reason=nothing_pending");
            return SyncOutcome::Skipped;
        }
        if self.categories_running {
            debug!("event=sync_categories module=sync status=skip reason=already_running");
            return SyncOutcome::Skipped;
        }

        self.categories_running = true;
        let labels = store.categories().to_vec();
        let count = labels.len();
        info!("event=sync_categories module=sync status=start direction=store count={count}");

        let outcome = match self.adapter.store_categories(&email, &labels) {
            Ok(()) => {
                store.set_categories_pending(false);
                info!(
                    "event=sync_categories module=sync status=ok direction=store count={count}"
                );
                SyncOutcome::Completed
            }
            Err(err) => {
                warn!(
                    "event=sync_categories module=sync status=error direction=store error_code=remote_failure message={err}"
                );
                SyncOutcome::Failed
            }
        };
        self.categories_running = false;
        outcome
    }
}

/// Shared push flow: send the pending subset, merge the confirmed echo.
///
/// The echo is confirmed before merging so the cache never re-queues a
/// record the remote just accepted.
fn run_push<T: SyncEntity>(
    store: &mut Store,
    collection: &str,
    failure_message: &str,
    pending: Vec<T>,
    push: impl FnOnce(&[T]) -> RemoteResult<Vec<T>>,
    merge: impl FnOnce(&mut Store, Vec<T>),
) -> SyncOutcome {
    let count = pending.len();
    info!("event=sync_push module=sync status=start collection={collection} count={count}");
    store.set_sync_status(SyncStatus::Syncing, None);

    match push(&pending) {
        Ok(mut confirmed) => {
            for entity in &mut confirmed {
                entity.clear_pending();
            }
            merge(store, confirmed);
            store.set_sync_status(SyncStatus::Idle, None);
            info!("event=sync_push module=sync status=ok collection={collection} count={count}");
            SyncOutcome::Completed
        }
        Err(err) => {
            warn!(
                "event=sync_push module=sync status=error collection={collection} error_code=remote_failure message={err}"
            );
            store.set_sync_status(SyncStatus::Error, Some(failure_message.to_owned()));
            SyncOutcome::Failed
        }
    }
}

/// Core bootstrap decision table, shared by both collections.
///
/// Returns `Ok(Some(entities))` when the cache should be replaced with the
/// reconciled set, and `Ok(None)` when the cache is already right (remote
/// user was just materialized from an empty cache).
fn reconcile_bootstrap<T: SyncEntity>(
    local: Vec<T>,
    fetch: impl FnOnce() -> RemoteResult<BootstrapBatch<T>>,
    push: impl FnOnce(&[T]) -> RemoteResult<Vec<T>>,
) -> RemoteResult<Option<Vec<T>>> {
    let batch = fetch()?;

    if !batch.user_exists {
        if local.is_empty() {
            // Materializes the user remotely; nothing to reconcile.
            push(&[])?;
            return Ok(None);
        }
        // First sign-in from a device with offline history: the device is
        // the source of truth and the whole cache goes up.
        let mut confirmed = push(&local)?;
        for entity in &mut confirmed {
            entity.clear_pending();
        }
        return Ok(Some(confirmed));
    }

    let pending: Vec<T> = local.into_iter().filter(SyncEntity::is_pending).collect();
    if pending.is_empty() {
        // No local edits to defend, the remote snapshot wins wholesale.
        return Ok(Some(batch.entities));
    }

    // Local pending records win on id collision; remote records without a
    // pending counterpart come along untouched.
    let mut confirmed = push(&pending)?;
    for entity in &mut confirmed {
        entity.clear_pending();
    }
    let confirmed_ids: BTreeSet<ClientId> = confirmed.iter().map(SyncEntity::client_id).collect();
    let mut merged = confirmed;
    merged.extend(
        batch
            .entities
            .into_iter()
            .filter(|entity| !confirmed_ids.contains(&entity.client_id())),
    );
    Ok(Some(merged))
}
