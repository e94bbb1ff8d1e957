//! Entity store: the single mutable owner of local application state.
//!
//! # Responsibility
//! - Apply local mutations optimistically and mark records pending.
//! - Accept remote snapshots through replace/merge intake paths.
//! - Track ids queued for remote deletion.
//!
//! # Invariants
//! - Every local mutation sets `pending` and restamps `updated_at_ms`.
//! - A record id is in at most one of cache and deletion queue; replace and
//!   merge intake drop records whose id is queued for deletion.
//! - Remote data never raises `pending`.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::milestone::{Milestone, MilestonePatch, MilestoneValidationError};
use crate::model::task::{ClientId, Subtask, Task, TaskPatch, TaskValidationError};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod state;

use state::{AuthState, Filters, StoreState, SyncState, SyncStatus, ViewMode};

pub type StoreResult<T> = Result<T, StoreError>;

/// Mutation failures surfaced by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    TaskValidation(TaskValidationError),
    MilestoneValidation(MilestoneValidationError),
    /// The id is already tracked by the cache or the deletion queue.
    DuplicateId(ClientId),
    NotFound(ClientId),
    BlankCategory,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskValidation(err) => write!(f, "{err}"),
            Self::MilestoneValidation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "record already tracked: {id}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::BlankCategory => write!(f, "category label must not be blank"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TaskValidation(err) => Some(err),
            Self::MilestoneValidation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::TaskValidation(value)
    }
}

impl From<MilestoneValidationError> for StoreError {
    fn from(value: MilestoneValidationError) -> Self {
        Self::MilestoneValidation(value)
    }
}

fn system_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Explicit state container with a mutation API.
///
/// Mutation methods return the new collection snapshot so callers can
/// re-render without a second lookup. Observation/reactivity is the
/// presentation layer's concern.
pub struct Store {
    state: StoreState,
    clock: fn() -> i64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    /// Restores a store from a loaded state snapshot.
    pub fn from_state(state: StoreState) -> Self {
        Self::with_clock(state, system_now_ms)
    }

    /// Creates a store with an injected clock for deterministic stamping.
    pub fn with_clock(state: StoreState, clock: fn() -> i64) -> Self {
        Self { state, clock }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn into_state(self) -> StoreState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.state.milestones
    }

    pub fn categories(&self) -> &[String] {
        &self.state.categories
    }

    pub fn task_deletions(&self) -> &BTreeSet<ClientId> {
        &self.state.task_deletions
    }

    pub fn milestone_deletions(&self) -> &BTreeSet<ClientId> {
        &self.state.milestone_deletions
    }

    pub fn filters(&self) -> &Filters {
        &self.state.filters
    }

    pub fn view_mode(&self) -> ViewMode {
        self.state.view_mode
    }

    pub fn search_query(&self) -> &str {
        &self.state.search_query
    }

    pub fn auth(&self) -> &AuthState {
        &self.state.auth
    }

    pub fn sync(&self) -> &SyncState {
        &self.state.sync
    }

    pub fn categories_pending(&self) -> bool {
        self.state.categories_pending
    }

    /// Tasks with unconfirmed local changes, in cache order.
    pub fn pending_tasks(&self) -> Vec<Task> {
        self.state
            .tasks
            .iter()
            .filter(|task| task.pending)
            .cloned()
            .collect()
    }

    /// Milestones with unconfirmed local changes, in cache order.
    pub fn pending_milestones(&self) -> Vec<Milestone> {
        self.state
            .milestones
            .iter()
            .filter(|milestone| milestone.pending)
            .cloned()
            .collect()
    }

    // ---- task mutations ----

    /// Adds a task to the front of the cache, marked pending.
    pub fn add_task(&mut self, mut task: Task) -> StoreResult<&[Task]> {
        task.validate()?;
        if self.state.tasks.iter().any(|t| t.id == task.id)
            || self.state.task_deletions.contains(&task.id)
        {
            return Err(StoreError::DuplicateId(task.id));
        }

        task.mark_pending((self.clock)());
        self.state.tasks.insert(0, task);
        Ok(&self.state.tasks)
    }

    /// Replaces every `Some` patch field wholesale and marks the task pending.
    ///
    /// The patch is applied atomically: a patch that fails validation leaves
    /// the task untouched.
    pub fn update_task(&mut self, id: ClientId, patch: TaskPatch) -> StoreResult<&[Task]> {
        let now = (self.clock)();
        let slot = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut updated = slot.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(deadline_ms) = patch.deadline_ms {
            updated.deadline_ms = deadline_ms;
        }
        if let Some(categories) = patch.categories {
            updated.categories = categories;
        }
        if let Some(importance) = patch.importance {
            updated.importance = importance;
        }
        if let Some(completed) = patch.completed {
            updated.completed = completed;
        }
        if let Some(subtasks) = patch.subtasks {
            updated.subtasks = subtasks;
        }
        updated.validate()?;
        updated.mark_pending(now);
        *slot = updated;

        Ok(&self.state.tasks)
    }

    pub fn toggle_task_completed(&mut self, id: ClientId) -> StoreResult<&[Task]> {
        let now = (self.clock)();
        let task = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;

        task.completed = !task.completed;
        task.mark_pending(now);
        Ok(&self.state.tasks)
    }

    /// Appends a fresh unchecked subtask and marks the parent pending.
    pub fn add_subtask(
        &mut self,
        task_id: ClientId,
        title: impl Into<String>,
    ) -> StoreResult<&[Task]> {
        let now = (self.clock)();
        let task = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::NotFound(task_id))?;

        let mut updated = task.clone();
        updated.subtasks.push(Subtask::new(title));
        updated.validate()?;
        updated.mark_pending(now);
        *task = updated;

        Ok(&self.state.tasks)
    }

    pub fn toggle_subtask(
        &mut self,
        task_id: ClientId,
        subtask_id: ClientId,
    ) -> StoreResult<&[Task]> {
        let now = (self.clock)();
        let task = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::NotFound(task_id))?;

        let subtask = task
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or(StoreError::NotFound(subtask_id))?;
        subtask.completed = !subtask.completed;
        task.mark_pending(now);

        Ok(&self.state.tasks)
    }

    /// Removes a task from the cache and queues its id for remote deletion.
    ///
    /// Idempotent: an id not present in the cache is a no-op, so a second
    /// delete cannot re-queue an already confirmed deletion.
    pub fn delete_task(&mut self, id: ClientId) -> &[Task] {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|task| task.id != id);
        if self.state.tasks.len() != before {
            self.state.task_deletions.insert(id);
        }
        &self.state.tasks
    }

    /// Drops an id from the deletion queue after remote confirmation.
    pub fn clear_task_deletion(&mut self, id: ClientId) {
        self.state.task_deletions.remove(&id);
    }

    /// Replaces the task cache wholesale with a remote snapshot.
    ///
    /// Records whose id is queued for deletion are dropped from the incoming
    /// batch; pending flags on the batch are taken as-is.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) -> &[Task] {
        let deletions = &self.state.task_deletions;
        let kept: Vec<Task> = tasks
            .into_iter()
            .filter(|task| !deletions.contains(&task.id))
            .collect();
        self.state.tasks = kept;
        &self.state.tasks
    }

    /// Merges confirmed records into the cache by client id.
    ///
    /// Matching ids are replaced in place (position preserved), new ids are
    /// appended, and ids queued for deletion are dropped. This is the only
    /// intake where remote data overwrites local records, and it is not
    /// monotonic: the incoming record wins on id collision.
    pub fn merge_tasks(&mut self, incoming: Vec<Task>) -> &[Task] {
        for task in incoming {
            if self.state.task_deletions.contains(&task.id) {
                continue;
            }
            match self.state.tasks.iter_mut().find(|t| t.id == task.id) {
                Some(slot) => *slot = task,
                None => self.state.tasks.push(task),
            }
        }
        &self.state.tasks
    }

    // ---- milestone mutations ----

    /// Adds a milestone to the front of the cache, marked pending.
    pub fn add_milestone(&mut self, mut milestone: Milestone) -> StoreResult<&[Milestone]> {
        milestone.validate()?;
        if self.state.milestones.iter().any(|m| m.id == milestone.id)
            || self.state.milestone_deletions.contains(&milestone.id)
        {
            return Err(StoreError::DuplicateId(milestone.id));
        }

        milestone.mark_pending((self.clock)());
        self.state.milestones.insert(0, milestone);
        Ok(&self.state.milestones)
    }

    /// Replaces every `Some` patch field wholesale and marks the milestone
    /// pending. Applied atomically like `update_task`.
    pub fn update_milestone(
        &mut self,
        id: ClientId,
        patch: MilestonePatch,
    ) -> StoreResult<&[Milestone]> {
        let now = (self.clock)();
        let slot = self
            .state
            .milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut updated = slot.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(target_date_ms) = patch.target_date_ms {
            updated.target_date_ms = target_date_ms;
        }
        if let Some(kind) = patch.kind {
            updated.kind = kind;
        }
        if let Some(image_source) = patch.image_source {
            updated.image_source = image_source;
        }
        updated.validate()?;
        updated.mark_pending(now);
        *slot = updated;

        Ok(&self.state.milestones)
    }

    /// Removes a milestone from the cache and queues its id for remote
    /// deletion. Idempotent like `delete_task`.
    pub fn delete_milestone(&mut self, id: ClientId) -> &[Milestone] {
        let before = self.state.milestones.len();
        self.state.milestones.retain(|milestone| milestone.id != id);
        if self.state.milestones.len() != before {
            self.state.milestone_deletions.insert(id);
        }
        &self.state.milestones
    }

    /// Drops an id from the deletion queue after remote confirmation.
    pub fn clear_milestone_deletion(&mut self, id: ClientId) {
        self.state.milestone_deletions.remove(&id);
    }

    /// Replaces the milestone cache wholesale with a remote snapshot,
    /// dropping records whose id is queued for deletion.
    pub fn replace_milestones(&mut self, milestones: Vec<Milestone>) -> &[Milestone] {
        let deletions = &self.state.milestone_deletions;
        let kept: Vec<Milestone> = milestones
            .into_iter()
            .filter(|milestone| !deletions.contains(&milestone.id))
            .collect();
        self.state.milestones = kept;
        &self.state.milestones
    }

    /// Merges confirmed milestones into the cache by client id, with the
    /// same in-place/append/drop rules as `merge_tasks`.
    pub fn merge_milestones(&mut self, incoming: Vec<Milestone>) -> &[Milestone] {
        for milestone in incoming {
            if self.state.milestone_deletions.contains(&milestone.id) {
                continue;
            }
            match self
                .state
                .milestones
                .iter_mut()
                .find(|m| m.id == milestone.id)
            {
                Some(slot) => *slot = milestone,
                None => self.state.milestones.push(milestone),
            }
        }
        &self.state.milestones
    }

    // ---- category registry ----

    /// Appends a new label and marks the registry pending.
    ///
    /// Uniqueness is case-sensitive; adding an existing label leaves the
    /// registry and the pending flag untouched.
    pub fn add_category(&mut self, label: impl Into<String>) -> StoreResult<&[String]> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(StoreError::BlankCategory);
        }
        if self.state.categories.iter().any(|c| *c == label) {
            return Ok(&self.state.categories);
        }

        self.state.categories.push(label);
        self.state.categories_pending = true;
        Ok(&self.state.categories)
    }

    /// Replaces the registry wholesale with remote labels.
    ///
    /// Blank labels are dropped and duplicates keep their first occurrence.
    /// Does not touch the registry-pending flag.
    pub fn replace_categories(&mut self, labels: Vec<String>) -> &[String] {
        let mut seen = BTreeSet::new();
        self.state.categories = labels
            .into_iter()
            .filter(|label| !label.trim().is_empty())
            .filter(|label| seen.insert(label.clone()))
            .collect();
        &self.state.categories
    }

    pub fn set_categories_pending(&mut self, pending: bool) {
        self.state.categories_pending = pending;
    }

    // ---- session state ----

    pub fn set_auth(&mut self, auth: AuthState) {
        self.state.auth = auth;
    }

    /// Updates the sync status, stamping `last_synced_at_ms` when the new
    /// status is `Idle` and clearing it otherwise.
    pub fn set_sync_status(&mut self, status: SyncStatus, message: Option<String>) {
        let last_synced_at_ms = if status == SyncStatus::Idle {
            Some((self.clock)())
        } else {
            None
        };
        self.state.sync = SyncState {
            status,
            message,
            last_synced_at_ms,
        };
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.state.filters = filters;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.state.search_query = query.into();
    }
}
