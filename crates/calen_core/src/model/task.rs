//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record with its owned subtasks.
//! - Provide lifecycle helpers for pending-state transitions.
//!
//! # Invariants
//! - `id` is generated once at creation and never reused for another record.
//! - `importance` stays within 1..=5.
//! - `pending` is cleared only by remote confirmation.
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable client-side identifier for every synchronized record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
/// The client id is the join key between local and remote copies; remote
/// identifiers are carried along but never used for matching.
pub type ClientId = Uuid;

/// Inclusive importance bounds accepted by validation.
pub const IMPORTANCE_MIN: u8 = 1;
pub const IMPORTANCE_MAX: u8 = 5;

/// Validation failures for task construction and mutation inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
    BlankTitle,
    ImportanceOutOfRange(u8),
    BlankSubtaskTitle(ClientId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "client id must not be nil"),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::ImportanceOutOfRange(value) => write!(
                f,
                "importance {value} is outside {IMPORTANCE_MIN}..={IMPORTANCE_MAX}"
            ),
            Self::BlankSubtaskTitle(id) => write!(f, "subtask {id} has a blank title"),
        }
    }
}

impl Error for TaskValidationError {}

/// Checklist entry owned by a task.
///
/// Subtasks are never synchronized on their own; they travel inside their
/// parent task payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: ClientId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    /// Creates a subtask with a generated stable id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    /// Creates a subtask with a caller-provided stable id.
    ///
    /// Used by tests and import paths where identity already exists.
    pub fn with_id(id: ClientId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
        }
    }
}

/// Canonical task record shared by cache, persistence and sync payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable client id used for merge matching and deletion tracking.
    pub id: ClientId,
    /// Opaque identifier assigned by the remote store. Carried through
    /// round-trips, never inspected locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub deadline_ms: i64,
    /// Case-sensitive category labels. Labels need not exist in the
    /// category registry.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// 1 (lowest) through 5 (highest).
    pub importance: u8,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
    /// Unix epoch milliseconds. Restamped on every local mutation.
    pub updated_at_ms: i64,
    /// Local-change marker awaiting remote confirmation.
    #[serde(default)]
    pub pending: bool,
}

impl Task {
    /// Creates a new task with a generated stable id, marked pending.
    ///
    /// # Errors
    /// - Returns a validation error for a blank title or out-of-range
    ///   importance.
    pub fn new(
        title: impl Into<String>,
        deadline_ms: i64,
        importance: u8,
        now_ms: i64,
    ) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), title, deadline_ms, importance, now_ms)
    }

    /// Creates a new task with a caller-provided stable id.
    ///
    /// Used by tests and import paths where identity already exists.
    ///
    /// # Invariants
    /// - The provided `id` must remain stable for this record's lifetime.
    pub fn with_id(
        id: ClientId,
        title: impl Into<String>,
        deadline_ms: i64,
        importance: u8,
        now_ms: i64,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            remote_id: None,
            title: title.into(),
            description: None,
            deadline_ms,
            categories: BTreeSet::new(),
            importance,
            completed: false,
            subtasks: Vec::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            pending: true,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks structural invariants of this record.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if !(IMPORTANCE_MIN..=IMPORTANCE_MAX).contains(&self.importance) {
            return Err(TaskValidationError::ImportanceOutOfRange(self.importance));
        }
        for subtask in &self.subtasks {
            if subtask.id.is_nil() {
                return Err(TaskValidationError::NilId);
            }
            if subtask.title.trim().is_empty() {
                return Err(TaskValidationError::BlankSubtaskTitle(subtask.id));
            }
        }
        Ok(())
    }

    /// Marks a local edit awaiting remote confirmation.
    pub fn mark_pending(&mut self, now_ms: i64) {
        self.pending = true;
        self.updated_at_ms = now_ms;
    }

    /// Clears the pending marker after remote confirmation.
    pub fn confirm_synced(&mut self) {
        self.pending = false;
    }
}

/// Partial update payload for task mutations.
///
/// `None` fields keep their current value; `Some` fields replace the field
/// wholesale. Double options distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub deadline_ms: Option<i64>,
    pub categories: Option<BTreeSet<String>>,
    pub importance: Option<u8>,
    pub completed: Option<bool>,
    pub subtasks: Option<Vec<Subtask>>,
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskValidationError};
    use uuid::Uuid;

    #[test]
    fn new_task_starts_pending_with_stamps() {
        let task = Task::new("write report", 1_700_000_000_000, 3, 1_699_999_000_000)
            .expect("valid task");

        assert!(!task.id.is_nil());
        assert!(task.pending);
        assert_eq!(task.created_at_ms, 1_699_999_000_000);
        assert_eq!(task.updated_at_ms, 1_699_999_000_000);
        assert!(task.subtasks.is_empty());
        assert!(task.categories.is_empty());
    }

    #[test]
    fn with_id_rejects_nil_id() {
        let err = Task::with_id(Uuid::nil(), "x", 0, 3, 0).unwrap_err();
        assert_eq!(err, TaskValidationError::NilId);
    }

    #[test]
    fn validate_rejects_out_of_range_importance() {
        let err = Task::new("x", 0, 0, 0).unwrap_err();
        assert_eq!(err, TaskValidationError::ImportanceOutOfRange(0));

        let err = Task::new("x", 0, 6, 0).unwrap_err();
        assert_eq!(err, TaskValidationError::ImportanceOutOfRange(6));
    }

    #[test]
    fn validate_rejects_blank_title() {
        let err = Task::new("   ", 0, 3, 0).unwrap_err();
        assert_eq!(err, TaskValidationError::BlankTitle);
    }

    #[test]
    fn mark_pending_restamps_updated_at() {
        let mut task = Task::new("x", 0, 3, 100).expect("valid task");
        task.confirm_synced();
        assert!(!task.pending);

        task.mark_pending(250);
        assert!(task.pending);
        assert_eq!(task.updated_at_ms, 250);
        assert_eq!(task.created_at_ms, 100);
    }
}
