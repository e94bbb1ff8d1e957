//! State snapshot types owned by the entity store.
//!
//! # Responsibility
//! - Define the full in-memory state shape and its session/runtime parts.
//! - Keep the persisted subset distinguishable from session-only fields.
//!
//! # Invariants
//! - Sync status, auth, search input and the registry-pending flag are
//!   session-only and reset on load.

use crate::model::milestone::Milestone;
use crate::model::task::{ClientId, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category registry seeded on first run.
pub const DEFAULT_CATEGORIES: [&str; 3] = ["Work", "School", "Fitness"];

/// Category dimension of the list filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    All,
    /// Tasks whose category set contains this exact label.
    Only(String),
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::All
    }
}

/// Status dimension of the list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    Active,
    Completed,
    /// Deadline strictly before the query clock and not completed.
    Overdue,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::All
    }
}

/// Active task list filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filters {
    pub category: CategoryFilter,
    pub status: StatusFilter,
}

/// Presentation mode for the main view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    List,
    Timeline,
    Milestones,
}

impl Default for ViewMode {
    fn default() -> Self {
        Self::List
    }
}

/// Coordinator-facing synchronization status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
}

/// Sync status plus the human-readable failure message, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub status: SyncStatus,
    pub message: Option<String>,
    /// Stamped on every transition to `Idle`, cleared otherwise.
    pub last_synced_at_ms: Option<i64>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            message: None,
            last_synced_at_ms: None,
        }
    }
}

/// Identity fields surfaced by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Session identity as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Guest,
    SignedIn(UserProfile),
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }

    /// Email of the signed-in user, if any.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Guest => None,
            Self::SignedIn(profile) => Some(profile.email.as_str()),
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::Guest
    }
}

/// Full state snapshot held by the store.
///
/// Persisted across restarts: `tasks`, `milestones`, `categories`, both
/// deletion queues, `filters` and `view_mode`. Everything else is rebuilt
/// per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub milestones: Vec<Milestone>,
    /// Ordered, case-sensitive unique category labels.
    pub categories: Vec<String>,
    /// Task ids removed locally but not yet confirmed deleted remotely.
    pub task_deletions: BTreeSet<ClientId>,
    /// Milestone ids removed locally but not yet confirmed deleted remotely.
    pub milestone_deletions: BTreeSet<ClientId>,
    pub filters: Filters,
    pub view_mode: ViewMode,
    pub search_query: String,
    pub auth: AuthState,
    pub sync: SyncState,
    /// The category registry has unconfirmed local changes.
    pub categories_pending: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            milestones: Vec::new(),
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            task_deletions: BTreeSet::new(),
            milestone_deletions: BTreeSet::new(),
            filters: Filters::default(),
            view_mode: ViewMode::default(),
            search_query: String::new(),
            auth: AuthState::default(),
            sync: SyncState::default(),
            categories_pending: false,
        }
    }
}
