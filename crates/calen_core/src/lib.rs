//! Core domain logic for Calen.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod score;
pub mod search;
pub mod store;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::milestone::{Milestone, MilestoneKind, MilestonePatch, MilestoneValidationError};
pub use model::task::{ClientId, Subtask, Task, TaskPatch, TaskValidationError};
pub use repo::state_repo::{load_state, save_state, RepoError, RepoResult};
pub use score::{completion_ratio, rank_tasks, task_score};
pub use search::{filter_and_rank, filter_tasks, TaskFilter};
pub use store::state::{
    AuthState, CategoryFilter, Filters, StatusFilter, StoreState, SyncState, SyncStatus,
    UserProfile, ViewMode,
};
pub use store::{Store, StoreError, StoreResult};
pub use sync::adapter::{BootstrapBatch, RemoteAdapter, RemoteError, RemoteResult};
pub use sync::coordinator::{SyncCoordinator, SyncOutcome};
pub use sync::SyncEntity;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
