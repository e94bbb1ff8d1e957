//! Remote adapter contract.
//!
//! # Responsibility
//! - Describe every remote operation the coordinator needs, free of any
//!   transport or wire-format detail.
//!
//! # Invariants
//! - Implementations treat client ids as the stable join key and
//!   `remote_id` as an opaque server handle.
//! - Push operations echo the stored records back so the caller can
//!   reconcile server-assigned fields.

use crate::model::milestone::Milestone;
use crate::model::task::{ClientId, Task};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures crossing the remote boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The session is not accepted by the remote store.
    Unauthorized,
    /// Network or server failure, with a short operator-facing message.
    Transport(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "remote request unauthorized"),
            Self::Transport(msg) => write!(f, "remote transport failure: {msg}"),
        }
    }
}

impl Error for RemoteError {}

/// Snapshot returned by a bootstrap fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapBatch<T> {
    /// Whether the remote store has a record of this user at all. A fetch
    /// for an unknown user succeeds with `false` and no entities rather
    /// than failing.
    pub user_exists: bool,
    pub entities: Vec<T>,
}

/// Everything the sync coordinator needs from a remote store.
///
/// Implementations own transport, authentication headers, and retry policy.
/// The coordinator calls these synchronously; an implementation backed by
/// an async client blocks on its own runtime internally.
pub trait RemoteAdapter {
    /// Fetches the full remote task set for the signed-in user.
    fn bootstrap_tasks(&self) -> RemoteResult<BootstrapBatch<Task>>;

    /// Upserts the given tasks and echoes the stored records.
    ///
    /// An empty batch is meaningful: it materializes the user on the remote
    /// store without writing any records.
    fn push_tasks(&self, tasks: &[Task]) -> RemoteResult<Vec<Task>>;

    /// Deletes one task by client id. Deleting an id the remote store does
    /// not know succeeds.
    fn delete_task(&self, id: ClientId) -> RemoteResult<()>;

    /// Fetches the full remote milestone set for the signed-in user.
    fn bootstrap_milestones(&self) -> RemoteResult<BootstrapBatch<Milestone>>;

    /// Upserts the given milestones and echoes the stored records.
    fn push_milestones(&self, milestones: &[Milestone]) -> RemoteResult<Vec<Milestone>>;

    /// Deletes one milestone by client id, tolerating unknown ids.
    fn delete_milestone(&self, id: ClientId) -> RemoteResult<()>;

    /// Fetches the category registry stored for `email`.
    fn fetch_categories(&self, email: &str) -> RemoteResult<Vec<String>>;

    /// Replaces the category registry stored for `email`.
    fn store_categories(&self, email: &str, labels: &[String]) -> RemoteResult<()>;
}
