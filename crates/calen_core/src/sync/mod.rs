//! Remote synchronization: adapter boundary and reconciliation flows.
//!
//! # Responsibility
//! - Define the transport-agnostic adapter contract (`adapter`).
//! - Drive bootstrap, push, and deletion flows against a store
//!   (`coordinator`).
//!
//! # Invariants
//! - Remote confirmation is best-effort: a failed flow leaves local state
//!   usable and retriable.
//! - Flows never block each other across collections; a task failure does
//!   not stop milestone or category work.
//!
//! # See also
//! - docs/architecture/sync.md

use crate::model::milestone::Milestone;
use crate::model::task::{ClientId, Task};

pub mod adapter;
pub mod coordinator;

/// Common surface the reconciliation flows need from a synced record.
pub trait SyncEntity: Clone {
    fn client_id(&self) -> ClientId;
    fn is_pending(&self) -> bool;
    fn clear_pending(&mut self);
}

impl SyncEntity for Task {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear_pending(&mut self) {
        self.confirm_synced();
    }
}

impl SyncEntity for Milestone {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear_pending(&mut self) {
        self.confirm_synced();
    }
}
