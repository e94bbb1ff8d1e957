//! Domain model for synchronized task and milestone records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one entity shape shared by cache, persistence and sync payloads.
//!
//! # Invariants
//! - Every synchronized record is identified by a stable `ClientId`.
//! - `pending` marks local changes awaiting remote confirmation and is never
//!   raised by remote data.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod milestone;
pub mod task;
