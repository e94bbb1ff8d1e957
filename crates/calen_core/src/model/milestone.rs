//! Milestone domain model for date-anchored countdown/count-up items.
//!
//! # Responsibility
//! - Define the milestone record tracked against a target calendar date.
//! - Provide whole-day distance computation for display logic.
//!
//! # Invariants
//! - `id` is generated once at creation and never reused for another record.
//! - `pending` is cleared only by remote confirmation.

use crate::model::task::ClientId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MS_PER_DAY: i64 = 86_400_000;

/// Validation failures for milestone construction and mutation inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneValidationError {
    NilId,
    BlankTitle,
}

impl Display for MilestoneValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "client id must not be nil"),
            Self::BlankTitle => write!(f, "title must not be blank"),
        }
    }
}

impl Error for MilestoneValidationError {}

/// Direction of the day count relative to the target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// Days remaining until a future date.
    Countdown,
    /// Days elapsed since a past date.
    CountUp,
}

/// Canonical milestone record shared by cache, persistence and sync payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Stable client id used for merge matching and deletion tracking.
    pub id: ClientId,
    /// Opaque identifier assigned by the remote store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix epoch milliseconds of the anchored calendar date.
    pub target_date_ms: i64,
    pub kind: MilestoneKind,
    /// Data URI or external URL of the backdrop image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_source: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
    /// Unix epoch milliseconds. Restamped on every local mutation.
    pub updated_at_ms: i64,
    /// Local-change marker awaiting remote confirmation.
    #[serde(default)]
    pub pending: bool,
}

impl Milestone {
    /// Creates a new milestone with a generated stable id, marked pending.
    pub fn new(
        title: impl Into<String>,
        target_date_ms: i64,
        kind: MilestoneKind,
        now_ms: i64,
    ) -> Result<Self, MilestoneValidationError> {
        Self::with_id(Uuid::new_v4(), title, target_date_ms, kind, now_ms)
    }

    /// Creates a new milestone with a caller-provided stable id.
    ///
    /// Used by tests and import paths where identity already exists.
    pub fn with_id(
        id: ClientId,
        title: impl Into<String>,
        target_date_ms: i64,
        kind: MilestoneKind,
        now_ms: i64,
    ) -> Result<Self, MilestoneValidationError> {
        let milestone = Self {
            id,
            remote_id: None,
            title: title.into(),
            description: None,
            target_date_ms,
            kind,
            image_source: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            pending: true,
        };
        milestone.validate()?;
        Ok(milestone)
    }

    /// Checks structural invariants of this record.
    pub fn validate(&self) -> Result<(), MilestoneValidationError> {
        if self.id.is_nil() {
            return Err(MilestoneValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(MilestoneValidationError::BlankTitle);
        }
        Ok(())
    }

    /// Signed whole-day distance from `now_ms` to the target date.
    ///
    /// Days are compared as UTC calendar days, so two instants on the same
    /// day yield 0 regardless of time of day. Positive values mean the
    /// target lies in the future, negative in the past.
    pub fn days_until(&self, now_ms: i64) -> i64 {
        self.target_date_ms.div_euclid(MS_PER_DAY) - now_ms.div_euclid(MS_PER_DAY)
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

/// Partial update payload for milestone mutations.
///
/// `None` fields keep their current value; double options distinguish
/// "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub target_date_ms: Option<i64>,
    pub kind: Option<MilestoneKind>,
    pub image_source: Option<Option<String>>,
}
