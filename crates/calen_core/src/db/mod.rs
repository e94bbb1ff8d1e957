//! SQLite-backed local persistence.
//!
//! # Responsibility
//! - Open on-disk or in-memory connections with sane pragmas.
//! - Apply versioned schema migrations at open time.
//!
//! # Invariants
//! - Every connection handed out has foreign keys on and the latest
//!   supported schema applied.
//! - A database written by a newer build is rejected, never downgraded.
//!
//! # See also
//! - docs/architecture/persistence.md

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures from the persistence layer.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The database file carries a schema version newer than this build
    /// understands.
    UnsupportedSchemaVersion { db_version: i64, latest_supported: i64 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite failure: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "unsupported schema version {db_version} (latest supported is {latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
