//! Repository layer between domain state and SQLite storage.

pub mod state_repo;
