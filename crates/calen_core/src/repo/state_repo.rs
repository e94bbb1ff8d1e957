//! Snapshot persistence for the tracker state.
//!
//! # Responsibility
//! - Save the durable subset of [`StoreState`] and load it back at startup.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Session state (auth, sync status, search query, registry-pending flag)
//!   is never persisted; loading always yields a fresh session.
//!
//! # See also
//! - docs/architecture/persistence.md

use crate::db::DbError;
use crate::model::milestone::{Milestone, MilestoneKind};
use crate::model::task::{ClientId, Task};
use crate::store::state::{Filters, StoreState, ViewMode};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    client_id,
    remote_id,
    title,
    description,
    deadline_ms,
    categories,
    importance,
    completed,
    subtasks,
    created_at_ms,
    updated_at_ms,
    pending
FROM tasks";

const MILESTONE_SELECT_SQL: &str = "SELECT
    client_id,
    remote_id,
    title,
    description,
    target_date_ms,
    kind,
    image_source,
    created_at_ms,
    updated_at_ms,
    pending
FROM milestones";

const TASKS_COLLECTION: &str = "tasks";
const MILESTONES_COLLECTION: &str = "milestones";
const SETTINGS_FILTERS_KEY: &str = "filters";
const SETTINGS_VIEW_MODE_KEY: &str = "view_mode";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for snapshot persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Writes the durable subset of `state` as the single stored snapshot,
/// replacing whatever snapshot was there before. All-or-nothing: the write
/// happens inside one transaction.
pub fn save_state(conn: &mut Connection, state: &StoreState) -> RepoResult<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM tasks", [])?;
    tx.execute("DELETE FROM milestones", [])?;
    tx.execute("DELETE FROM categories", [])?;
    tx.execute("DELETE FROM pending_deletions", [])?;
    tx.execute("DELETE FROM settings", [])?;

    {
        let mut insert = tx.prepare(
            "INSERT INTO tasks (
                client_id,
                remote_id,
                title,
                description,
                deadline_ms,
                categories,
                importance,
                completed,
                subtasks,
                created_at_ms,
                updated_at_ms,
                pending,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        )?;
        for (position, task) in state.tasks.iter().enumerate() {
            task.validate()
                .map_err(|err| RepoError::InvalidData(err.to_string()))?;
            insert.execute(params![
                task.id.to_string(),
                task.remote_id.as_deref(),
                task.title.as_str(),
                task.description.as_deref(),
                task.deadline_ms,
                encode_json(&task.categories, "tasks.categories")?,
                task.importance,
                bool_to_int(task.completed),
                encode_json(&task.subtasks, "tasks.subtasks")?,
                task.created_at_ms,
                task.updated_at_ms,
                bool_to_int(task.pending),
                position as i64,
            ])?;
        }
    }

    {
        let mut insert = tx.prepare(
            "INSERT INTO milestones (
                client_id,
                remote_id,
                title,
                description,
                target_date_ms,
                kind,
                image_source,
                created_at_ms,
                updated_at_ms,
                pending,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        )?;
        for (position, milestone) in state.milestones.iter().enumerate() {
            milestone
                .validate()
                .map_err(|err| RepoError::InvalidData(err.to_string()))?;
            insert.execute(params![
                milestone.id.to_string(),
                milestone.remote_id.as_deref(),
                milestone.title.as_str(),
                milestone.description.as_deref(),
                milestone.target_date_ms,
                milestone_kind_to_db(milestone.kind),
                milestone.image_source.as_deref(),
                milestone.created_at_ms,
                milestone.updated_at_ms,
                bool_to_int(milestone.pending),
                position as i64,
            ])?;
        }
    }

    {
        let mut insert = tx.prepare("INSERT INTO categories (position, label) VALUES (?1, ?2);")?;
        for (position, label) in state.categories.iter().enumerate() {
            insert.execute(params![position as i64, label.as_str()])?;
        }
    }

    {
        let mut insert = tx
            .prepare("INSERT INTO pending_deletions (collection, client_id) VALUES (?1, ?2);")?;
        for id in &state.task_deletions {
            insert.execute(params![TASKS_COLLECTION, id.to_string()])?;
        }
        for id in &state.milestone_deletions {
            insert.execute(params![MILESTONES_COLLECTION, id.to_string()])?;
        }
    }

    {
        let mut insert = tx.prepare("INSERT INTO settings (key, value) VALUES (?1, ?2);")?;
        insert.execute(params![
            SETTINGS_FILTERS_KEY,
            encode_json(&state.filters, "settings.filters")?
        ])?;
        insert.execute(params![
            SETTINGS_VIEW_MODE_KEY,
            view_mode_to_db(state.view_mode)
        ])?;
    }

    tx.commit()?;
    Ok(())
}

/// Loads the stored snapshot, or a default state when the database holds
/// none yet. Session fields always come back at their defaults.
pub fn load_state(conn: &Connection) -> RepoResult<StoreState> {
    let Some(filters_json) = read_setting(conn, SETTINGS_FILTERS_KEY)? else {
        return Ok(StoreState::default());
    };

    let filters: Filters = decode_json(&filters_json, "settings.filters")?;
    let view_mode = match read_setting(conn, SETTINGS_VIEW_MODE_KEY)? {
        Some(value) => parse_view_mode(&value)?,
        None => ViewMode::default(),
    };

    Ok(StoreState {
        tasks: load_tasks(conn)?,
        milestones: load_milestones(conn)?,
        categories: load_categories(conn)?,
        task_deletions: load_deletions(conn, TASKS_COLLECTION)?,
        milestone_deletions: load_deletions(conn, MILESTONES_COLLECTION)?,
        filters,
        view_mode,
        ..StoreState::default()
    })
}

fn load_tasks(conn: &Connection) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} ORDER BY position ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut tasks = Vec::new();

    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn load_milestones(conn: &Connection) -> RepoResult<Vec<Milestone>> {
    let mut stmt = conn.prepare(&format!("{MILESTONE_SELECT_SQL} ORDER BY position ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut milestones = Vec::new();

    while let Some(row) = rows.next()? {
        milestones.push(parse_milestone_row(row)?);
    }
    Ok(milestones)
}

fn load_categories(conn: &Connection) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT label FROM categories ORDER BY position ASC;")?;
    let mut rows = stmt.query([])?;
    let mut labels = Vec::new();

    while let Some(row) = rows.next()? {
        labels.push(row.get("label")?);
    }
    Ok(labels)
}

fn load_deletions(conn: &Connection, collection: &str) -> RepoResult<BTreeSet<ClientId>> {
    let mut stmt = conn.prepare(
        "SELECT client_id FROM pending_deletions WHERE collection = ?1 ORDER BY client_id ASC;",
    )?;
    let mut rows = stmt.query([collection])?;
    let mut ids = BTreeSet::new();

    while let Some(row) = rows.next()? {
        let id_text: String = row.get("client_id")?;
        ids.insert(parse_client_id(&id_text, "pending_deletions.client_id")?);
    }
    Ok(ids)
}

fn read_setting(conn: &Connection, key: &str) -> RepoResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1;")?;
    let mut rows = stmt.query([key])?;

    if let Some(row) = rows.next()? {
        return Ok(Some(row.get("value")?));
    }
    Ok(None)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("client_id")?;
    let categories_text: String = row.get("categories")?;
    let subtasks_text: String = row.get("subtasks")?;

    let task = Task {
        id: parse_client_id(&id_text, "tasks.client_id")?,
        remote_id: row.get("remote_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        deadline_ms: row.get("deadline_ms")?,
        categories: decode_json(&categories_text, "tasks.categories")?,
        importance: row.get("importance")?,
        completed: int_to_bool(row.get("completed")?, "tasks.completed")?,
        subtasks: decode_json(&subtasks_text, "tasks.subtasks")?,
        created_at_ms: row.get("created_at_ms")?,
        updated_at_ms: row.get("updated_at_ms")?,
        pending: int_to_bool(row.get("pending")?, "tasks.pending")?,
    };
    task.validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(task)
}

fn parse_milestone_row(row: &Row<'_>) -> RepoResult<Milestone> {
    let id_text: String = row.get("client_id")?;
    let kind_text: String = row.get("kind")?;

    let milestone = Milestone {
        id: parse_client_id(&id_text, "milestones.client_id")?,
        remote_id: row.get("remote_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        target_date_ms: row.get("target_date_ms")?,
        kind: parse_milestone_kind(&kind_text)?,
        image_source: row.get("image_source")?,
        created_at_ms: row.get("created_at_ms")?,
        updated_at_ms: row.get("updated_at_ms")?,
        pending: int_to_bool(row.get("pending")?, "milestones.pending")?,
    };
    milestone
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(milestone)
}

fn parse_client_id(value: &str, column: &str) -> RepoResult<ClientId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn milestone_kind_to_db(kind: MilestoneKind) -> &'static str {
    match kind {
        MilestoneKind::Countdown => "countdown",
        MilestoneKind::CountUp => "count_up",
    }
}

fn parse_milestone_kind(value: &str) -> RepoResult<MilestoneKind> {
    match value {
        "countdown" => Ok(MilestoneKind::Countdown),
        "count_up" => Ok(MilestoneKind::CountUp),
        other => Err(RepoError::InvalidData(format!(
            "invalid milestone kind `{other}` in milestones.kind"
        ))),
    }
}

fn view_mode_to_db(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::List => "list",
        ViewMode::Timeline => "timeline",
        ViewMode::Milestones => "milestones",
    }
}

fn parse_view_mode(value: &str) -> RepoResult<ViewMode> {
    match value {
        "list" => Ok(ViewMode::List),
        "timeline" => Ok(ViewMode::Timeline),
        "milestones" => Ok(ViewMode::Milestones),
        other => Err(RepoError::InvalidData(format!(
            "invalid view mode `{other}` in settings.{SETTINGS_VIEW_MODE_KEY}"
        ))),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(value: &str, column: &str) -> RepoResult<T> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn encode_json<T: serde::Serialize>(value: &T, column: &str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("could not encode {column}: {err}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
