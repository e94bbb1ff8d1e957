//! Filtering and ranked search over the task cache.
//!
//! # Responsibility
//! - Narrow the cache by category, status, and free-text query.
//! - Produce priority-ordered views for list rendering.
//!
//! # Invariants
//! - Filtering is allocation-light and borrows from the cache; it never
//!   clones tasks.
//! - `filter_tasks` preserves cache order; ranking is a separate step.

use crate::model::task::Task;
use crate::score;
use crate::store::state::{CategoryFilter, Filters, StatusFilter};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Active narrowing criteria for a task view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub filters: Filters,
    pub query: String,
}

/// Returns the tasks matching every criterion, in cache order.
///
/// The query is split on whitespace and matched case-insensitively; every
/// token must appear somewhere in the task's title, description, or
/// category labels. A blank query matches everything.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter, now_ms: i64) -> Vec<&'a Task> {
    let tokens = query_tokens(&filter.query);
    tasks
        .iter()
        .filter(|task| matches_category(task, &filter.filters.category))
        .filter(|task| matches_status(task, filter.filters.status, now_ms))
        .filter(|task| matches_query(task, &tokens))
        .collect()
}

/// Filters, then orders by descending priority score.
///
/// Ties keep cache order, so two identical tasks render in insertion order.
pub fn filter_and_rank<'a>(tasks: &'a [Task], filter: &TaskFilter, now_ms: i64) -> Vec<&'a Task> {
    let mut matched = filter_tasks(tasks, filter, now_ms);
    score::sort_by_score(&mut matched, now_ms);
    matched
}

fn matches_category(task: &Task, filter: &CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(label) => task.categories.contains(label),
    }
}

fn matches_status(task: &Task, filter: StatusFilter, now_ms: i64) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Active => !task.completed,
        StatusFilter::Completed => task.completed,
        StatusFilter::Overdue => task.deadline_ms < now_ms && !task.completed,
    }
}

fn query_tokens(query: &str) -> Vec<String> {
    WHITESPACE_RE
        .split(query.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_query(task: &Task, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    let haystack = search_text(task);
    tokens.iter().all(|token| haystack.contains(token.as_str()))
}

fn search_text(task: &Task) -> String {
    let mut text = task.title.to_lowercase();
    if let Some(description) = &task.description {
        text.push(' ');
        text.push_str(&description.to_lowercase());
    }
    for category in &task.categories {
        text.push(' ');
        text.push_str(&category.to_lowercase());
    }
    text
}
