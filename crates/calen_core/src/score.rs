//! Deterministic priority scoring for tasks.
//!
//! # Responsibility
//! - Combine importance, deadline urgency and subtask progress into one
//!   comparable score.
//! - Stay pure: the same task and clock input always produce the same score.
//!
//! # Invariants
//! - Completed tasks rank strictly below every incomplete task.
//! - Urgency strictly decreases as a future deadline moves further away.
//! - Overdue urgency grows with lateness but saturates at a fixed bound.

use crate::model::task::Task;
use std::cmp::Ordering;

const COMPLETED_SCORE: f64 = -1_000_000.0;
const IMPORTANCE_WEIGHT: f64 = 200.0;
const PROGRESS_PENALTY_WEIGHT: f64 = 10.0;
const OVERDUE_BASE: f64 = 300.0;
const OVERDUE_BONUS_CAP: f64 = 100.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Fraction of finished work for a task, in `0.0..=1.0`.
///
/// Tasks without subtasks report 1.0 or 0.0 from their own completed flag.
pub fn completion_ratio(task: &Task) -> f64 {
    if task.subtasks.is_empty() {
        return if task.completed { 1.0 } else { 0.0 };
    }
    let done = task.subtasks.iter().filter(|s| s.completed).count();
    done as f64 / task.subtasks.len() as f64
}

/// Scores one task against the provided clock instant.
///
/// Incomplete tasks score `importance * 200` plus a deadline urgency term in
/// `0..=400`, minus a progress penalty of up to `importance * 10`. Completed
/// tasks sink to a fixed floor below any reachable incomplete score.
pub fn task_score(task: &Task, now_ms: i64) -> f64 {
    if task.completed {
        return COMPLETED_SCORE;
    }

    let importance = f64::from(task.importance) * IMPORTANCE_WEIGHT;
    let urgency = deadline_urgency(hours_until(task.deadline_ms, now_ms));
    let progress_penalty = if task.subtasks.is_empty() {
        0.0
    } else {
        completion_ratio(task) * f64::from(task.importance) * PROGRESS_PENALTY_WEIGHT
    };

    importance + urgency - progress_penalty
}

/// Sorts task references by descending score in place.
///
/// The sort is stable, so equal scores keep their input order.
pub fn sort_by_score(tasks: &mut [&Task], now_ms: i64) {
    tasks.sort_by(|a, b| {
        task_score(b, now_ms)
            .partial_cmp(&task_score(a, now_ms))
            .unwrap_or(Ordering::Equal)
    });
}

/// Ranks a task collection by descending score, preserving ties in order.
pub fn rank_tasks(tasks: &[Task], now_ms: i64) -> Vec<&Task> {
    let mut ranked: Vec<&Task> = tasks.iter().collect();
    sort_by_score(&mut ranked, now_ms);
    ranked
}

fn hours_until(deadline_ms: i64, now_ms: i64) -> f64 {
    (deadline_ms - now_ms) as f64 / MS_PER_HOUR
}

/// Piecewise urgency over fractional hours until the deadline.
///
/// The bands join continuously at 24h, 168h and 720h. Hours are kept
/// fractional so the curve has no plateaus inside a band.
fn deadline_urgency(hours: f64) -> f64 {
    if hours < 0.0 {
        return OVERDUE_BASE + (-hours / 2.0).min(OVERDUE_BONUS_CAP);
    }
    if hours < 24.0 {
        return 300.0 - (hours / 24.0) * 50.0;
    }
    if hours < 168.0 {
        return 250.0 - ((hours - 24.0) / 144.0) * 100.0;
    }
    if hours < 720.0 {
        return 150.0 - ((hours - 168.0) / 552.0) * 100.0;
    }
    // Far-future tail keeps strictly shrinking instead of clamping to zero,
    // so two distant deadlines never tie on urgency alone.
    50.0 * (720.0 / hours)
}

#[cfg(test)]
mod tests {
    use super::{completion_ratio, deadline_urgency, task_score};
    use crate::model::task::{Subtask, Task};

    fn sample_task(importance: u8) -> Task {
        Task::new("sample", 1_700_000_000_000, importance, 1_699_000_000_000)
            .expect("valid task")
    }

    #[test]
    fn urgency_bands_join_continuously() {
        assert_eq!(deadline_urgency(0.0), 300.0);
        assert_eq!(deadline_urgency(24.0), 250.0);
        assert_eq!(deadline_urgency(168.0), 150.0);
        assert_eq!(deadline_urgency(720.0), 50.0);
    }

    #[test]
    fn urgency_tail_keeps_decreasing_past_720_hours() {
        let near = deadline_urgency(721.0);
        let far = deadline_urgency(5_000.0);
        let very_far = deadline_urgency(100_000.0);

        assert!(near < 50.0);
        assert!(far < near);
        assert!(very_far < far);
        assert!(very_far > 0.0);
    }

    #[test]
    fn overdue_urgency_saturates() {
        assert_eq!(deadline_urgency(-2.0), 301.0);
        assert_eq!(deadline_urgency(-200.0), 400.0);
        assert_eq!(deadline_urgency(-10_000.0), 400.0);
    }

    #[test]
    fn completion_ratio_counts_subtasks() {
        let mut task = sample_task(3);
        task.subtasks = vec![
            Subtask::new("a"),
            Subtask::new("b"),
            Subtask::new("c"),
            Subtask::new("d"),
        ];
        task.subtasks[0].completed = true;

        assert_eq!(completion_ratio(&task), 0.25);
    }

    #[test]
    fn completion_ratio_without_subtasks_follows_completed_flag() {
        let mut task = sample_task(3);
        assert_eq!(completion_ratio(&task), 0.0);

        task.completed = true;
        assert_eq!(completion_ratio(&task), 1.0);
    }

    #[test]
    fn completed_task_scores_at_fixed_floor() {
        let mut task = sample_task(5);
        task.completed = true;
        assert_eq!(task_score(&task, 0), -1_000_000.0);
    }
}
