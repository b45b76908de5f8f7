//! Deterministic rebalancer
//!
//! The oracle-free scheduling path. Overdue work is pushed forward by tier,
//! and work due within the next few days is bumped one priority tier. Pure
//! function of the input tasks and `now`.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Priority, TaskSnapshot};

/// Window, in days, for the near-due escalation pass
pub const NEAR_DUE_DAYS: i64 = 3;

/// Offset in days for the overdue task at position `index` of the sorted overdue list.
///
/// Same-tier tasks fan out across the tier's window instead of landing on one
/// date; the result never exceeds the tier cap.
pub fn reschedule_offset_days(priority: Priority, index: usize) -> i64 {
    let i = i64::try_from(index).unwrap_or(i64::MAX);
    match priority {
        Priority::Urgent => 1,
        Priority::High => 2i64.saturating_add(i).min(7),
        Priority::Medium => 7i64.saturating_add(i).min(14),
        Priority::Low => 14i64.saturating_add(i).min(30),
    }
}

/// True for unfinished tasks due in `[now, now + 3 days]`
pub fn is_near_due(task: &TaskSnapshot, now: DateTime<Utc>) -> bool {
    !task.status.is_done()
        && task.due_date >= now
        && task.due_date <= now + Duration::days(NEAR_DUE_DAYS)
}

/// Reschedules overdue tasks and escalates near-due ones.
///
/// Returns the tasks in input order; only `due_date` and `priority` change.
pub fn fallback_optimize(tasks: Vec<TaskSnapshot>, now: DateTime<Utc>) -> Vec<TaskSnapshot> {
    let mut tasks = tasks;

    // Classify against the original due dates so the two passes stay disjoint.
    let mut overdue: Vec<usize> = Vec::new();
    let mut near_due: Vec<usize> = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        if task.is_overdue(now) {
            overdue.push(i);
        } else if is_near_due(task, now) {
            near_due.push(i);
        }
    }

    // Stable: equal tiers keep their input order.
    overdue.sort_by_key(|&i| tasks[i].priority.urgency_rank());

    for (rank, &i) in overdue.iter().enumerate() {
        let task = &mut tasks[i];
        let days = reschedule_offset_days(task.priority, rank);
        task.due_date = now + Duration::days(days);
    }

    for &i in &near_due {
        let task = &mut tasks[i];
        task.priority = task.priority.escalated();
    }

    tracing::debug!(
        total = tasks.len(),
        rescheduled = overdue.len(),
        escalated = near_due.len(),
        "fallback rebalance complete"
    );

    tasks
}
