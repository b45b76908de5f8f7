//! Suggestion validation and merge
//!
//! Applies an untrusted [`OracleSuggestion`] to a set of tasks. Only
//! `due_date` and `priority` can change, only for ids already in the set, and
//! a bad field is dropped on its own without affecting the rest of the entry.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{OracleSuggestion, Priority, TaskId, TaskSnapshot};

/// Field names the merge is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeField {
    DueDate,
    Priority,
}

impl fmt::Display for MergeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeField::DueDate => f.write_str("due_date"),
            MergeField::Priority => f.write_str("priority"),
        }
    }
}

/// A single field that failed validation and was left unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSkip {
    pub task_id: TaskId,
    pub field: MergeField,
    pub reason: String,
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Entries whose id matched a task in the set
    pub matched_entries: usize,
    /// Fields written onto tasks
    pub applied_fields: usize,
    pub skipped_fields: Vec<FieldSkip>,
    /// Raw ids that matched nothing, rendered as JSON
    pub unknown_ids: Vec<String>,
}

impl MergeReport {
    /// True when at least one entry referred to a known task
    pub fn has_signal(&self) -> bool {
        self.matched_entries > 0
    }
}

/// Merges an oracle suggestion into `original`, returning the tasks in input order.
pub fn merge_suggestions(
    original: Vec<TaskSnapshot>,
    suggestion: &OracleSuggestion,
) -> Vec<TaskSnapshot> {
    merge_with_report(original, suggestion).0
}

/// Same as [`merge_suggestions`] but also reports what was applied and skipped.
pub fn merge_with_report(
    original: Vec<TaskSnapshot>,
    suggestion: &OracleSuggestion,
) -> (Vec<TaskSnapshot>, MergeReport) {
    let mut tasks = original;
    let mut report = MergeReport::default();

    let positions: HashMap<TaskId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task.id, i))
        .collect();

    for entry in &suggestion.entries {
        let position = entry
            .id
            .as_ref()
            .and_then(TaskId::from_json)
            .and_then(|id| positions.get(&id).copied());

        let Some(position) = position else {
            let raw = entry
                .id
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".to_string());
            tracing::debug!(id = %raw, "ignoring suggestion for unknown task");
            report.unknown_ids.push(raw);
            continue;
        };

        report.matched_entries += 1;
        let task = &mut tasks[position];

        if let Some(raw) = &entry.due_date {
            match parse_due_date(raw) {
                Ok(due_date) => {
                    task.due_date = due_date;
                    report.applied_fields += 1;
                }
                Err(reason) => skip(&mut report, task.id, MergeField::DueDate, reason),
            }
        }

        if let Some(raw) = &entry.priority {
            match parse_priority(raw) {
                Ok(priority) => {
                    task.priority = priority;
                    report.applied_fields += 1;
                }
                Err(reason) => skip(&mut report, task.id, MergeField::Priority, reason),
            }
        }
    }

    (tasks, report)
}

fn skip(report: &mut MergeReport, task_id: TaskId, field: MergeField, reason: String) {
    tracing::debug!(task_id = %task_id, field = %field, "skipping suggested field: {}", reason);
    report.skipped_fields.push(FieldSkip {
        task_id,
        field,
        reason,
    });
}

/// Accepts RFC 3339, naive ISO date-times, and bare dates. Naive values are UTC.
pub fn parse_due_date(raw: &Value) -> Result<DateTime<Utc>, String> {
    let Value::String(text) = raw else {
        return Err(format!("expected a string, got {}", raw));
    };
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(format!("unparsable date {:?}", text))
}

fn parse_priority(raw: &Value) -> Result<Priority, String> {
    match raw {
        Value::String(text) => Priority::parse_strict(text)
            .ok_or_else(|| format!("unrecognized priority {:?}", text)),
        other => Err(format!("expected a string, got {}", other)),
    }
}
