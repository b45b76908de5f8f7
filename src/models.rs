//! Core models for the replan library
//!
//! This module contains the task, project, and suggestion types the optimizer
//! works on. Persistence owns the canonical records; these are working copies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque task identifier, stable across calls
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the inner value of the id.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Reads an id out of untrusted JSON: an integer, a float with no
    /// fractional part, or a string holding an integer.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| whole_f64(n.as_f64()?)).map(Self),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Self),
            _ => None,
        }
    }
}

fn whole_f64(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow state of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

/// Task priority. Variants are declared in ascending urgency so the derived
/// ordering has `Urgent` as the maximum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    /// Rank used when ordering work: 0 is the most urgent.
    pub fn urgency_rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// One tier up for near-due work. `High` and `Urgent` are fixed points.
    pub fn escalated(&self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            other => *other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Parses exactly one of the four wire values. No case folding.
    pub fn parse_strict(raw: &str) -> Option<Priority> {
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// A task as seen by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    pub project_id: i64,
    #[serde(default)]
    pub assignee_id: Option<i64>,
}

impl TaskSnapshot {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && !self.status.is_done()
    }

    /// The write-back tuple for this task.
    pub fn to_update(&self) -> TaskUpdate {
        TaskUpdate {
            id: self.id,
            due_date: self.due_date,
            priority: self.priority,
        }
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            title: self.title.clone(),
            status: self.status,
            priority: self.priority,
        }
    }
}

/// The only fields the optimizer ever writes back
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: TaskId,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
}

/// Existing task as listed in the suggestion prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
}

/// Project fields the suggestion generator reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub status: ProjectStatus,
    #[serde(default = "default_project_priority")]
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_percentage: f64,
}

fn default_project_priority() -> Priority {
    Priority::Medium
}

/// One allow-listed entry of an oracle schedule suggestion.
///
/// Values stay raw JSON until the merger validates them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionEntry {
    pub id: Option<Value>,
    pub due_date: Option<Value>,
    pub priority: Option<Value>,
}

impl SuggestionEntry {
    /// Keeps `id`, `due_date` and `priority`; every other key is dropped here.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            id: object.get("id").cloned(),
            due_date: object.get("due_date").cloned(),
            priority: object.get("priority").cloned(),
        }
    }
}

/// Untrusted partial update produced by the oracle for one call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OracleSuggestion {
    pub entries: Vec<SuggestionEntry>,
}

impl OracleSuggestion {
    pub fn new(entries: Vec<SuggestionEntry>) -> Self {
        Self { entries }
    }
}

/// Raw object proposed by the suggestion oracle, before coercion
pub type DraftProposal = Map<String, Value>;

/// A proposed new task, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSuggestionDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub due_date: DateTime<Utc>,
    pub tags: Vec<String>,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_ordering_matches_rank() {
        let mut by_rank = Priority::ALL.to_vec();
        by_rank.sort_by_key(|p| p.urgency_rank());
        assert_eq!(
            by_rank,
            vec![
                Priority::Urgent,
                Priority::High,
                Priority::Medium,
                Priority::Low
            ]
        );
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_escalation_fixed_points() {
        assert_eq!(Priority::Low.escalated(), Priority::Medium);
        assert_eq!(Priority::Medium.escalated(), Priority::High);
        assert_eq!(Priority::High.escalated(), Priority::High);
        assert_eq!(Priority::Urgent.escalated(), Priority::Urgent);
        assert_eq!(Priority::High.escalated().escalated(), Priority::High);
    }

    #[test]
    fn test_parse_strict_rejects_other_spellings() {
        assert_eq!(Priority::parse_strict("high"), Some(Priority::High));
        assert_eq!(Priority::parse_strict("urgent"), Some(Priority::Urgent));
        assert_eq!(Priority::parse_strict("HIGH"), None);
        assert_eq!(Priority::parse_strict(" low"), None);
        assert_eq!(Priority::parse_strict("critical"), None);
    }

    #[test]
    fn test_task_id_from_json() {
        assert_eq!(TaskId::from_json(&json!(5)), Some(TaskId::new(5)));
        assert_eq!(TaskId::from_json(&json!("7")), Some(TaskId::new(7)));
        assert_eq!(TaskId::from_json(&json!(5.5)), None);
        assert_eq!(TaskId::from_json(&json!(1.0)), Some(TaskId::new(1)));
        assert_eq!(TaskId::from_json(&json!(-3.0)), Some(TaskId::new(-3)));
        assert_eq!(TaskId::from_json(&json!(1e300)), None);
        assert_eq!(TaskId::from_json(&json!(null)), None);
        assert_eq!(TaskId::from_json(&json!("abc")), None);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let task: TaskSnapshot = serde_json::from_value(json!({
            "id": 3,
            "title": "Write docs",
            "status": "in-progress",
            "priority": "urgent",
            "due_date": "2024-05-01T12:00:00Z",
            "project_id": 1
        }))
        .unwrap();

        assert_eq!(task.id, TaskId::new(3));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.estimated_hours, 0.0);
        assert_eq!(task.assignee_id, None);

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["status"], "in-progress");
        assert_eq!(back["id"], 3);
    }

    #[test]
    fn test_suggestion_entry_drops_unlisted_keys() {
        let object = json!({
            "id": 1,
            "title": "renamed",
            "status": "done",
            "priority": "low"
        });
        let entry = SuggestionEntry::from_object(object.as_object().unwrap());
        assert_eq!(entry.id, Some(json!(1)));
        assert_eq!(entry.priority, Some(json!("low")));
        assert_eq!(entry.due_date, None);
    }
}
