//! Persistence collaborator
//!
//! The optimizer never owns durability. It reads snapshots through
//! [`TaskStore`] and hands back `(id, due_date, priority)` updates. The
//! in-memory store here backs the server and the tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::models::{ProjectSummary, TaskId, TaskSnapshot, TaskUpdate};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),

    #[error("duplicate task id {0} in seed data")]
    DuplicateTask(TaskId),
}

/// Narrow interface the AI endpoints need from persistence
pub trait TaskStore: Send + Sync {
    /// All tasks in projects owned by `user_id`
    fn tasks_for_user(&self, user_id: i64) -> Result<Vec<TaskSnapshot>, StoreError>;

    fn project(&self, project_id: i64) -> Result<Option<ProjectSummary>, StoreError>;

    fn tasks_for_project(&self, project_id: i64) -> Result<Vec<TaskSnapshot>, StoreError>;

    /// Writes back due dates and priorities. Unknown ids are ignored.
    fn apply_updates(&self, updates: &[TaskUpdate]) -> Result<usize, StoreError>;
}

/// Seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub projects: Vec<ProjectSummary>,
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
}

#[derive(Default)]
struct StoreState {
    projects: Vec<ProjectSummary>,
    tasks: Vec<TaskSnapshot>,
    index: HashMap<TaskId, usize>,
}

/// Store keeping everything in process memory
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(seed.tasks.len());
        for (i, task) in seed.tasks.iter().enumerate() {
            if index.insert(task.id, i).is_some() {
                return Err(StoreError::DuplicateTask(task.id));
            }
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(StoreState {
                projects: seed.projects,
                tasks: seed.tasks,
                index,
            })),
        })
    }

    /// Loads a JSON seed file of the form `{ "projects": [...], "tasks": [...] }`
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        tracing::info!(
            projects = seed.projects.len(),
            tasks = seed.tasks.len(),
            "loaded seed data from {}",
            path.display()
        );
        Self::from_seed(seed)
    }

    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        let state = self.state();
        state.index.get(&id).map(|&i| state.tasks[i].clone())
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TaskStore for InMemoryStore {
    fn tasks_for_user(&self, user_id: i64) -> Result<Vec<TaskSnapshot>, StoreError> {
        let state = self.state();
        let owned: Vec<i64> = state
            .projects
            .iter()
            .filter(|p| p.owner_id == user_id)
            .map(|p| p.id)
            .collect();

        Ok(state
            .tasks
            .iter()
            .filter(|t| owned.contains(&t.project_id))
            .cloned()
            .collect())
    }

    fn project(&self, project_id: i64) -> Result<Option<ProjectSummary>, StoreError> {
        Ok(self
            .state()
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .cloned())
    }

    fn tasks_for_project(&self, project_id: i64) -> Result<Vec<TaskSnapshot>, StoreError> {
        Ok(self
            .state()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn apply_updates(&self, updates: &[TaskUpdate]) -> Result<usize, StoreError> {
        let mut state = self.state();
        let mut written = 0;

        for update in updates {
            let Some(&i) = state.index.get(&update.id) else {
                tracing::debug!(task_id = %update.id, "update for unknown task ignored");
                continue;
            };
            let task = &mut state.tasks[i];
            task.due_date = update.due_date;
            task.priority = update.priority;
            written += 1;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus, TaskStatus};
    use chrono::{Duration, TimeZone, Utc};
    use std::io::Write;

    fn seed() -> SeedData {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let project = |id: i64, owner_id: i64| ProjectSummary {
            id,
            owner_id,
            name: format!("Project {}", id),
            description: String::new(),
            category: String::new(),
            status: ProjectStatus::Active,
            priority: Priority::Medium,
            start_date: start,
            end_date: None,
            completion_percentage: 0.0,
        };
        let task = |id: i64, project_id: i64| TaskSnapshot {
            id: TaskId::new(id),
            title: format!("Task {}", id),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            due_date: start + Duration::days(id),
            estimated_hours: 1.0,
            actual_hours: 0.0,
            project_id,
            assignee_id: None,
        };

        SeedData {
            projects: vec![project(1, 10), project(2, 20), project(3, 10)],
            tasks: vec![task(1, 1), task(2, 2), task(3, 3), task(4, 1)],
        }
    }

    #[test]
    fn test_tasks_for_user_follow_project_ownership() {
        let store = InMemoryStore::from_seed(seed()).unwrap();
        let ids: Vec<i64> = store
            .tasks_for_user(10)
            .unwrap()
            .iter()
            .map(|t| t.id.value())
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert!(store.tasks_for_user(99).unwrap().is_empty());
    }

    #[test]
    fn test_apply_updates_touches_only_schedule_fields() {
        let store = InMemoryStore::from_seed(seed()).unwrap();
        let before = store.task(TaskId::new(2)).unwrap();
        let due = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let written = store
            .apply_updates(&[
                TaskUpdate {
                    id: TaskId::new(2),
                    due_date: due,
                    priority: Priority::Urgent,
                },
                TaskUpdate {
                    id: TaskId::new(404),
                    due_date: due,
                    priority: Priority::Urgent,
                },
            ])
            .unwrap();
        assert_eq!(written, 1);

        let after = store.task(TaskId::new(2)).unwrap();
        assert_eq!(after.due_date, due);
        assert_eq!(after.priority, Priority::Urgent);
        assert_eq!(after.title, before.title);
        assert_eq!(after.status, before.status);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut data = seed();
        data.tasks.push(data.tasks[0].clone());
        assert!(matches!(
            InMemoryStore::from_seed(data),
            Err(StoreError::DuplicateTask(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&seed()).unwrap()).unwrap();

        let store = InMemoryStore::load(file.path()).unwrap();
        assert_eq!(store.tasks_for_project(1).unwrap().len(), 2);
        assert_eq!(store.project(2).unwrap().unwrap().owner_id, 20);
        assert!(store.project(9).unwrap().is_none());
    }
}
