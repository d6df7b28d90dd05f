use async_trait::async_trait;
use chrono::Utc;
use sqlx::Result;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::dto::{NewTask, TaskChanges};
use super::model::Task;

/// Storage primitives for tasks. Failures are surfaced as-is.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Cheap round-trip proving the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// All tasks, oldest first.
    async fn find_all(&self) -> Result<Vec<Task>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    async fn create(&self, input: NewTask) -> Result<Task>;

    /// Applies only the fields present in `changes`. `None` if the row is gone.
    async fn update(&self, task: &Task, changes: TaskChanges) -> Result<Option<Task>>;

    /// Returns whether a row was removed.
    async fn delete(&self, task: &Task) -> Result<bool>;
}

/// Process-local storage, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, input: NewTask) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            status: input.status,
            created_at: now,
            updated_at: now,
        };

        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task, changes: TaskChanges) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(stored) = tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            stored.title = title;
        }
        if let Some(description) = changes.description {
            stored.description = description;
        }
        if let Some(status) = changes.status {
            stored.status = status;
        }
        stored.updated_at = Utc::now();

        Ok(Some(stored.clone()))
    }

    async fn delete(&self, task: &Task) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != task.id);
        Ok(tasks.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: "desc".to_string(),
            status: "pending".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let repo = InMemoryTaskRepository::new();

        let a = repo.create(new_task("a")).await.unwrap();
        let b = repo.create(new_task("b")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(repo.find_by_id(a.id).await.unwrap(), Some(a.clone()));

        let all = repo.find_all().await.unwrap();
        assert_eq!(all, vec![a, b]);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let repo = InMemoryTaskRepository::new();
        let task = repo.create(new_task("a")).await.unwrap();

        let changes = TaskChanges {
            status: Some("done".to_string()),
            ..Default::default()
        };
        let updated = repo.update(&task, changes).await.unwrap().unwrap();

        assert_eq!(updated.status, "done");
        assert_eq!(updated.title, task.title);
        assert_eq!(updated.description, task.description);
        assert!(updated.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let repo = InMemoryTaskRepository::new();
        let task = repo.create(new_task("a")).await.unwrap();

        assert!(repo.delete(&task).await.unwrap());
        assert!(!repo.delete(&task).await.unwrap());
        assert!(repo
            .update(&task, TaskChanges::default())
            .await
            .unwrap()
            .is_none());
        assert!(repo.find_all().await.unwrap().is_empty());
    }
}
