use std::sync::Arc;

use super::dto::{NewTask, TaskChanges};
use super::model::{Task, TaskResponse};
use super::repository::TaskRepository;
use crate::error::AppError;

#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.repository.ping().await?)
    }

    pub async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn find_all(&self) -> Result<Vec<TaskResponse>, AppError> {
        let tasks = self.repository.find_all().await?;
        Ok(tasks.into_iter().map(TaskResponse::from).collect())
    }

    pub async fn create(&self, input: NewTask) -> Result<TaskResponse, AppError> {
        let task = self.repository.create(input).await?;
        Ok(task.into())
    }

    /// Returns the record as stored after the update.
    pub async fn update(&self, task: Task, changes: TaskChanges) -> Result<TaskResponse, AppError> {
        self.repository
            .update(&task, changes)
            .await?
            .map(TaskResponse::from)
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, task: Task) -> Result<(), AppError> {
        let removed = self.repository.delete(&task).await?;
        if !removed {
            tracing::debug!(task_id = %task.id, "task was already gone at delete time");
        }
        Ok(())
    }
}
