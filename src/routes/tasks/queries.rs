use async_trait::async_trait;
use sqlx::{PgPool, Result};
use uuid::Uuid;

use super::dto::{NewTask, TaskChanges};
use super::model::Task;
use super::repository::TaskRepository;

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Task>> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, created_at, updated_at
            FROM tasks
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn create(&self, input: NewTask) -> Result<Task> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn update(&self, task: &Task, changes: TaskChanges) -> Result<Option<Task>> {
        let rec = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(task.id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.status.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec)
    }

    async fn delete(&self, task: &Task) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
