//! Task records (PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::errors::StoreError;
use crate::api::models::tasks::TaskStatus;
use crate::types::{TaskId, UserId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub level: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub level: i32,
    pub due_at: Option<DateTime<Utc>>,
}

/// All task operations are scoped to the owning account: a task id belonging
/// to someone else behaves exactly like a missing task.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, new: NewTask) -> Result<TaskRecord, StoreError>;

    async fn get(&self, id: TaskId, user_id: UserId) -> Result<Option<TaskRecord>, StoreError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<TaskRecord>, StoreError>;

    async fn set_status(&self, id: TaskId, user_id: UserId, status: TaskStatus) -> Result<(), StoreError>;

    async fn set_attachment(&self, id: TaskId, user_id: UserId, url: Option<&str>) -> Result<(), StoreError>;

    async fn delete(&self, id: TaskId, user_id: UserId) -> Result<(), StoreError>;
}

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, description, status, level, due_at, attachment_url, created_at";

#[async_trait]
impl TaskStore for PgTaskStore {
    #[tracing::instrument(skip(self, new), fields(user_id = %new.user_id))]
    async fn create(&self, new: NewTask) -> Result<TaskRecord, StoreError> {
        let task = sqlx::query_as::<_, TaskRecord>(&format!(
            "INSERT INTO tasks (user_id, title, description, level, due_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.level)
        .bind(new.due_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: TaskId, user_id: UserId) -> Result<Option<TaskRecord>, StoreError> {
        let task = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<TaskRecord>, StoreError> {
        let tasks = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn set_status(&self, id: TaskId, user_id: UserId, status: TaskStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2 AND user_id = $3")
            .bind(status)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_attachment(&self, id: TaskId, user_id: UserId, url: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET attachment_url = $1 WHERE id = $2 AND user_id = $3")
            .bind(url)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: TaskId, user_id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
pub use mock::MockTaskStore;
