//! Task request and response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::Error;
use crate::store::TaskRecord;
use crate::types::{TaskId, UserId};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Wait,
    InProgress,
    Done,
    Archive,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Priority, 0 (lowest) to 3 (highest)
    #[serde(default)]
    pub level: i32,
    pub due_at: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.chars().count() < 3 || self.title.chars().count() > 128 {
            return Err(Error::BadRequest {
                message: "Title must be between 3 and 128 characters".to_string(),
            });
        }
        if let Some(description) = &self.description {
            if description.chars().count() < 3 || description.chars().count() > 255 {
                return Err(Error::BadRequest {
                    message: "Description must be between 3 and 255 characters".to_string(),
                });
            }
        }
        if !(0..=3).contains(&self.level) {
            return Err(Error::BadRequest {
                message: "Level must be between 0 and 3".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: TaskId,
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub level: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<TaskRecord> for TaskResponse {
    fn from(task: TaskRecord) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            title: task.title,
            description: task.description,
            status: task.status,
            level: task.level,
            due_at: task.due_at,
            attachment_url: task.attachment_url,
            created_at: task.created_at,
        }
    }
}

/// Response for attachment operations.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: TaskId,
    pub url: String,
}
