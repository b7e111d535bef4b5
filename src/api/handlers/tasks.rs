use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::tasks::{CreateTaskRequest, TaskResponse, UpdateStatusRequest},
    auth::BearerUser,
    errors::Error,
    store::NewTask,
    types::TaskId,
};

/// Create a new task
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    tag = "tasks",
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not authenticated"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: BearerUser,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), Error> {
    request.validate()?;

    let task = state
        .stores
        .tasks
        .create(NewTask {
            user_id: user.0.id,
            title: request.title,
            description: request.description,
            level: request.level,
            due_at: request.due_at,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List the authenticated user's tasks, newest first
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "List of tasks", body = Vec<TaskResponse>),
        (status = 403, description = "Not authenticated"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn list_tasks(State(state): State<AppState>, user: BearerUser) -> Result<Json<Vec<TaskResponse>>, Error> {
    let tasks = state.stores.tasks.list_for_user(user.0.id).await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Update a task's status
#[utoipa::path(
    patch,
    path = "/tasks/{id}/status",
    request_body = UpdateStatusRequest,
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Status updated", body = TaskResponse),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Task not found"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id, task_id = %id))]
pub async fn update_task_status(
    State(state): State<AppState>,
    user: BearerUser,
    Path(id): Path<TaskId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<TaskResponse>, Error> {
    state.stores.tasks.set_status(id, user.0.id, request.status).await?;

    let task = state.stores.tasks.get(id, user.0.id).await?.ok_or_else(|| Error::NotFound {
        resource: "task".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(task.into()))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Task not found"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id, task_id = %id))]
pub async fn delete_task(State(state): State<AppState>, user: BearerUser, Path(id): Path<TaskId>) -> Result<StatusCode, Error> {
    state.stores.tasks.delete(id, user.0.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
