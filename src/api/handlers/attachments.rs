use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use rand::prelude::*;

use crate::{
    AppState,
    api::models::tasks::AttachmentResponse,
    auth::BearerUser,
    errors::Error,
    types::TaskId,
};

const OBJECT_NAME_LEN: usize = 12;
const OBJECT_NAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Upload an attachment for a task
#[utoipa::path(
    post,
    path = "/tasks/{id}/attachment",
    tag = "attachments",
    params(("id" = i64, Path, description = "Task ID")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Attachment stored", body = AttachmentResponse),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Task not found"),
        (status = 406, description = "File rejected"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id, task_id = %id))]
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: BearerUser,
    Path(id): Path<TaskId>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentResponse>, Error> {
    let task = state.stores.tasks.get(id, user.0.id).await?.ok_or_else(|| Error::NotFound {
        resource: "task".to_string(),
        id: id.to_string(),
    })?;

    if task.attachment_url.is_some() {
        return Err(Error::NotAcceptable {
            message: "Task already has an attachment".to_string(),
        });
    }

    let (filename, content_type, bytes) = read_file_field(&mut multipart).await?;

    let extension = allowed_extension(&filename, &state.config.limits.allowed_extensions)?;

    if bytes.len() as u64 > state.config.limits.max_upload_size {
        return Err(Error::NotAcceptable {
            message: format!(
                "File exceeds the maximum upload size of {} bytes",
                state.config.limits.max_upload_size
            ),
        });
    }

    let key = format!("t-{}-{}.{}", id, random_object_name(), extension);
    let url = state.stores.files.put(&key, bytes, content_type.as_deref()).await?;

    state.stores.tasks.set_attachment(id, user.0.id, Some(&url)).await?;

    Ok(Json(AttachmentResponse { id, url }))
}

/// Remove a task's attachment
#[utoipa::path(
    delete,
    path = "/tasks/{id}/attachment",
    tag = "attachments",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Task or attachment not found"),
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %user.0.id, task_id = %id))]
pub async fn delete_attachment(
    State(state): State<AppState>,
    user: BearerUser,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, Error> {
    let task = state.stores.tasks.get(id, user.0.id).await?.ok_or_else(|| Error::NotFound {
        resource: "task".to_string(),
        id: id.to_string(),
    })?;

    let url = task.attachment_url.ok_or_else(|| Error::NotFound {
        resource: "attachment for task".to_string(),
        id: id.to_string(),
    })?;

    // The object key is the last path segment of the stored URL
    let key = url.rsplit('/').next().unwrap_or(&url);
    state.stores.files.delete(key).await?;

    state.stores.tasks.set_attachment(id, user.0.id, None).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Pull the `file` field out of the multipart body.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Option<String>, Vec<u8>), Error> {
    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Invalid multipart body: {e}"),
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|f| f.to_string())
            .ok_or_else(|| Error::BadRequest {
                message: "File field is missing a filename".to_string(),
            })?;
        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest {
                message: format!("Failed to read file contents: {e}"),
            })?
            .to_vec();

        return Ok((filename, content_type, bytes));
    }

    Err(Error::BadRequest {
        message: "Multipart body must contain a 'file' field".to_string(),
    })
}

/// Check the filename's extension against the allow-list, case-insensitively.
fn allowed_extension(filename: &str, allowed: &[String]) -> Result<String, Error> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => Ok(ext),
        _ => Err(Error::NotAcceptable {
            message: format!("File type not allowed; accepted extensions: {}", allowed.join(", ")),
        }),
    }
}

fn random_object_name() -> String {
    let mut rng = rand::rng();
    (0..OBJECT_NAME_LEN)
        .map(|_| OBJECT_NAME_CHARSET[rng.random_range(0..OBJECT_NAME_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenKind;
    use crate::store::{NewTask, TaskStore};
    use crate::test_utils::{TestContext, create_test_context, test_server};
    use axum_test::multipart::{MultipartForm, Part};

    async fn user_with_task(ctx: &TestContext) -> (String, TaskId) {
        let user = ctx.credentials.insert_user("alice1", "alice@example.com", "hash", "tok");
        let token = ctx.state.gate.issue("alice@example.com", TokenKind::Bearer).unwrap();
        let task = ctx
            .tasks
            .create(NewTask {
                user_id: user.id,
                title: "buy groceries".to_string(),
                description: None,
                level: 0,
                due_at: None,
            })
            .await
            .unwrap();
        (token, task.id)
    }

    fn upload_form(filename: &str, bytes: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(bytes.to_vec()).file_name(filename).mime_type("application/octet-stream"),
        )
    }

    #[tokio::test]
    async fn test_upload_attachment() {
        let ctx = create_test_context();
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        let response = server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("receipt.pdf", b"%PDF-1.4"))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let url = body["url"].as_str().unwrap();

        // Stored object is named t-{task}-{random}.pdf
        let key = url.rsplit('/').next().unwrap();
        assert!(key.starts_with(&format!("t-{task_id}-")));
        assert!(key.ends_with(".pdf"));
        assert!(ctx.files.contains(key));
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let ctx = create_test_context();
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        let response = server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("payload.exe", b"MZ"))
            .await;

        response.assert_status(StatusCode::NOT_ACCEPTABLE);
        assert_eq!(ctx.files.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let mut ctx = create_test_context();
        ctx.state.config.limits.max_upload_size = 16;
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        let response = server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("notes.txt", &[0u8; 32]))
            .await;

        response.assert_status(StatusCode::NOT_ACCEPTABLE);
        assert_eq!(ctx.files.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_second_attachment() {
        let ctx = create_test_context();
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        let first = server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("notes.txt", b"first"))
            .await;
        first.assert_status_ok();

        let second = server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("other.txt", b"second"))
            .await;
        second.assert_status(StatusCode::NOT_ACCEPTABLE);
        assert_eq!(ctx.files.object_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_to_missing_task_is_404() {
        let ctx = create_test_context();
        ctx.credentials.insert_user("alice1", "alice@example.com", "hash", "tok");
        let token = ctx.state.gate.issue("alice@example.com", TokenKind::Bearer).unwrap();
        let server = test_server(ctx.state.clone());

        let response = server
            .post("/tasks/9999/attachment")
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("notes.txt", b"data"))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_attachment() {
        let ctx = create_test_context();
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        server
            .post(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .multipart(upload_form("notes.txt", b"data"))
            .await
            .assert_status_ok();

        let response = server
            .delete(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(ctx.files.object_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_attachment_when_none_is_404() {
        let ctx = create_test_context();
        let (token, task_id) = user_with_task(&ctx).await;
        let server = test_server(ctx.state.clone());

        let response = server
            .delete(&format!("/tasks/{task_id}/attachment"))
            .add_header("authorization", format!("Bearer {token}"))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_allowed_extension_case_insensitive() {
        let allowed = vec!["txt".to_string(), "pdf".to_string()];
        assert_eq!(allowed_extension("Report.PDF", &allowed).unwrap(), "pdf");
        assert!(allowed_extension("script.sh", &allowed).is_err());
        assert!(allowed_extension("noextension", &allowed).is_err());
        assert!(allowed_extension("trailingdot.", &allowed).is_err());
    }

    #[test]
    fn test_random_object_name_shape() {
        let name = random_object_name();
        assert_eq!(name.len(), 12);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(random_object_name(), random_object_name());
    }
}
