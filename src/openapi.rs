//! OpenAPI documentation, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::{handlers, models};

/// Registers the two credential schemes: the API bearer token and the
/// browser session cookie.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "API token issued at registration. Include it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_API_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "session_cookie".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("user_session"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskloft API",
        description = "Personal task tracking with email confirmation, token auth, and file attachments"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::confirm,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::users::me,
        handlers::tasks::create_task,
        handlers::tasks::list_tasks,
        handlers::tasks::update_task_status,
        handlers::tasks::delete_task,
        handlers::attachments::upload_attachment,
        handlers::attachments::delete_attachment,
    ),
    components(schemas(
        models::auth::RegisterRequest,
        models::auth::RegisterResponse,
        models::auth::LoginRequest,
        models::auth::AuthSuccessResponse,
        models::auth::ConfirmResponse,
        models::auth::SessionInfo,
        models::tasks::TaskStatus,
        models::tasks::CreateTaskRequest,
        models::tasks::UpdateStatusRequest,
        models::tasks::TaskResponse,
        models::tasks::AttachmentResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Account registration, confirmation, and sessions"),
        (name = "users", description = "Current account info"),
        (name = "tasks", description = "Task management"),
        (name = "attachments", description = "Task file attachments"),
    )
)]
pub struct ApiDoc;
