use axum::Json;

use crate::{api::models::auth::SessionInfo, auth::CookieUser, errors::Error};

/// Get the currently logged-in user's session info
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 403, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(CookieUser(user): CookieUser) -> Result<Json<SessionInfo>, Error> {
    Ok(Json(SessionInfo {
        username: user.username,
        api_token: user.api_token,
        verified: user.verified,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenKind;
    use crate::test_utils::{create_test_context, test_server};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_me_with_session_cookie() {
        let ctx = create_test_context();
        ctx.credentials.insert_user("alice1", "alice@example.com", "hash", "api-tok");
        let token = ctx.state.gate.issue("alice@example.com", TokenKind::Cookie).unwrap();
        let server = test_server(ctx.state.clone());

        let response = server
            .get("/users/me")
            .add_header("cookie", format!("user_session={token}"))
            .await;

        response.assert_status_ok();
        let info: SessionInfo = response.json();
        assert_eq!(info.username, "alice1");
        assert_eq!(info.api_token, "api-tok");
        assert!(!info.verified);
    }

    #[tokio::test]
    async fn test_me_without_cookie() {
        let ctx = create_test_context();
        let server = test_server(ctx.state.clone());

        let response = server.get("/users/me").await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_me_rejects_bearer_token_in_cookie() {
        let ctx = create_test_context();
        ctx.credentials.insert_user("alice1", "alice@example.com", "hash", "api-tok");
        let bearer = ctx.state.gate.issue("alice@example.com", TokenKind::Bearer).unwrap();
        let server = test_server(ctx.state.clone());

        let response = server
            .get("/users/me")
            .add_header("cookie", format!("user_session={bearer}"))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }
}
