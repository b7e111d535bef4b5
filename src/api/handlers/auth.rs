use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::auth::{
        AuthSuccessResponse, ConfirmResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
    },
    auth::{ClientAddr, password, token::TokenKind},
    errors::Error,
    store::NewCredential,
};

/// Register a new user account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "User already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), Error> {
    // Check if registration is allowed
    if !state.config.auth.registration.enabled {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    request.validate(&state.config.auth.password)?;

    // Check if user with this email already exists
    if state.stores.credentials.get(&request.email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let params = password::Argon2Params::from(&state.config.auth.password);
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    // The stored API token and the one-time confirmation token
    let api_token = state.gate.issue(&request.email, TokenKind::Bearer)?;
    let confirm_token = state.gate.issue(&request.email, TokenKind::Confirm)?;

    let created_user = state
        .stores
        .credentials
        .create(NewCredential {
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash,
            api_token: api_token.clone(),
        })
        .await?;

    // Send the confirmation email without holding up the response
    let email_service = state.email.clone();
    let to_email = created_user.email.clone();
    let to_name = created_user.username.clone();
    tokio::spawn(async move {
        if let Err(e) = email_service.send_confirmation_email(&to_email, &to_name, &confirm_token).await {
            tracing::warn!(email = %to_email, error = %e, "failed to send confirmation email");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: created_user.id,
            api_token,
            message: "Registration successful, please confirm your email address".to_string(),
        }),
    ))
}

/// Confirm an account's email address via the emailed one-time link
#[utoipa::path(
    get,
    path = "/authentication/confirm/{token}",
    tag = "authentication",
    responses(
        (status = 200, description = "Email confirmed", body = ConfirmResponse),
        (status = 403, description = "Invalid or expired confirmation token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    Path(token): Path<String>,
) -> Result<Json<ConfirmResponse>, Error> {
    let user = state
        .gate
        .authenticate(&token, TokenKind::Confirm, client, "/authentication/confirm")
        .await?;

    state.stores.credentials.set_verified(&user.email).await?;

    Ok(Json(ConfirmResponse {
        id: user.id,
        message: "Email address confirmed".to_string(),
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthSuccessResponse),
        (status = 403, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    // Find user by email
    let user = state
        .stores
        .credentials
        .get(&request.email)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?;

    // A malformed stored hash can only ever read as "no match"
    let is_valid = match verified {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(email = %request.email, error = %e, "password verification failed");
            false
        }
    };

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    // Mint a session token and set the cookie
    let token = state.gate.issue(&user.email, TokenKind::Cookie)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        body: AuthSuccessResponse {
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Create expired cookie to clear session
    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        state.config.auth.session.cookie_name
    );

    Ok(LogoutResponse {
        body: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie,
    })
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.session;
    let max_age = config.auth.tokens.cookie_validity.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}
