//! Authentication request and response payloads.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PasswordConfig;
use crate::errors::Error;
use crate::types::UserId;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterRequest {
    pub fn validate(&self, password_config: &PasswordConfig) -> Result<(), Error> {
        let username_len = self.username.chars().count();
        if !(4..=20).contains(&username_len) {
            return Err(Error::BadRequest {
                message: "Username must be between 4 and 20 characters".to_string(),
            });
        }
        if !self.username.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::BadRequest {
                message: "Username may only contain letters and digits".to_string(),
            });
        }

        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(Error::BadRequest {
                    message: "Invalid email address".to_string(),
                });
            }
        }

        if self.password != self.password_confirm {
            return Err(Error::BadRequest {
                message: "Passwords do not match".to_string(),
            });
        }

        let password_len = self.password.chars().count();
        if password_len < password_config.min_length {
            return Err(Error::BadRequest {
                message: format!("Password must be at least {} characters", password_config.min_length),
            });
        }
        if password_len > password_config.max_length {
            return Err(Error::BadRequest {
                message: format!("Password must be no more than {} characters", password_config.max_length),
            });
        }
        if !self.password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(Error::BadRequest {
                message: "Password must contain an uppercase letter".to_string(),
            });
        }
        if !self.password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(Error::BadRequest {
                message: "Password must contain a lowercase letter".to_string(),
            });
        }
        if self.password.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::BadRequest {
                message: "Password must contain a special character".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: UserId,
    /// Long-lived API token for the new account
    pub api_token: String,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Login response body plus the session cookie to set.
#[derive(Debug)]
pub struct LoginResponse {
    pub body: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, Json(self.body), &self.cookie)
    }
}

/// Logout response body plus the expired cookie that clears the session.
#[derive(Debug)]
pub struct LogoutResponse {
    pub body: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, Json(self.body), &self.cookie)
    }
}

fn with_cookie(status: StatusCode, body: Json<AuthSuccessResponse>, cookie: &str) -> Response {
    let mut response = (status, body).into_response();
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => {
            tracing::error!("Invalid session cookie value: {e}");
            Error::Internal {
                operation: "build session cookie".to_string(),
            }
            .into_response()
        }
    }
}

/// Current session info returned by the account endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub username: String,
    /// The account's long-lived API token
    pub api_token: String,
    pub verified: bool,
}

/// Confirmation outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: UserId,
    pub message: String,
}
