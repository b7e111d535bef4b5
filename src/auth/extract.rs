//! Request extractors for authenticated routes.
//!
//! Missing credentials are passed through the gate as an empty token so the
//! rejection is counted and reported identically to a forged one.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts};
use std::net::{IpAddr, SocketAddr};

use crate::auth::token::TokenKind;
use crate::errors::Error;
use crate::store::UserRecord;
use crate::{AppState, config::Config};

/// An account authenticated by an API bearer token.
pub struct BearerUser(pub UserRecord);

/// An account authenticated by a session cookie.
pub struct CookieUser(pub UserRecord);

impl FromRequestParts<AppState> for BearerUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).unwrap_or_default();
        let client = client_addr(parts);
        let route = parts.uri.path().to_string();

        let user = state.gate.authenticate(&token, TokenKind::Bearer, client, &route).await?;
        Ok(BearerUser(user))
    }
}

impl FromRequestParts<AppState> for CookieUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_cookie(parts, &state.config).unwrap_or_default();
        let client = client_addr(parts);
        let route = parts.uri.path().to_string();

        let user = state.gate.authenticate(&token, TokenKind::Cookie, client, &route).await?;
        Ok(CookieUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

fn session_cookie(parts: &Parts, config: &Config) -> Option<String> {
    let cookie_name = &config.auth.session.cookie_name;
    for header in parts.headers.get_all(header::COOKIE) {
        let Ok(value) = header.to_str() else { continue };
        for pair in value.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=')
                && name == cookie_name
            {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Resolved client address, when the listener provides one.
///
/// Infallible: handlers that only need the address for abuse accounting
/// must not fail when it is unknown.
pub struct ClientAddr(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientAddr(client_addr(parts)))
    }
}

fn client_addr(parts: &Parts) -> Option<IpAddr> {
    parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip())
}
