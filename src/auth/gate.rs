//! The authentication gate.
//!
//! Single entry point for token-based request authentication. A token passes
//! the gate only if it decodes under the shared secret, was minted for the
//! expected kind, is not expired, and names an account that still exists.
//! Every rejection for a request with a known client address feeds the abuse
//! counter exactly once; the caller only ever sees a generic rejection, so
//! forged, expired, mismatched, and unknown-subject tokens are
//! indistinguishable from the outside.

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;

use crate::auth::abuse::AbuseCounter;
use crate::auth::token::{self, TokenError, TokenKind};
use crate::config::{Config, TokenConfig};
use crate::errors::Error;
use crate::store::{CredentialStore, PenaltyStore, UserRecord};

/// Why a token was rejected. Used for tracing only; never shown to clients.
#[derive(Debug, Clone, Copy)]
enum RejectReason {
    InvalidToken,
    Expired,
    KindMismatch,
    UnknownSubject,
}

pub struct AuthGate {
    secret_key: String,
    tokens: TokenConfig,
    credentials: Arc<dyn CredentialStore>,
    abuse: AbuseCounter,
}

impl AuthGate {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialStore>, penalties: Arc<dyn PenaltyStore>) -> Result<Self, Error> {
        let secret_key = config.secret_key.clone().ok_or_else(|| Error::Internal {
            operation: "auth gate: secret_key is required".to_string(),
        })?;

        Ok(Self {
            secret_key,
            tokens: config.auth.tokens.clone(),
            credentials,
            abuse: AbuseCounter::new(&config.auth.abuse, penalties),
        })
    }

    /// Mint a token of the given kind for an account.
    pub fn issue(&self, email: &str, kind: TokenKind) -> Result<String, Error> {
        token::issue_token(email, kind, &self.tokens, &self.secret_key)
    }

    /// Authenticate a presented token.
    ///
    /// `client` is the resolved address of the caller, if known; `route` is
    /// the route the token was presented on, used to scope penalty records.
    /// Credential store transport failures propagate as server errors and do
    /// not count as authentication failures.
    #[tracing::instrument(skip(self, presented_token))]
    pub async fn authenticate(
        &self,
        presented_token: &str,
        expected: TokenKind,
        client: Option<IpAddr>,
        route: &str,
    ) -> Result<UserRecord, Error> {
        let claims = match token::decode_token(presented_token, &self.secret_key) {
            Ok(claims) => claims,
            Err(TokenError::Invalid) => return self.reject(RejectReason::InvalidToken, client, route).await,
            Err(TokenError::Expired) => return self.reject(RejectReason::Expired, client, route).await,
            Err(TokenError::Internal(operation)) => return Err(Error::Internal { operation }),
        };

        if claims.kind != expected {
            return self.reject(RejectReason::KindMismatch, client, route).await;
        }

        // Decoding already validates expiry; this guard stays so a token can
        // never pass the gate past its expiry regardless of codec settings.
        if claims.exp <= Utc::now().timestamp() {
            return self.reject(RejectReason::Expired, client, route).await;
        }

        match self.credentials.get(&claims.sub).await? {
            Some(user) => Ok(user),
            None => self.reject(RejectReason::UnknownSubject, client, route).await,
        }
    }

    async fn reject<T>(&self, reason: RejectReason, client: Option<IpAddr>, route: &str) -> Result<T, Error> {
        tracing::info!(?reason, route, "authentication rejected");
        if let Some(addr) = client {
            self.abuse.record_failure(addr, route).await;
        }
        Err(Error::Unauthenticated { message: None })
    }
}
