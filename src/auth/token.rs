//! Signed token creation and verification.
//!
//! Tokens are HMAC-signed and carry the account email, the token kind, and an
//! expiry timestamp. A token is only meaningful for the kind it was minted
//! with: an API bearer token presented as a session cookie is rejected even
//! though the signature is valid.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::errors::Error;

/// The three token kinds the service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Long-lived API token sent in the Authorization header
    Bearer,
    /// Browser session token carried in a cookie
    Cookie,
    /// One-time email confirmation token
    Confirm,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Bearer => write!(f, "bearer"),
            TokenKind::Cookie => write!(f, "cookie"),
            TokenKind::Confirm => write!(f, "confirm"),
        }
    }
}

/// Signed token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,     // Subject (account email)
    pub kind: TokenKind, // What the token may be used for
    pub exp: i64,        // Expiration time
    pub iat: i64,        // Issued at
}

/// Token verification failure taxonomy.
///
/// `Invalid` and `Expired` are client failures; `Internal` covers key and
/// crypto faults that must surface as server errors rather than rejections.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("token verification: {0}")]
    Internal(String),
}

/// Mint a signed token of the given kind for an account.
pub fn issue_token(email: &str, kind: TokenKind, tokens: &TokenConfig, secret_key: &str) -> Result<String, Error> {
    let now = Utc::now();
    let exp = now + tokens.validity_for(kind);

    let claims = TokenClaims {
        sub: email.to_string(),
        kind,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create token: {e}"),
    })
}

/// Verify and decode a signed token.
///
/// Signature and expiry are both checked here; a well-signed but expired
/// token is reported as [`TokenError::Expired`].
pub fn decode_token(token: &str, secret_key: &str) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Well-signed but past its expiry
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,

        // Client errors - malformed tokens, invalid claims
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::Invalid,

        // Server errors - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => TokenError::Internal(e.to_string()),

        // Catch-all for any future error variants (default to server error for safety)
        _ => TokenError::Internal(format!("unknown error: {e}")),
    })?;

    Ok(token_data.claims)
}
