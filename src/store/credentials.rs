//! Account credential records (PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::errors::StoreError;
use crate::types::UserId;

/// A stored account as the authentication layer sees it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub api_token: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub api_token: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by email.
    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create a new account. Fails with a unique violation for duplicate emails.
    async fn create(&self, new: NewCredential) -> Result<UserRecord, StoreError>;

    /// Mark an account's email as confirmed. One-way; idempotent.
    async fn set_verified(&self, email: &str) -> Result<(), StoreError>;
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, password_hash, api_token, verified, created_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, new), fields(email = %new.email))]
    async fn create(&self, new: NewCredential) -> Result<UserRecord, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (username, email, password_hash, api_token)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, email, password_hash, api_token, verified, created_at",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.api_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn set_verified(&self, email: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
pub use mock::MockCredentialStore;

#[cfg(test)]
mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    /// In-memory credential store for tests.
    #[derive(Default)]
    pub struct MockCredentialStore {
        users: Mutex<HashMap<String, UserRecord>>,
        fail: AtomicBool,
    }

    impl MockCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an account, returning its record.
        pub fn insert_user(&self, username: &str, email: &str, password_hash: &str, api_token: &str) -> UserRecord {
            let user = UserRecord {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                api_token: api_token.to_string(),
                verified: false,
                created_at: Utc::now(),
            };
            self.users.lock().unwrap().insert(email.to_string(), user.clone());
            user
        }

        /// Make every subsequent call fail as a transport error.
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn is_verified(&self, email: &str) -> bool {
            self.users.lock().unwrap().get(email).map(|u| u.verified).unwrap_or(false)
        }

        fn check_transport(&self) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Other(anyhow::anyhow!("connection refused")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialStore for MockCredentialStore {
        async fn get(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
            self.check_transport()?;
            Ok(self.users.lock().unwrap().get(email).cloned())
        }

        async fn create(&self, new: NewCredential) -> Result<UserRecord, StoreError> {
            self.check_transport()?;
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&new.email) {
                return Err(StoreError::UniqueViolation {
                    constraint: Some("users_email_key".to_string()),
                    table: Some("users".to_string()),
                    message: "duplicate key value violates unique constraint".to_string(),
                });
            }
            let user = UserRecord {
                id: Uuid::new_v4(),
                username: new.username,
                email: new.email.clone(),
                password_hash: new.password_hash,
                api_token: new.api_token,
                verified: false,
                created_at: Utc::now(),
            };
            users.insert(new.email, user.clone());
            Ok(user)
        }

        async fn set_verified(&self, email: &str) -> Result<(), StoreError> {
            self.check_transport()?;
            let mut users = self.users.lock().unwrap();
            match users.get_mut(email) {
                Some(user) => {
                    user.verified = true;
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            }
        }
    }
}
