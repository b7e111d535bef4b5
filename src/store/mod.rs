//! Backing stores behind trait objects.
//!
//! Each external system the service talks to sits behind a small trait with
//! one production implementation and one in-memory mock for tests:
//!
//! - **credentials** - account records (PostgreSQL)
//! - **tasks** - task records (PostgreSQL)
//! - **penalties** - penalty records shared with the rate limiter (Redis)
//! - **files** - task attachments (S3-compatible object storage)
//!
//! ## Redis Key Patterns
//!
//! ```text
//! ratelimit:{addr}:{route}:12:0   → "10" (penalty, expires after 1 hour)
//! ```
//!
//! ## Usage in Handlers
//!
//! Stores are accessed via `state.stores`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
//!     let task = state.stores.tasks.create(new_task).await?;
//! }
//! ```

pub mod errors;

mod credentials;
mod files;
mod penalty;
mod tasks;

pub use credentials::{CredentialStore, NewCredential, PgCredentialStore, UserRecord};
pub use files::{FileStore, S3FileStore};
pub use penalty::{PenaltyStore, RedisPenaltyStore};
pub use tasks::{NewTask, PgTaskStore, TaskRecord, TaskStore};

#[cfg(test)]
pub use credentials::MockCredentialStore;
#[cfg(test)]
pub use files::MockFileStore;
#[cfg(test)]
pub use penalty::MockPenaltyStore;
#[cfg(test)]
pub use tasks::MockTaskStore;

use std::sync::Arc;

/// Collection of all backing stores.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub penalties: Arc<dyn PenaltyStore>,
    pub files: Arc<dyn FileStore>,
}
