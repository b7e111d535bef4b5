//! Shared identifier types.

use uuid::Uuid;

pub type UserId = Uuid;
pub type TaskId = i64;
