//! HTTP request handlers.

pub mod attachments;
pub mod auth;
pub mod tasks;
pub mod users;
