//! Request and response payloads for the HTTP API.
//!
//! These types define the wire format; validation of incoming payloads lives
//! on the request types themselves so handlers stay thin.

pub mod auth;
pub mod tasks;
