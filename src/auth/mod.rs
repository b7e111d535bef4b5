//! Authentication and abuse accounting.
//!
//! - [`password`]: Argon2 password hashing and verification
//! - [`token`]: signed token codec with per-kind validity windows
//! - [`abuse`]: per-address failure counting with shared penalty records
//! - [`gate`]: the gate every authenticated request passes through
//! - [`extract`]: axum extractors wrapping the gate

pub mod abuse;
pub mod extract;
pub mod gate;
pub mod password;
pub mod token;

pub use extract::{BearerUser, ClientAddr, CookieUser};
pub use gate::AuthGate;
