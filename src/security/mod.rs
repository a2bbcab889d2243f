//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 on denial)
//!     → auth.rs (bearer token → Principal)
//!     → per-route gates (authenticated / activated / permission)
//! ```
//!
//! Passwords are only ever stored as argon2 hashes (password.rs).

pub mod auth;
pub mod password;
pub mod rate_limit;

pub use auth::{AccessError, AuthError, Authenticator, Principal};
pub use rate_limit::TokenBucketRegistry;
