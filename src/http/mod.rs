//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/ (panic recovery, admission, authentication, gates)
//!     → request.rs (strict JSON bodies, path and query parameters)
//!     → handlers/ (movies, users, tokens, healthcheck)
//!     → response.rs (JSON envelopes, error → status mapping)
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
