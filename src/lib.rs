//! Greenlight: a JSON API for a movie catalog.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server (router, middleware pipeline)
//!                  │  recover panic → rate limit → authenticate → gate
//!                  ▼
//!                http::handlers ──▶ data (models, optimistic store)
//!                  │                    │
//!                  │                    ▼
//!                  │                 storage (in-memory engine)
//!                  ▼
//!                lifecycle::BackgroundJobs ──▶ mailer
//!
//!     Cross-cutting: config, observability, resilience, security, validation
//! ```

// Core subsystems
pub mod config;
pub mod data;
pub mod http;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod mailer;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod validation;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::ShutdownCoordinator;
