//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → overrides.rs (command-line flags)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use overrides::Overrides;
pub use schema::AppConfig;
pub use schema::{
    ListenerConfig, LogFormat, MailerConfig, ObservabilityConfig, RateLimitConfig,
    SecurityConfig, ShutdownConfig, StorageConfig, TimeoutConfig, TokenConfig,
};
