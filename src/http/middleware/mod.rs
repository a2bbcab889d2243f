//! Request pipeline middleware.
//!
//! # Order (outermost first)
//! ```text
//! recover.rs       per-request panic boundary
//!     → security::rate_limit (when enabled)
//!     → authenticate.rs (Principal into extensions, Vary: Authorization)
//!     → per-route permission gates
//!     → handler
//! ```

pub mod authenticate;
pub mod metrics;
pub mod recover;

pub use authenticate::{authenticate, require_permission};
pub use metrics::track_metrics;
pub use recover::recover_panic;
