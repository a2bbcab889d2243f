//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Storage call:
//!     → timeouts.rs (every operation has a deadline)
//! Mail delivery:
//!     → backoff.rs (jittered delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Storage writes are never retried automatically

pub mod backoff;
pub mod timeouts;
