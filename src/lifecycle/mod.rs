//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the shutdown token
//!
//! Shutdown (shutdown.rs):
//!     Running → SignalReceived → Draining (stop accepting, drain
//!     connections, wait for background jobs) → Stopped
//!
//! Background jobs (background.rs):
//!     Tracked fire-and-forget work that shutdown waits for
//! ```
//!
//! Every wait is bounded by the grace period; running out of it is a
//! terminal error, not a silent exit.

pub mod background;
pub mod shutdown;
pub mod signals;

pub use background::BackgroundJobs;
pub use shutdown::{Phase, ShutdownCoordinator, ShutdownError};
pub use signals::spawn_signal_listener;
