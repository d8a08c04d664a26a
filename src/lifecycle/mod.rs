//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accepting → drain in-flight requests → stop sweeper → exit
//! ```
//!
//! # Design Decisions
//! - Startup is fail-fast: config, signatures and header policy are built
//!   before the listener is bound
//! - One shutdown coordinator fans out to every long-running task

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_termination;
