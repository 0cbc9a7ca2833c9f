//! Server core functionality
//!
//! The listener, the bounded session pool, shutdown signalling and the
//! shared context every session reads from.

pub mod context;
pub mod core;

pub use context::{ServerContext, SessionLimits};
pub use self::core::{Server, ShutdownHandle};
