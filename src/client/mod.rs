//! Client session management
//!
//! Handles client connections, session state and the per-connection loop.

pub mod handler;
pub mod state;

pub use handler::{handle_client, run_session};
pub use state::{Client, SessionState};
