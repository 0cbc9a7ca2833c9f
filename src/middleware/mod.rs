//! Middleware components
//!
//! Cross-cutting concerns applied around command handling.

pub mod logging;
