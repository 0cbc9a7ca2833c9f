//! Transfer module for the share server
//!
//! Streams GET and PUT payloads over the control connection.

pub mod file_ops;

pub use file_ops::{flush_within, receive_file, send_file, write_all_within};
