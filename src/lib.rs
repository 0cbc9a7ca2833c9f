//! RAX share server
//!
//! Exposes one directory over TCP through a small line-based command
//! protocol (USER, LIST, GET, PUT, DEL, QUIT), gated by a flat
//! `username:password` file.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use config::{Cli, ServerConfig};
pub use server::{Server, ServerContext, ShutdownHandle};
