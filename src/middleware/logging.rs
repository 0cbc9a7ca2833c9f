//! Logging middleware
//!
//! Provides request logging functionality.

use log::info;
use std::net::SocketAddr;

use crate::protocol::Command;

/// Log a client connection
pub fn log_connection(client_addr: &SocketAddr) {
    info!("Client connected: {}", client_addr);
}

/// Log a client command. `Command`'s `Display` masks the USER password.
pub fn log_command(client_addr: &SocketAddr, command: &Command) {
    info!("Client {} executed: {}", client_addr, command);
}
