//! Error handlers
//!
//! Logs errors at a level matching their severity.

use crate::error::types::{ProtocolError, ServerError, StorageError};
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;

/// Log a fatal server error
pub fn handle_error(err: &ServerError) {
    error!("Share Server Error: {}", err);
}

/// Log the error that ended a client session.
///
/// A peer hanging up is routine; anything else is worth a warning.
pub fn log_session_end(client_addr: &SocketAddr, err: &ProtocolError) {
    match err {
        ProtocolError::Io(e)
            if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            ) =>
        {
            info!("Client {} went away: {}", client_addr, e)
        }
        ProtocolError::Timeout(_) => warn!("Closing idle client {}: {}", client_addr, err),
        _ => warn!("Session with {} failed: {}", client_addr, err),
    }
}

/// Log a storage failure that was reported inline to the client
pub fn log_storage_failure(client_addr: &SocketAddr, operation: &str, err: &StorageError) {
    match err {
        StorageError::PathTraversal(_) => {
            warn!("{} from {} rejected: {}", operation, client_addr, err)
        }
        StorageError::IoError(_) => error!("{} for {} failed: {}", operation, client_addr, err),
        _ => info!("{} for {}: {}", operation, client_addr, err),
    }
}
