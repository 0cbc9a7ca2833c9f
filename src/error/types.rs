//! Error types
//!
//! Defines domain-specific error types for each module of the share server.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    StoreUnreadable { path: PathBuf, source: io::Error },
    InvalidCredentials(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::StoreUnreadable { path, source } => {
                write!(f, "Failed to open users file {}: {}", path.display(), source)
            }
            AuthError::InvalidCredentials(u) => write!(f, "Invalid credentials for user: {}", u),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::StoreUnreadable { source, .. } => Some(source),
            AuthError::InvalidCredentials(_) => None,
        }
    }
}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    EmptyFilename,
    FileNotFound(String),
    PathTraversal(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::EmptyFilename => write!(f, "Empty filename"),
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::PathTraversal(p) => write!(f, "Path traversal attempt: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Transfer module errors
///
/// `SourceUnavailable` and `DestinationUnavailable` are reported to the client
/// and the session continues; the rest mean the control connection is gone.
#[derive(Debug)]
pub enum TransferError {
    SourceUnavailable(io::Error),
    DestinationUnavailable(io::Error),
    ConnectionClosed,
    Timeout(Duration),
    Io(io::Error),
}

impl TransferError {
    /// Whether the session can keep serving commands after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TransferError::SourceUnavailable(_) | TransferError::DestinationUnavailable(_)
        )
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::SourceUnavailable(e) => write!(f, "Cannot open source file: {}", e),
            TransferError::DestinationUnavailable(e) => {
                write!(f, "Cannot open destination file: {}", e)
            }
            TransferError::ConnectionClosed => write!(f, "Connection closed during transfer"),
            TransferError::Timeout(d) => write!(f, "Transfer stalled for {:?}", d),
            TransferError::Io(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

/// Control connection errors
#[derive(Debug)]
pub enum ProtocolError {
    CommandTooLong(usize),
    Timeout(Duration),
    Io(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::CommandTooLong(limit) => {
                write!(f, "Command exceeds {} bytes", limit)
            }
            ProtocolError::Timeout(d) => write!(f, "No activity for {:?}", d),
            ProtocolError::Io(e) => write!(f, "Connection error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        ProtocolError::Io(error)
    }
}

impl From<TransferError> for ProtocolError {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::Timeout(d) => ProtocolError::Timeout(d),
            TransferError::ConnectionClosed => ProtocolError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed during transfer",
            )),
            TransferError::SourceUnavailable(e)
            | TransferError::DestinationUnavailable(e)
            | TransferError::Io(e) => ProtocolError::Io(e),
        }
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Auth(AuthError),
    Config(config::ConfigError),
    Bind { addr: String, source: io::Error },
    IoError(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Auth(e) => write!(f, "Authentication error: {}", e),
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

// Implement conversions from specific errors to ServerError
impl From<AuthError> for ServerError {
    fn from(error: AuthError) -> Self {
        ServerError::Auth(error)
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}
