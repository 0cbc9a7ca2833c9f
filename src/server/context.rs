//! Shared, read-only state handed to every session.

use log::warn;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{StoreLimits, UserStore};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::storage::PathLocks;

/// Per-session limits taken from the configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Max command line length, PUT chunk size and GET line width
    pub buffer_size: usize,
    pub idle_timeout: Duration,
    pub io_timeout: Duration,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            idle_timeout: config.idle_timeout(),
            io_timeout: config.io_timeout(),
        }
    }
}

/// Everything a session needs besides its own connection.
///
/// Built once before the listener accepts anything; only `locks` has
/// interior mutability.
#[derive(Debug)]
pub struct ServerContext {
    pub users: UserStore,
    /// Canonical root when `confine_paths` is set, the configured one otherwise
    pub root: PathBuf,
    pub confine_paths: bool,
    pub locks: PathLocks,
    pub limits: SessionLimits,
}

impl ServerContext {
    pub fn new(config: &ServerConfig, users: UserStore) -> Result<Self, ServerError> {
        let root = if config.confine_paths {
            config.server_root_path().canonicalize()?
        } else {
            warn!("Path confinement disabled: filenames are joined to the root without checks");
            config.server_root_path()
        };

        Ok(Self {
            users,
            root,
            confine_paths: config.confine_paths,
            locks: PathLocks::new(),
            limits: SessionLimits::from(config),
        })
    }

    /// Loads the user store named in `config` and builds the context.
    pub fn load(config: &ServerConfig) -> Result<Self, ServerError> {
        let users = UserStore::load(
            &config.users_file_path(),
            StoreLimits {
                capacity: config.max_users,
                max_field_length: config.max_credential_length,
            },
        )?;
        if users.is_empty() {
            warn!(
                "No usable credentials in {}; every USER attempt will fail",
                config.users_file
            );
        }
        Self::new(config, users)
    }
}
