//! Configuration management for the RAX share server
//!
//! Settings are layered: built-in defaults, an optional TOML file,
//! `RAX_SHARE_*` environment variables and finally command-line flags.
//! Everything is loaded once at startup; nothing is updatable at runtime.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 6467;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_MAX_USERS: usize = 100;
pub const DEFAULT_MAX_CREDENTIAL_LENGTH: usize = 49;
pub const DEFAULT_MAX_CLIENTS: usize = 64;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

const DEFAULT_CONFIG_FILE: &str = "config";
const ENV_PREFIX: &str = "RAX_SHARE";

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(
    name = "rax-share-server",
    about = "Shares a directory over TCP with a small authenticated command protocol."
)]
pub struct Cli {
    /// Port to listen on
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Directory exposed to clients
    #[arg(short = 'd', long = "directory")]
    pub directory: Option<String>,

    /// Credentials file, one `username:password` per line
    #[arg(short = 'u', long = "users")]
    pub users_file: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<String>,
}

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the listener
    pub bind_address: String,

    /// TCP port; 0 picks an ephemeral port
    pub port: u16,

    // ═══ SHARED DATA ═══
    /// Directory all filenames are resolved against
    pub server_root: String,

    /// Credentials file loaded into the user store
    pub users_file: String,

    /// Reject filenames that would resolve outside `server_root`
    pub confine_paths: bool,

    // ═══ LIMITS ═══
    /// Max command line length, PUT chunk size and GET line width
    pub buffer_size: usize,

    /// Capacity of the credential table
    pub max_users: usize,

    /// Max bytes for a username or a password
    pub max_credential_length: usize,

    /// Maximum concurrent sessions
    pub max_clients: usize,

    /// Seconds a session may wait for its next command
    pub idle_timeout_secs: u64,

    /// Seconds a single read or write may take inside a command
    pub io_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            server_root: String::new(),
            users_file: String::new(),
            confine_paths: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_users: DEFAULT_MAX_USERS,
            max_credential_length: DEFAULT_MAX_CREDENTIAL_LENGTH,
            max_clients: DEFAULT_MAX_CLIENTS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            io_timeout_secs: DEFAULT_IO_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment, with CLI flags on top
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        let file = match &cli.config {
            Some(path) => File::with_name(path.as_str()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("server_root", "")?
            .set_default("users_file", "")?
            .set_default("confine_paths", true)?
            .set_default("buffer_size", DEFAULT_BUFFER_SIZE as i64)?
            .set_default("max_users", DEFAULT_MAX_USERS as i64)?
            .set_default("max_credential_length", DEFAULT_MAX_CREDENTIAL_LENGTH as i64)?
            .set_default("max_clients", DEFAULT_MAX_CLIENTS as i64)?
            .set_default("idle_timeout_secs", DEFAULT_IDLE_TIMEOUT_SECS as i64)?
            .set_default("io_timeout_secs", DEFAULT_IO_TIMEOUT_SECS as i64)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("server_root", cli.directory.clone())?
            .set_override_option("users_file", cli.users_file.clone())?
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults for everything except the two required paths
    pub fn with_paths(server_root: impl Into<String>, users_file: impl Into<String>) -> Self {
        Self {
            server_root: server_root.into(),
            users_file: users_file.into(),
            ..Self::default()
        }
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server_root.is_empty() || self.users_file.is_empty() {
            return Err(config::ConfigError::Message(
                "Missing required arguments: -d <directory> and -u <users_file>".into(),
            ));
        }

        if !self.server_root_path().is_dir() {
            return Err(config::ConfigError::Message(format!(
                "server_root {} is not a directory",
                self.server_root
            )));
        }

        if self.buffer_size < 2 {
            return Err(config::ConfigError::Message(
                "buffer_size must be at least 2".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_users == 0 {
            return Err(config::ConfigError::Message(
                "max_users must be greater than 0".into(),
            ));
        }

        if self.idle_timeout_secs == 0 || self.io_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "timeouts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    /// Get users file as PathBuf
    pub fn users_file_path(&self) -> PathBuf {
        PathBuf::from(&self.users_file)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}
