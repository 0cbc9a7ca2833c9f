//! Credential storage
//!
//! Loads the `username:password` table once at startup. The table is never
//! mutated afterwards; sessions share it read-only through the server context.

use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::error::AuthError;

/// A single `username:password` entry from the users file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Limits applied while loading the users file
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub capacity: usize,
    pub max_field_length: usize,
}

/// Ordered, capacity-bounded credential table. Insertion order is file order.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    entries: Vec<Credential>,
}

impl UserStore {
    /// Reads the users file. Failing to open it is fatal for the caller.
    pub fn load(path: &Path, limits: StoreLimits) -> Result<Self, AuthError> {
        let bytes = fs::read(path).map_err(|source| AuthError::StoreUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse(&String::from_utf8_lossy(&bytes), limits);

        info!(
            "Loaded {} user(s) from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Builds the table from file contents.
    ///
    /// Lines without a `:` or with an empty or over-long field are skipped.
    /// Entries past `capacity` are dropped.
    pub fn parse(contents: &str, limits: StoreLimits) -> Self {
        let mut entries = Vec::new();
        let mut dropped = 0usize;

        for (index, raw) in contents.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            let Some((username, password)) = line.split_once(':') else {
                if !line.trim().is_empty() {
                    warn!("Skipping users file line {}: missing ':' delimiter", line_no);
                }
                continue;
            };

            if username.is_empty() || password.is_empty() {
                warn!("Skipping users file line {}: empty username or password", line_no);
                continue;
            }

            if username.len() > limits.max_field_length || password.len() > limits.max_field_length
            {
                warn!(
                    "Skipping users file line {}: field longer than {} bytes",
                    line_no, limits.max_field_length
                );
                continue;
            }

            if entries.len() >= limits.capacity {
                dropped += 1;
                continue;
            }

            entries.push(Credential {
                username: username.to_string(),
                password: password.to_string(),
            });
        }

        if dropped > 0 {
            warn!(
                "User table is full ({} entries); dropped {} additional entr{}",
                limits.capacity,
                dropped,
                if dropped == 1 { "y" } else { "ies" }
            );
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter()
    }
}
