//! File system storage management
//!
//! Handles path resolution, directory listing, deletion and per-path locking.

pub mod locks;
pub mod operations;
pub mod validation;

pub use locks::PathLocks;
pub use operations::{DirectoryEntry, delete_file, list_directory};
pub use validation::resolve_file_path;
