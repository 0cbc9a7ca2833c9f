//! Storage operations
//!
//! Directory listing and file deletion under the server root.

use log::{error, info, warn};
use std::io;
use std::path::Path;
use tokio::fs;

use crate::error::StorageError;

/// A directory entry as reported by LIST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    /// Size in bytes, or `-1` if the entry could not be opened
    pub size: i64,
}

/// Lists the root directory (non-recursive, unsorted, without `.` and `..`).
///
/// Fails only if the directory cannot be opened; an error part-way through
/// ends the listing with the entries read so far.
pub async fn list_directory(root: &Path) -> Result<Vec<DirectoryEntry>, StorageError> {
    let mut dir = fs::read_dir(root).await.map_err(|e| {
        error!("Failed to list directory {}: {}", root.display(), e);
        StorageError::from(e)
    })?;

    let mut entries = Vec::new();
    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Directory listing of {} interrupted: {}", root.display(), e);
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if name == "." || name == ".." {
            continue;
        }

        let size = measure(&entry.path()).await;
        entries.push(DirectoryEntry { name, size });
    }

    info!("Listed directory {} - {} entries", root.display(), entries.len());
    Ok(entries)
}

/// Size of the file at `path`, measured through an open handle.
async fn measure(path: &Path) -> i64 {
    let file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Error opening file {}: {}", path.display(), e);
            return -1;
        }
    };

    match file.metadata().await {
        Ok(metadata) => i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        Err(e) => {
            warn!("Error measuring file {}: {}", path.display(), e);
            -1
        }
    }
}

/// Deletes the entry at an already-resolved `path`.
///
/// Files and symlinks are unlinked; a directory is removed only when empty.
/// `filename` is the client's name for it, used in errors and logs.
pub async fn delete_file(path: &Path, filename: &str) -> Result<(), StorageError> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::FileNotFound(filename.to_string()));
        }
        Err(e) => return Err(StorageError::from(e)),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir(path).await
    } else {
        fs::remove_file(path).await
    };

    match removed {
        Ok(()) => {
            info!("Deleted {} (real: {})", filename, path.display());
            Ok(())
        }
        Err(e) => {
            error!("Failed to delete {} (real: {}): {}", filename, path.display(), e);
            Err(StorageError::from(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_reports_names_and_sizes() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("empty.txt"), b"").unwrap();

        let mut entries = list_directory(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirectoryEntry {
                    name: "a.txt".into(),
                    size: 5
                },
                DirectoryEntry {
                    name: "empty.txt".into(),
                    size: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_missing_root_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(list_directory(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        delete_file(&path, "a.txt").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let result = delete_file(&dir.path().join("nope.txt"), "nope.txt").await;
        assert!(matches!(result, Err(StorageError::FileNotFound(name)) if name == "nope.txt"));
    }

    #[tokio::test]
    async fn test_delete_empty_directory() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        delete_file(&sub, "sub").await.unwrap();
        assert!(!sub.exists());
    }

    #[tokio::test]
    async fn test_delete_non_empty_directory_fails_without_removing_it() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner.txt"), b"x").unwrap();

        let result = delete_file(&sub, "sub").await;
        assert!(matches!(result, Err(StorageError::IoError(_))));
        assert!(sub.join("inner.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_reports_unmeasurable_entry_as_minus_one() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();

        let entries = list_directory(dir.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![DirectoryEntry {
                name: "dangling".into(),
                size: -1
            }]
        );
    }
}
