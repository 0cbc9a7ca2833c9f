//! Path validation
//!
//! Resolves client-supplied filenames against the server root.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Resolve `filename` under `root`.
///
/// With `confine` set, `root` must be canonical. Filenames with `..`, root or
/// prefix components are rejected, as are names that resolve outside
/// `root` through a symlink, either in a parent directory or as the final
/// entry itself.
///
/// Without `confine` the name is appended to `root` verbatim, exactly like
/// the legacy server. That mode performs no traversal protection.
pub fn resolve_file_path(root: &Path, filename: &str, confine: bool) -> Result<PathBuf, StorageError> {
    if filename.is_empty() {
        return Err(StorageError::EmptyFilename);
    }

    if !confine {
        let mut joined = OsString::from(root.as_os_str());
        joined.push("/");
        joined.push(filename);
        return Ok(PathBuf::from(joined));
    }

    let relative = Path::new(filename);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(StorageError::PathTraversal(filename.to_string()));
    }

    let path = root.join(relative);

    // A missing parent is fine here; the operation itself reports it.
    if let Some(parent) = path.parent() {
        if let Ok(real_parent) = parent.canonicalize() {
            if !real_parent.starts_with(root) {
                return Err(StorageError::PathTraversal(filename.to_string()));
            }
        }
    }

    // An existing entry may itself be a symlink. A link whose target
    // cannot be resolved is refused, since PUT would follow it.
    if let Ok(metadata) = path.symlink_metadata() {
        let inside = match path.canonicalize() {
            Ok(real) => real.starts_with(root),
            Err(_) => !metadata.file_type().is_symlink(),
        };
        if !inside {
            return Err(StorageError::PathTraversal(filename.to_string()));
        }
    }

    Ok(path)
}
