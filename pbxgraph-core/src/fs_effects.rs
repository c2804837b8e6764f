//! Optional on-disk side effects
//!
//! Callers run these only after the matching graph mutation was persisted.

use std::fs;
use std::path::Path;

use crate::error::{GraphError, Result};

/// Delete a file or a whole directory
pub fn delete_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    tracing::info!("Deleted {}", path.display());
    Ok(())
}

/// Move a file or directory, creating the destination's parent directories.
/// An existing destination is never overwritten.
pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(GraphError::InvalidArgument(format!(
            "Cannot move {}: {} already exists",
            from.display(),
            to.display()
        )));
    }
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)?;
    tracing::info!("Moved {} -> {}", from.display(), to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_and_delete() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("User.swift");
        fs::write(&from, "struct User {}").unwrap();

        let to = dir.path().join("Models/User.swift");
        move_path(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "struct User {}");

        delete_path(&dir.path().join("Models")).unwrap();
        assert!(!to.exists());
    }

    #[test]
    fn test_move_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        assert!(matches!(move_path(&a, &b), Err(GraphError::InvalidArgument(_))));
        assert_eq!(fs::read_to_string(&b).unwrap(), "b");
    }

    #[test]
    fn test_delete_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            delete_path(&dir.path().join("nope")),
            Err(GraphError::Io(_))
        ));
    }
}
