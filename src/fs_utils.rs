//! Common filesystem utilities shared across components.

use crate::error::Result;
use std::path::Path;

/// Ensure a file's parent directory exists.
///
/// Creates the parent directory (and all ancestors) if it doesn't exist.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Create a directory and all ancestors. Existing directories are fine.
pub fn create_folder(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Remove a path whether it is a file, symlink, or directory tree.
///
/// Missing paths are not an error.
pub fn remove_any(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(md) if md.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_parent_dir() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a/b/c/file.txt");

        ensure_parent_dir(&nested).unwrap();
        assert!(temp.path().join("a/b/c").exists());
    }

    #[test]
    fn test_ensure_parent_dir_already_exists() {
        let temp = tempdir().unwrap();
        ensure_parent_dir(&temp.path().join("file.txt")).unwrap();
    }

    #[test]
    fn test_remove_any_handles_all_shapes() {
        let temp = tempdir().unwrap();

        let file = temp.path().join("f");
        std::fs::write(&file, "x").unwrap();
        remove_any(&file).unwrap();
        assert!(!file.exists());

        let dir = temp.path().join("d/e");
        std::fs::create_dir_all(&dir).unwrap();
        remove_any(&temp.path().join("d")).unwrap();
        assert!(!dir.exists());

        // missing is fine
        remove_any(&temp.path().join("missing")).unwrap();
    }
}
