//! Artifact copying.
//!
//! Replicates a file or directory tree so the destination exactly mirrors
//! the source afterwards. Modification times are preserved so downstream
//! timestamp-based staleness checks stay meaningful.

use crate::error::{Error, Result};
use crate::fs_utils;
use filetime::FileTime;
use std::path::Path;
use walkdir::WalkDir;

/// Copy `src` to `dest`, replacing anything already there.
pub fn copy(src: &Path, dest: &Path) -> Result<()> {
    fs_utils::remove_any(dest)?;
    fs_utils::ensure_parent_dir(dest)?;

    if src.is_dir() {
        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|_| Error::OutsideRoot {
                    path: entry.path().to_path_buf(),
                    root: src.to_path_buf(),
                })?;
            let to = dest.join(rel);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&to)?;
            } else {
                copy_file_preserving(entry.path(), &to)?;
            }
        }
    } else {
        copy_file_preserving(src, dest)?;
    }

    Ok(())
}

/// Copy one file, keeping permissions and modification time.
fn copy_file_preserving(src: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(src, dest)?;
    let md = std::fs::metadata(src)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&md))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_file_preserves_mtime() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("a/b/dest.txt");
        std::fs::write(&src, "content").unwrap();
        filetime::set_file_mtime(&src, FileTime::from_unix_time(1_650_000_000, 0)).unwrap();

        copy(&src, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "content");
        let md = std::fs::metadata(&dest).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&md).unix_seconds(), 1_650_000_000);
    }

    #[test]
    fn test_copy_replaces_existing_destination() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");

        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("sub/new.txt"), "new").unwrap();

        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale.txt"), "stale").unwrap();

        copy(&src, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("sub/new.txt")).unwrap(), "new");
        assert!(!dest.join("stale.txt").exists());
    }

    #[test]
    fn test_copy_file_over_directory() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("dest");

        std::fs::write(&src, "file wins").unwrap();
        std::fs::create_dir_all(dest.join("nested")).unwrap();

        copy(&src, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "file wins");
    }
}
