//! Safe archive extraction.
//!
//! Unpacks `.zip`, `.tar.gz`, and `.tar.bz2` archives into a destination
//! directory that is wholly owned by the extraction: the destination is
//! deleted and recreated every time, so stale or partial prior contents
//! never linger. Any entry that would resolve outside the destination
//! (absolute paths, `..` components, or link targets escaping it) aborts
//! the extraction with [`Error::PathTraversal`].

use crate::error::{Error, Result};
use crate::fs_utils;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Extract `archive` into `dest`, dispatching on the archive suffix.
///
/// `dest` is removed (if present) and recreated, making extraction
/// idempotent. Unrecognized suffixes are a hard configuration error.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    fs_utils::remove_any(dest)?;
    std::fs::create_dir_all(dest)?;

    if name.ends_with(".zip") {
        extract_zip(archive, dest)
    } else if name.ends_with(".tar.gz") {
        let file = File::open(archive)?;
        let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
        extract_tar(decoder, dest)
    } else if name.ends_with(".tar.bz2") {
        let file = File::open(archive)?;
        let decoder = bzip2::read::BzDecoder::new(BufReader::new(file));
        extract_tar(decoder, dest)
    } else {
        Err(Error::UnsupportedFormat(name))
    }
}

/// Lexically normalize a path (no filesystem access). Used to validate
/// entry and link targets without following symlinks.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

/// Reject entry paths that could land outside `dest`.
fn checked_entry_path(dest: &Path, entry: &Path) -> Result<PathBuf> {
    if entry.is_absolute()
        || entry
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(Error::PathTraversal {
            entry: entry.display().to_string(),
        });
    }

    let full = normalize_lexical(&dest.join(entry));
    if full.strip_prefix(normalize_lexical(dest)).is_err() {
        return Err(Error::PathTraversal {
            entry: entry.display().to_string(),
        });
    }

    Ok(dest.join(entry))
}

/// Reject if any existing component of `full_path` under `dest` is a
/// symlink; writing through one could escape `dest` even when the entry
/// path itself is syntactically safe.
fn ensure_no_symlink_components(dest: &Path, full_path: &Path) -> Result<()> {
    let rel = full_path
        .strip_prefix(dest)
        .map_err(|_| Error::PathTraversal {
            entry: full_path.display().to_string(),
        })?;

    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(Error::PathTraversal {
                entry: cur.display().to_string(),
            });
        }
    }

    Ok(())
}

/// Validate a symlink/hardlink target stays within `dest`.
fn ensure_link_target_within_dest(dest: &Path, link_parent: &Path, link_name: &Path) -> Result<()> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(Error::PathTraversal {
            entry: link_name.display().to_string(),
        });
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    if candidate.strip_prefix(normalize_lexical(dest)).is_err() {
        return Err(Error::PathTraversal {
            entry: link_name.display().to_string(),
        });
    }

    Ok(())
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive
        .entries()
        .map_err(|e| Error::Archive(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| Error::Archive(e.to_string()))?;

        let path = entry
            .path()
            .map_err(|e| Error::Archive(e.to_string()))?
            .into_owned();

        // Some archives contain a "." entry; treat it as a no-op.
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = checked_entry_path(dest, &path)?;
        ensure_no_symlink_components(dest, &full_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            let link_name = entry
                .link_name()
                .map_err(|e| Error::Archive(e.to_string()))?
                .ok_or_else(|| Error::Archive(format!("link without target: {}", path.display())))?;
            let link_parent = full_path.parent().unwrap_or(dest);
            ensure_link_target_within_dest(dest, link_parent, &link_name)?;
        }

        if let Some(parent) = full_path.parent() {
            if parent.starts_with(dest) {
                ensure_no_symlink_components(dest, parent)?;
            }
            std::fs::create_dir_all(parent)?;
        }

        entry
            .unpack(&full_path)
            .map_err(|e| Error::Archive(format!("unpack {}: {}", path.display(), e)))?;
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::Archive(e.to_string()))?;

        // An unsafe stored name is a hard error, never a silent skip.
        let Some(name) = file.enclosed_name() else {
            return Err(Error::PathTraversal {
                entry: file.name().to_string(),
            });
        };
        let outpath = checked_entry_path(dest, &name)?;

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut outfile = std::fs::File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)
                .map_err(|e| Error::Archive(format!("write {}: {}", outpath.display(), e)))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
                }
            }
        }
    }

    Ok(())
}
