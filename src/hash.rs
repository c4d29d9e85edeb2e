//! Content hashing and manifest generation.
//!
//! The manifest is the release integrity artifact: one line per file,
//! `<64-hex-sha256>  <path-relative-to-root>`, sorted by path, with
//! forward-slash separators regardless of platform. It is regenerated in
//! full on every run so a stale or partial manifest can never survive.

use crate::error::{Error, Result};
use crate::{fs_utils, output};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the SHA-256 hex digest of one file with chunked reads.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Write a hash manifest for `files` to `manifest`, relative to `root`.
///
/// Any pre-existing manifest is deleted first. Input order does not matter;
/// lines are sorted by relative path so the output is byte-identical across
/// platforms and traversal orders. Lines are echoed to the terminal unless
/// `quiet` is set.
pub fn hash_manifest(manifest: &Path, root: &Path, files: &[PathBuf], quiet: bool) -> Result<()> {
    if manifest.exists() {
        std::fs::remove_file(manifest)?;
    }

    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    sorted.dedup();

    // Sort by relative path, not by line text, so the hash column cannot
    // influence the order.
    let mut entries = Vec::with_capacity(sorted.len());
    for path in sorted {
        let rel = path.strip_prefix(root).map_err(|_| Error::OutsideRoot {
            path: path.clone(),
            root: root.to_path_buf(),
        })?;
        entries.push((posix_str(rel), hash_file(path)?));
    }
    entries.sort();

    let lines: Vec<String> = entries
        .into_iter()
        .map(|(rel, digest)| format!("{}  {}", digest, rel))
        .collect();

    if !quiet {
        for line in &lines {
            output::detail(line);
        }
    }

    fs_utils::ensure_parent_dir(manifest)?;
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(manifest, content)?;

    Ok(())
}

/// Render a relative path with forward slashes on every platform.
fn posix_str(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
