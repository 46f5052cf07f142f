//! Content digests used to compare a copy target with its source tree.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use sha2::{Digest, Sha256};

use super::helpers::GIT_DIR;

/// Lowercase hex SHA-256 over the tree at `root`.
///
/// Entries are visited in sorted order of their `/`-joined relative paths;
/// each contributes its path, a type tag and then the file bytes or the link
/// destination.  Links are hashed as links and never followed, matching what
/// a copy install reproduces, and `.git` directories are skipped.
///
/// # Errors
///
/// Returns an error if any entry cannot be read.
pub fn tree_digest(root: &Path) -> Result<String> {
    let mut entries = Vec::new();
    collect(root, root, &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, path, kind) in &entries {
        hasher.update(relative.as_bytes());
        match kind {
            EntryKind::Dir => hasher.update(b"\0dir\0"),
            EntryKind::Link => {
                hasher.update(b"\0link\0");
                let destination = std::fs::read_link(path)
                    .with_context(|| format!("reading link {}", path.display()))?;
                hasher.update(destination.to_string_lossy().as_bytes());
            }
            EntryKind::File => {
                hasher.update(b"\0file\0");
                let bytes =
                    std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                hasher.update(&bytes);
            }
        }
    }
    Ok(to_hex(&hasher.finalize()))
}

/// Returns `true` if `target` holds the same content as `source`.
///
/// # Errors
///
/// Returns an error if either tree cannot be read.
pub fn in_sync(source: &Path, target: &Path) -> Result<bool> {
    Ok(tree_digest(source)? == tree_digest(target)?)
}

#[derive(Debug, Clone, Copy)]
enum EntryKind {
    Dir,
    Link,
    File,
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf, EntryKind)>) -> Result<()> {
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("reading entry type of {}", path.display()))?;
        let kind = if file_type.is_symlink() {
            EntryKind::Link
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        if matches!(kind, EntryKind::Dir) && entry.file_name() == GIT_DIR {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push((relative, path.clone(), kind));
        if matches!(kind, EntryKind::Dir) {
            collect(root, &path, out)?;
        }
    }
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}
