//! Low-level filesystem moves used by the install strategies and the executor.
//!
//! Every function here acts on exactly one path and never inspects what a
//! target "means"; classification lives in [`super::inspect`].
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

/// Name of the version-control metadata directory skipped by copies.
pub const GIT_DIR: &str = ".git";

/// Create every missing ancestor of `path`.
///
/// # Errors
///
/// Returns an error if an ancestor cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("cannot create parent directory {}", parent.display()))
}

/// Duplicate the tree at `src` into `dst`.
///
/// Links inside `src` are re-created as links with the same destination and
/// never followed, so a dangling link or one that points back up the tree is
/// copied as it stands.  With `skip_git`, any directory named [`GIT_DIR`] is
/// left out at every depth.
///
/// # Errors
///
/// Returns an error naming the first entry that could not be read, created or
/// copied.  Whatever was written before the failure is left for the caller to
/// discard.
pub fn copy_dir_recursive(src: &Path, dst: &Path, skip_git: bool) -> Result<()> {
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from_dir, into_dir)) = pending.pop() {
        fs::create_dir_all(&into_dir)
            .with_context(|| format!("cannot create {}", into_dir.display()))?;
        let listing = fs::read_dir(&from_dir)
            .with_context(|| format!("cannot list {}", from_dir.display()))?;

        for entry in listing {
            let entry = entry.with_context(|| format!("cannot list {}", from_dir.display()))?;
            let name = entry.file_name();
            let from = entry.path();
            let into = into_dir.join(&name);
            let file_type = entry
                .file_type()
                .with_context(|| format!("cannot inspect {}", from.display()))?;

            if file_type.is_symlink() {
                copy_link(&from, &into)?;
            } else if file_type.is_dir() {
                if !(skip_git && name == GIT_DIR) {
                    pending.push((from, into));
                }
            } else {
                fs::copy(&from, &into).with_context(|| {
                    format!("cannot copy {} to {}", from.display(), into.display())
                })?;
            }
        }
    }
    Ok(())
}

/// Re-create the link at `from` as `into`, keeping its destination verbatim.
fn copy_link(from: &Path, into: &Path) -> Result<()> {
    let destination =
        fs::read_link(from).with_context(|| format!("cannot read link {}", from.display()))?;

    #[cfg(windows)]
    if !from.is_dir() {
        return std::os::windows::fs::symlink_file(&destination, into).with_context(|| {
            format!("cannot link {} to {}", into.display(), destination.display())
        });
    }

    create_symlink(&destination, into)
}

/// Point a new link at `link` to the directory `target`.
///
/// On Windows a directory symlink is tried first; without the privilege for
/// it, a junction is made through `mklink /J`.
///
/// # Errors
///
/// Returns an error if no kind of link could be created.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    let describe = || format!("cannot link {} to {}", link.display(), target.display());

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link).with_context(describe)?;

    #[cfg(windows)]
    if std::os::windows::fs::symlink_dir(target, link).is_err() {
        let link_arg = link.to_string_lossy();
        let target_arg = target.to_string_lossy();
        crate::exec::run("cmd", &["/c", "mklink", "/J", &link_arg, &target_arg])
            .with_context(describe)?;
    }

    Ok(())
}

/// Delete the link at `path`, leaving whatever it resolves to alone.
///
/// # Errors
///
/// Returns an error if `path` cannot be read or unlinked.
pub fn remove_symlink(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("cannot inspect {}", path.display()))?;
    let removed = if link_needs_rmdir(&meta) {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("cannot remove link {}", path.display()))
}

/// Delete a real directory tree or file at `path`.
///
/// # Errors
///
/// Returns an error if `path` cannot be read or deleted.
pub fn remove_entry(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("cannot inspect {}", path.display()))?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("cannot remove {}", path.display()))
}

/// Windows reports directory links and junctions as non-directories through
/// `is_dir()`, yet they can only be deleted with `remove_dir`.
#[cfg(windows)]
fn link_needs_rmdir(meta: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
    meta.file_attributes() & FILE_ATTRIBUTE_DIRECTORY != 0
}

#[cfg(not(windows))]
const fn link_needs_rmdir(_meta: &fs::Metadata) -> bool {
    false
}
