//! Install strategies: how a target is produced from the source tree.
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::InstallMode;
use super::helpers::{copy_dir_recursive, create_symlink, ensure_parent_dir, remove_entry};

/// Produces a target from the source tree.
///
/// Called only when the target is absent; neither implementation checks for
/// or replaces an existing entry.
#[cfg_attr(test, mockall::automock)]
pub trait InstallStrategy: Send + Sync {
    /// The mode this strategy implements.
    fn mode(&self) -> InstallMode;

    /// Create `target` from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if any filesystem operation fails.  On error the
    /// target is left absent.
    fn install(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Symbolic link from the target to the source tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkStrategy;

impl InstallStrategy for SymlinkStrategy {
    fn mode(&self) -> InstallMode {
        InstallMode::Symlink
    }

    fn install(&self, source: &Path, target: &Path) -> Result<()> {
        ensure_parent_dir(target)?;
        create_symlink(source, target)
    }
}

/// Independent recursive copy, staged beside the target and renamed into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyStrategy;

impl InstallStrategy for CopyStrategy {
    fn mode(&self) -> InstallMode {
        InstallMode::Copy
    }

    fn install(&self, source: &Path, target: &Path) -> Result<()> {
        ensure_parent_dir(target)?;
        let staging = staging_path(target);
        if staging.symlink_metadata().is_ok() {
            remove_entry(&staging).context("removing stale staging directory")?;
        }

        let staged = copy_dir_recursive(source, &staging, true).and_then(|()| {
            std::fs::rename(&staging, target).with_context(|| {
                format!("renaming {} to {}", staging.display(), target.display())
            })
        });
        if staged.is_err() && staging.symlink_metadata().is_ok() {
            // Best effort; the original error is the one worth reporting.
            remove_entry(&staging).ok();
        }
        staged
    }
}

/// Strategy implementing `mode`.
#[must_use]
pub fn for_mode(mode: InstallMode) -> Box<dyn InstallStrategy> {
    match mode {
        InstallMode::Symlink => Box::new(SymlinkStrategy),
        InstallMode::Copy => Box::new(CopyStrategy),
    }
}

/// Sibling directory a copy is assembled in: `.<name>.assetctl-staging`.
#[must_use]
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or(OsStr::new("target")));
    name.push(".assetctl-staging");
    target.with_file_name(name)
}
