//! Advisory lock serialising apply-mode runs against one target.
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::ProvisionError;

/// Exclusive lock on `<parent>/.<name>.assetctl.lock`, released on drop.
#[derive(Debug)]
pub struct TargetLock {
    file: File,
    path: PathBuf,
}

impl TargetLock {
    /// Take the lock for `target`, failing immediately if another process
    /// holds it.  Creates the target's parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] if the lock is held
    /// elsewhere, and [`ProvisionError::Io`] if the lock file cannot be
    /// created.
    pub fn acquire(target: &Path) -> Result<Self, ProvisionError> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProvisionError::io("create directory", parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| ProvisionError::io("open lock", &path, e))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file, path }),
            Err(_) => Err(ProvisionError::Configuration(format!(
                "target {} is locked by another invocation ({})",
                target.display(),
                path.display()
            ))),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        FileExt::unlock(&self.file).ok();
    }
}

/// Lock file path for `target`.
#[must_use]
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or(OsStr::new("target")));
    name.push(".assetctl.lock");
    target.with_file_name(name)
}
