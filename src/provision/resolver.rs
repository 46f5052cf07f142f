//! Target resolution: scope and optional override to a canonical target
//! path plus the install modes legal there.
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{InstallMode, Scope};
use crate::config::Settings;
use crate::error::ProvisionError;
use crate::platform::Platform;

/// A target path that passed resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// Absolute target path.  Its parent is canonical when it exists; the
    /// final component is never resolved, so an existing symlink stays one.
    pub path: PathBuf,
    /// Scope the path was resolved for.
    pub scope: Scope,
    /// Modes that may be requested for this target.
    pub legal_modes: Vec<InstallMode>,
}

impl ResolvedTarget {
    /// Reject `mode` if it is not legal for this target's scope.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] for a mode outside
    /// [`legal_modes`](Self::legal_modes).
    pub fn check_mode(&self, mode: InstallMode) -> Result<(), ProvisionError> {
        if self.legal_modes.contains(&mode) {
            Ok(())
        } else {
            Err(ProvisionError::Configuration(format!(
                "{mode} mode is not allowed in {} scope",
                self.scope
            )))
        }
    }

    /// `preferred` when legal here, otherwise the first legal mode.
    #[must_use]
    pub fn default_mode(&self, preferred: InstallMode) -> InstallMode {
        if self.legal_modes.contains(&preferred) {
            preferred
        } else {
            self.legal_modes.first().copied().unwrap_or(preferred)
        }
    }

    /// Reject a source tree that contains the target or sits inside it.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] if the paths overlap.
    pub fn check_disjoint(&self, source: &Path) -> Result<(), ProvisionError> {
        if self.path.starts_with(source) || source.starts_with(&self.path) {
            return Err(ProvisionError::Configuration(format!(
                "target {} overlaps source tree {}",
                self.path.display(),
                source.display()
            )));
        }
        Ok(())
    }
}

/// Computes [`ResolvedTarget`]s from settings and the platform defaults.
#[derive(Debug)]
pub struct Resolver<'a> {
    settings: &'a Settings,
    platform: Platform,
    can_write: fn(&Path) -> bool,
}

impl<'a> Resolver<'a> {
    /// Resolver checking write access against the real filesystem.
    #[must_use]
    pub const fn new(settings: &'a Settings, platform: Platform) -> Self {
        Self {
            settings,
            platform,
            can_write,
        }
    }

    /// Replace the write-permission check.
    #[must_use]
    pub const fn with_write_check(mut self, check: fn(&Path) -> bool) -> Self {
        self.can_write = check;
        self
    }

    /// Resolve the target for `scope` before changing it.
    ///
    /// Same path as [`locate`](Self::locate).  System scope additionally
    /// requires write permission where the target entry would be created or
    /// removed: its parent, or the parent's nearest existing ancestor.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] when no path can be
    /// determined, the path has no final component, or system scope lacks
    /// write permission.
    pub fn resolve(
        &self,
        scope: Scope,
        override_path: Option<&Path>,
    ) -> Result<ResolvedTarget, ProvisionError> {
        let target = self.locate(scope, override_path)?;

        if scope == Scope::System {
            let parent = target.path.parent().unwrap_or(&target.path);
            let checked = nearest_existing_ancestor(parent);
            if !(self.can_write)(&checked) {
                return Err(ProvisionError::Configuration(format!(
                    "system scope needs write permission on {}",
                    checked.display()
                )));
            }
        }
        Ok(target)
    }

    /// Resolve the target for `scope` for reading only.
    ///
    /// The path is, in order: `override_path`, the configured target for the
    /// scope, the platform default.  No permission is required.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] when no path can be
    /// determined or the path has no final component.
    pub fn locate(
        &self,
        scope: Scope,
        override_path: Option<&Path>,
    ) -> Result<ResolvedTarget, ProvisionError> {
        let raw = match override_path.or_else(|| self.settings.configured_target(scope)) {
            Some(path) => path.to_path_buf(),
            None => self
                .platform
                .default_target(scope, &self.settings.name)
                .ok_or_else(|| {
                    ProvisionError::Configuration(format!(
                        "cannot determine the default {scope} target; pass --target"
                    ))
                })?,
        };
        let path = canonical_target(&raw)?;

        let legal_modes = match scope {
            Scope::User => vec![InstallMode::Symlink, InstallMode::Copy],
            Scope::System => vec![InstallMode::Copy],
        };
        Ok(ResolvedTarget {
            path,
            scope,
            legal_modes,
        })
    }
}

/// Absolute form of `raw` with a canonical parent and the final component
/// kept as written.
fn canonical_target(raw: &Path) -> Result<PathBuf, ProvisionError> {
    let absolute =
        std::path::absolute(raw).map_err(|e| ProvisionError::io("resolve", raw, e))?;
    let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
        return Err(ProvisionError::Configuration(format!(
            "target {} has no directory name",
            raw.display()
        )));
    };
    let parent = dunce::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    Ok(parent.join(name))
}

/// The path itself if it exists, else its closest existing ancestor.
fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.symlink_metadata().is_ok())
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
}

/// Whether the current process may create entries in `dir`.
#[cfg(unix)]
fn can_write(dir: &Path) -> bool {
    rustix::fs::access(dir, rustix::fs::Access::WRITE_OK).is_ok()
}

/// Whether the current process may create entries in `dir`.
#[cfg(not(unix))]
fn can_write(dir: &Path) -> bool {
    std::fs::metadata(dir).is_ok_and(|m| !m.permissions().readonly())
}
