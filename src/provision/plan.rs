//! Planner: a pure mapping from observed state and requested operation to an
//! ordered list of actions.
//!
//! | Current state              | Operation | Plan                                   |
//! |----------------------------|-----------|----------------------------------------|
//! | Absent                     | Install   | install                                |
//! | Symlink                    | Install   | remove symlink, install                |
//! | Occupied                   | Install   | back up (confirm), install             |
//! | Symlink                    | Uninstall | remove symlink                         |
//! | Occupied, no backups       | Uninstall | remove (confirm)                       |
//! | Occupied, backups exist    | Uninstall | remove (confirm), restore latest       |
//! | Absent, backups exist      | Uninstall | restore latest                         |
//! | Absent, no backups         | Uninstall | nothing to do                          |
//!
//! `Update` plans exactly like `Install`.
use std::fmt;
use std::path::{Path, PathBuf};

use super::backup::Backup;
use super::inspect::TargetKind;
use super::{InstallMode, Operation};

/// A single intended filesystem transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move the current target aside to a timestamped sibling.
    Backup {
        /// Target being displaced.
        target: PathBuf,
    },
    /// Remove a symlink at the target without following it.
    RemoveSymlink {
        /// Symlink path.
        target: PathBuf,
    },
    /// Create a symlink at `target` pointing at `source`.
    CreateSymlink {
        /// Source tree.
        source: PathBuf,
        /// Link path.
        target: PathBuf,
    },
    /// Copy `source` recursively into a fresh `target`.
    Copy {
        /// Source tree.
        source: PathBuf,
        /// Destination path.
        target: PathBuf,
    },
    /// Remove the real directory (or file) at the target.
    RemoveDirectory {
        /// Path removed.
        target: PathBuf,
    },
    /// Move a backup back into place.
    Restore {
        /// Backup restored.
        backup: Backup,
        /// Destination path; must be absent when the action runs.
        target: PathBuf,
    },
    /// Nothing to do.
    Noop {
        /// Why nothing is done.
        reason: String,
    },
}

impl Action {
    fn install(mode: InstallMode, source: &Path, target: &Path) -> Self {
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        match mode {
            InstallMode::Symlink => Self::CreateSymlink { source, target },
            InstallMode::Copy => Self::Copy { source, target },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup { target } => write!(f, "back up {}", target.display()),
            Self::RemoveSymlink { target } => write!(f, "remove symlink {}", target.display()),
            Self::CreateSymlink { source, target } => {
                write!(f, "link {} -> {}", target.display(), source.display())
            }
            Self::Copy { source, target } => {
                write!(f, "copy {} to {}", source.display(), target.display())
            }
            Self::RemoveDirectory { target } => write!(f, "remove {}", target.display()),
            Self::Restore { backup, target } => {
                write!(f, "restore {} to {}", backup.path.display(), target.display())
            }
            Self::Noop { reason } => write!(f, "nothing to do: {reason}"),
        }
    }
}

/// An action plus whether it needs approval before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The action.
    pub action: Action,
    /// `true` for destructive steps routed through the confirmation gate.
    pub confirm: bool,
}

impl Step {
    const fn plain(action: Action) -> Self {
        Self {
            action,
            confirm: false,
        }
    }

    const fn destructive(action: Action) -> Self {
        Self {
            action,
            confirm: true,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.confirm {
            write!(f, "{} [confirm]", self.action)
        } else {
            write!(f, "{}", self.action)
        }
    }
}

/// Ordered steps for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Actions in execution order, without confirmation flags.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().map(|s| &s.action)
    }

    /// Returns `true` when every step is a [`Action::Noop`].
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.action, Action::Noop { .. }))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Compute the plan for `operation` against a target in state `kind`.
///
/// `latest` is the newest backup of `target`, consulted by uninstall only.
/// The function reads nothing from disk.
#[must_use]
pub fn plan(
    kind: &TargetKind,
    operation: Operation,
    source: &Path,
    target: &Path,
    latest: Option<&Backup>,
) -> Plan {
    let owned = target.to_path_buf();
    let steps = match operation {
        Operation::Install(mode) | Operation::Update(mode) => {
            let install = Step::plain(Action::install(mode, source, target));
            match kind {
                TargetKind::Absent => vec![install],
                TargetKind::Symlink { .. } => {
                    vec![Step::plain(Action::RemoveSymlink { target: owned }), install]
                }
                TargetKind::Occupied { .. } => {
                    vec![Step::destructive(Action::Backup { target: owned }), install]
                }
            }
        }
        Operation::Uninstall => {
            let restore = latest.map(|backup| {
                Step::plain(Action::Restore {
                    backup: backup.clone(),
                    target: target.to_path_buf(),
                })
            });
            match kind {
                TargetKind::Symlink { .. } => {
                    vec![Step::plain(Action::RemoveSymlink { target: owned })]
                }
                TargetKind::Occupied { .. } => {
                    let mut steps = vec![Step::destructive(Action::RemoveDirectory {
                        target: owned,
                    })];
                    steps.extend(restore);
                    steps
                }
                TargetKind::Absent => restore.map_or_else(
                    || {
                        vec![Step::plain(Action::Noop {
                            reason: format!("{} is absent and has no backups", target.display()),
                        })]
                    },
                    |step| vec![step],
                ),
            }
        }
    };
    Plan { steps }
}
