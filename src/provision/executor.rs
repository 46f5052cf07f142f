//! Plan execution.
//!
//! One executor with two modes: [`ExecMode::Apply`] performs each action in
//! order and halts at the first failure; [`ExecMode::Describe`] walks the same
//! plan and only reports what would happen, touching nothing on disk.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::backup::BackupManager;
use super::confirm::ConfirmationGate;
use super::helpers::{remove_entry, remove_symlink};
use super::plan::{Action, Plan, Step};
use super::strategy::{self, InstallStrategy};
use super::{InstallMode, owned_marker_path};
use crate::error::{AppliedAction, ExecutionError};
use crate::logging::{ActionStatus, Log};

/// Whether a plan is applied or only described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Perform every action.
    Apply,
    /// Report every action without performing it (dry-run).
    Describe,
}

/// How a plan ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step was applied.
    Applied(Vec<AppliedAction>),
    /// The user declined `step`; the steps before it were applied.
    Declined {
        /// Steps applied before the declined one.
        applied: Vec<AppliedAction>,
        /// The declined step.
        step: Step,
    },
    /// Dry-run: the actions that would have been applied.
    DryRun(Vec<Action>),
}

impl Outcome {
    /// Actions that changed the filesystem.
    #[must_use]
    pub fn applied(&self) -> &[AppliedAction] {
        match self {
            Self::Applied(applied) | Self::Declined { applied, .. } => applied,
            Self::DryRun(_) => &[],
        }
    }
}

/// Applies or describes a [`Plan`].
pub struct Executor<'a> {
    mode: ExecMode,
    gate: &'a ConfirmationGate,
    log: &'a dyn Log,
    backups: BackupManager,
    mark_owned: bool,
    strategy: Option<Box<dyn InstallStrategy>>,
}

impl fmt::Debug for Executor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("mode", &self.mode)
            .field("gate", &self.gate)
            .field("mark_owned", &self.mark_owned)
            .finish_non_exhaustive()
    }
}

impl<'a> Executor<'a> {
    /// Executor using the system clock for backups and the built-in
    /// strategy for each install mode.
    #[must_use]
    pub fn new(mode: ExecMode, gate: &'a ConfirmationGate, log: &'a dyn Log) -> Self {
        Self {
            mode,
            gate,
            log,
            backups: BackupManager::new(),
            mark_owned: false,
            strategy: None,
        }
    }

    /// Use `backups` for backup and restore actions.
    #[must_use]
    pub fn with_backups(mut self, backups: BackupManager) -> Self {
        self.backups = backups;
        self
    }

    /// Write the ownership marker after copy installs.
    #[must_use]
    pub const fn with_owned_marker(mut self, enabled: bool) -> Self {
        self.mark_owned = enabled;
        self
    }

    /// Use `strategy` for every install action regardless of its mode.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Box<dyn InstallStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Run `plan`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] for the first action that fails, carrying
    /// the actions applied before it.  Nothing after the failing action runs.
    pub fn run(&self, plan: &Plan) -> Result<Outcome, ExecutionError> {
        if self.mode == ExecMode::Describe {
            return Ok(self.describe(plan));
        }

        let mut applied = Vec::new();
        for (index, step) in plan.steps().iter().enumerate() {
            let rendered = step.action.to_string();
            match self.gate.approve(step) {
                Ok(true) => {}
                Ok(false) => {
                    self.log.warn(&format!("declined: {rendered}"));
                    self.log
                        .record_action(&rendered, ActionStatus::Declined, None);
                    self.skip_remaining(plan, index);
                    return Ok(Outcome::Declined {
                        applied,
                        step: step.clone(),
                    });
                }
                Err(source) => return Err(self.fail(plan, index, &step.action, applied, source)),
            }

            match self.apply(&step.action) {
                Ok(backup) => {
                    let detail = backup.as_ref().map(|p| format!("saved to {}", p.display()));
                    self.log.info(&rendered);
                    self.log
                        .record_action(&rendered, ActionStatus::Applied, detail.as_deref());
                    applied.push(AppliedAction {
                        action: step.action.clone(),
                        backup,
                    });
                }
                Err(source) => return Err(self.fail(plan, index, &step.action, applied, source)),
            }
        }
        Ok(Outcome::Applied(applied))
    }

    fn describe(&self, plan: &Plan) -> Outcome {
        for step in plan.steps() {
            let rendered = step.action.to_string();
            if step.confirm {
                self.log
                    .dry_run(&format!("would {rendered} (after confirmation)"));
            } else {
                self.log.dry_run(&format!("would {rendered}"));
            }
            self.log.record_action(&rendered, ActionStatus::DryRun, None);
        }
        Outcome::DryRun(plan.actions().cloned().collect())
    }

    fn fail(
        &self,
        plan: &Plan,
        index: usize,
        failed: &Action,
        applied: Vec<AppliedAction>,
        source: anyhow::Error,
    ) -> ExecutionError {
        let rendered = failed.to_string();
        self.log.error(&format!("{rendered}: {source:#}"));
        self.log.record_action(
            &rendered,
            ActionStatus::Failed,
            Some(&format!("{source:#}")),
        );
        self.skip_remaining(plan, index);
        ExecutionError {
            failed: failed.clone(),
            applied,
            source,
        }
    }

    fn skip_remaining(&self, plan: &Plan, index: usize) {
        for step in plan.steps().iter().skip(index + 1) {
            self.log
                .record_action(&step.action.to_string(), ActionStatus::Skipped, None);
        }
    }

    /// Perform one action; returns the backup path for [`Action::Backup`].
    fn apply(&self, action: &Action) -> Result<Option<PathBuf>> {
        match action {
            Action::Backup { target } => {
                // The rename must be the last fallible step so its path is
                // always reported.
                clear_owned_marker(target)?;
                let backup = self.backups.create_backup(target)?;
                Ok(Some(backup.path))
            }
            Action::RemoveSymlink { target } => {
                remove_symlink(target)?;
                Ok(None)
            }
            Action::CreateSymlink { source, target } => {
                self.install(InstallMode::Symlink, source, target)?;
                Ok(None)
            }
            Action::Copy { source, target } => {
                self.install(InstallMode::Copy, source, target)?;
                if self.mark_owned {
                    let marker = owned_marker_path(target);
                    std::fs::write(&marker, "")
                        .with_context(|| format!("writing marker {}", marker.display()))?;
                }
                Ok(None)
            }
            Action::RemoveDirectory { target } => {
                remove_entry(target)?;
                clear_owned_marker(target)?;
                Ok(None)
            }
            Action::Restore { backup, target } => {
                self.backups.restore(backup, target)?;
                Ok(None)
            }
            Action::Noop { reason } => {
                self.log.debug(reason);
                Ok(None)
            }
        }
    }

    fn install(&self, mode: InstallMode, source: &Path, target: &Path) -> Result<()> {
        match &self.strategy {
            Some(strategy) => strategy.install(source, target),
            None => strategy::for_mode(mode).install(source, target),
        }
    }
}

/// Remove the ownership marker beside `target`, if there is one.
fn clear_owned_marker(target: &Path) -> Result<()> {
    let marker = owned_marker_path(target);
    match std::fs::remove_file(&marker) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing marker {}", marker.display())),
    }
}
