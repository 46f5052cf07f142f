//! The provisioning state machine.
//!
//! Control flows leaf-first through the submodules:
//!
//! - **[`resolver`]**: scope + override → canonical target path and legal modes
//! - **[`inspect`]**: classify what currently sits at the target path
//! - **[`backup`]**: move an occupied target aside, find and restore backups
//! - **[`strategy`]**: produce a target from the source tree (symlink or copy)
//! - **[`plan`]**: pure mapping from observed state + operation to actions
//! - **[`confirm`]**: approval gate for destructive steps
//! - **[`executor`]**: apply a plan, or only describe it under dry-run
//! - **[`lock`]**: advisory lock held while a plan is applied
//! - **[`digest`]**: content digests used by `status`
//! - **[`helpers`]**: filesystem primitives shared by the above
//!
//! [`provision`] wires them together for one invocation.
pub mod backup;
pub mod confirm;
pub mod digest;
pub mod executor;
pub mod helpers;
pub mod inspect;
pub mod lock;
pub mod plan;
pub mod resolver;
pub mod strategy;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::ProvisionError;
use crate::logging::Log;

pub use backup::{Backup, BackupManager};
pub use confirm::{ConfirmPolicy, ConfirmationGate, Prompt, StdinPrompt};
pub use executor::{ExecMode, Executor, Outcome};
pub use inspect::{Origin, TargetKind, inspect};
pub use plan::{Action, Plan, Step};
pub use resolver::{ResolvedTarget, Resolver};

/// Whether provisioning targets a single account or a shared location.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per-account target path.
    #[default]
    User,
    /// Shared target path; requires write privilege and allows copy mode only.
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::System => write!(f, "system"),
        }
    }
}

/// How the target is produced from the source tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// A symbolic link pointing at the source tree.
    #[default]
    Symlink,
    /// An independent recursive copy of the source tree.
    Copy,
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => write!(f, "symlink"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Operation requested for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create or replace the target with `mode`.
    Install(InstallMode),
    /// Re-run install after the source tree has been refreshed.
    Update(InstallMode),
    /// Remove the target and restore the latest backup, if any.
    Uninstall,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install(mode) => write!(f, "install ({mode})"),
            Self::Update(mode) => write!(f, "update ({mode})"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Everything one invocation of the state machine needs.
#[derive(Debug)]
pub struct Request<'a> {
    /// Requested operation.
    pub operation: Operation,
    /// Absolute path of the source tree.
    pub source: &'a Path,
    /// Resolved target.
    pub target: &'a ResolvedTarget,
    /// Apply the plan, or only describe it.
    pub mode: ExecMode,
}

/// Inspect, plan, and execute one request against the filesystem.
///
/// A plan that will be applied is always computed while the target lock is
/// held: the target is inspected once, and if there is work to do, the lock
/// is taken and the target inspected again.  A no-op never takes the lock.
///
/// # Errors
///
/// Returns [`ProvisionError::Configuration`] when the target is locked by
/// another invocation, and [`ProvisionError::Execution`] when an action fails
/// part-way through the plan.
pub fn provision(
    request: &Request<'_>,
    settings: &Settings,
    gate: &ConfirmationGate,
    log: &dyn Log,
) -> Result<Outcome> {
    provision_with(request, settings, gate, log, || {
        survey(request, &BackupManager::new())
    })
}

/// What was found at the target and the plan built from it.
#[derive(Debug)]
struct Survey {
    kind: TargetKind,
    latest: Option<Backup>,
    plan: Plan,
}

fn survey(request: &Request<'_>, backups: &BackupManager) -> Result<Survey, ProvisionError> {
    let target = request.target.path.as_path();
    let kind = inspect(target);
    let latest = backups.latest_backup(target)?;
    let plan = plan::plan(&kind, request.operation, request.source, target, latest.as_ref());
    Ok(Survey { kind, latest, plan })
}

fn provision_with(
    request: &Request<'_>,
    settings: &Settings,
    gate: &ConfirmationGate,
    log: &dyn Log,
    mut observe: impl FnMut() -> Result<Survey, ProvisionError>,
) -> Result<Outcome> {
    let target = request.target.path.as_path();

    log.stage("Inspecting target");
    let mut seen = observe()?;
    let _lock = if request.mode == ExecMode::Apply && settings.lock && !seen.plan.is_noop() {
        let lock = lock::TargetLock::acquire(target)?;
        log.debug(&format!("locked {}, inspecting again", target.display()));
        seen = observe()?;
        Some(lock)
    } else {
        None
    };

    log.info(&format!("{}: {}", target.display(), seen.kind));
    if let Some(backup) = &seen.latest {
        log.debug(&format!("latest backup: {}", backup.path.display()));
    }

    log.stage("Plan");
    for step in seen.plan.steps() {
        log.info(&step.to_string());
    }

    log.stage(match request.mode {
        ExecMode::Apply => "Applying",
        ExecMode::Describe => "Dry run",
    });
    let executor = Executor::new(request.mode, gate, log)
        .with_backups(BackupManager::new())
        .with_owned_marker(settings.mark_owned);
    executor
        .run(&seen.plan)
        .map_err(|e| anyhow::Error::from(ProvisionError::from(Box::new(e))))
}

/// Path of the sibling marker that flags a copy target as created by us.
#[must_use]
pub fn owned_marker_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map_or_else(|| "target".into(), std::ffi::OsStr::to_os_string);
    name.push(".assetctl-owned");
    target.with_file_name(name)
}
