//! Domain-specific error types for the provisioning engine.
//!
//! Core components return [`ProvisionError`] (or [`ExecutionError`] from the
//! executor) while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.  `main` downcasts the
//! final error back to choose a process exit code.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── Configuration   illegal scope/mode, missing privilege, locked target
//! ├── Precondition    source tree missing, restore onto occupied target
//! ├── Io              a single filesystem operation failed
//! └── Execution       a plan halted part-way (wraps ExecutionError)
//! ```
//!
//! A declined confirmation is not an error; see
//! [`Outcome::Declined`](crate::provision::Outcome::Declined).

use std::path::PathBuf;

use thiserror::Error;

use crate::provision::plan::Action;

/// Exit code for a successful run or a user-declined abort.
pub const EXIT_OK: u8 = 0;

/// Exit code for configuration errors and filesystem failures.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for a missing prerequisite (source tree, repository, git).
pub const EXIT_PRECONDITION: u8 = 2;

/// Top-level error type for the provisioning core.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Illegal scope/mode combination, missing privilege, or a locked target.
    /// Always reported before any mutation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A prerequisite of the requested operation does not hold.  No mutation
    /// has been attempted.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An individual filesystem operation failed.
    #[error("{operation} {path}: {source}")]
    Io {
        /// Short verb describing the failed operation (e.g. `"rename"`).
        operation: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A plan stopped at a failing action after applying a prefix of it.
    #[error(transparent)]
    Execution(#[from] Box<ExecutionError>),
}

impl ProvisionError {
    /// Build an [`ProvisionError::Io`] from an operation verb, a path, and the
    /// underlying error.
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Process exit code that reports this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Precondition(_) => EXIT_PRECONDITION,
            Self::Configuration(_) | Self::Io { .. } | Self::Execution(_) => EXIT_FAILURE,
        }
    }
}

/// An action that the executor completed before a later action failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    /// The action as planned.
    pub action: Action,
    /// Path of the backup the action produced, for [`Action::Backup`].
    pub backup: Option<PathBuf>,
}

impl std::fmt::Display for AppliedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backup {
            Some(path) => write!(f, "{} (saved to {})", self.action, path.display()),
            None => write!(f, "{}", self.action),
        }
    }
}

/// Failure of a plan part-way through execution.
///
/// Carries the list of actions that were applied before the failure so the
/// caller can explain the intermediate state, e.g. "backup succeeded, copy
/// failed: previous content is in `<backup path>`".
#[derive(Error, Debug)]
#[error("{failed} failed after {} applied action(s)", .applied.len())]
pub struct ExecutionError {
    /// The action that failed.
    pub failed: Action,
    /// Actions that completed before `failed`, in order.
    pub applied: Vec<AppliedAction>,
    /// The underlying failure.
    pub source: anyhow::Error,
}

impl ExecutionError {
    /// Human-readable description of the state the target was left in.
    #[must_use]
    pub fn partial_state(&self) -> String {
        if self.applied.is_empty() {
            return "no changes were applied".to_string();
        }
        let steps: Vec<String> = self.applied.iter().map(ToString::to_string).collect();
        format!("applied before failure: {}", steps.join(", "))
    }
}

/// Choose the exit code for an error that reached the CLI boundary.
///
/// Errors that do not originate from the provisioning core map to
/// [`EXIT_FAILURE`].
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ProvisionError>())
        .map_or(EXIT_FAILURE, ProvisionError::exit_code)
}
