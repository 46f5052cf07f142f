//! Uninstall command implementation.
use anyhow::Result;

use super::{CommandSetup, TargetAccess};
use crate::cli::{GlobalOpts, ScopeOpts};
use crate::logging::{Log, Logger};
use crate::provision::{BackupManager, Operation, Outcome, TargetKind, inspect};

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if setup fails or the plan fails part-way.
pub fn run(global: &GlobalOpts, opts: &ScopeOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, opts.scope, TargetAccess::Modify, log)?;
    let result = execute(&setup, log);
    super::finish(result, log)
}

/// Remove the target, restoring the latest backup where the plan calls for it.
///
/// # Errors
///
/// Returns an error if backups cannot be listed or the plan fails part-way.
pub fn execute(setup: &CommandSetup, log: &dyn Log) -> Result<Outcome> {
    let target = setup.target.path.as_path();
    let was_symlink = matches!(inspect(target), TargetKind::Symlink { .. });

    let outcome = setup.provision(Operation::Uninstall, log)?;

    if was_symlink {
        let remaining = BackupManager::new().list_backups(target)?.len();
        if remaining > 0 {
            log.info(&format!(
                "{remaining} backup(s) remain beside {}; run uninstall again to restore the latest",
                target.display()
            ));
        }
    }
    Ok(outcome)
}
