//! Update command implementation.
use anyhow::Result;

use super::{CommandSetup, TargetAccess};
use crate::cli::{GlobalOpts, InstallOpts};
use crate::exec::{CommandRunner, SystemRunner};
use crate::logging::{Log, Logger};
use crate::provision::{InstallMode, Operation, Outcome};

/// Run the update command.
///
/// # Errors
///
/// Returns an error if setup fails, the source cannot be refreshed, or the
/// plan fails part-way.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Logger) -> Result<()> {
    log.info(&format!("assetctl {}", super::version::version()));
    let setup = CommandSetup::init(global, opts.scope, TargetAccess::Modify, log)?;
    let result = execute(&setup, opts.mode, &SystemRunner, log);
    super::finish(result, log)
}

/// Refresh the source tree, then reinstall it at the resolved target.
///
/// The mode is checked first and the refresh runs before the target is
/// inspected, so a failed pull leaves the target untouched.
///
/// # Errors
///
/// Returns an error if `mode` is illegal, the source is not a git work tree,
/// `git` is unavailable or fails, or the plan fails part-way.
pub fn execute(
    setup: &CommandSetup,
    mode: Option<InstallMode>,
    runner: &dyn CommandRunner,
    log: &dyn Log,
) -> Result<Outcome> {
    let mode = setup.install_mode(mode)?;
    setup.source.refresh(setup.mode, runner, log)?;
    setup.provision(Operation::Update(mode), log)
}
