//! Install command implementation.
use anyhow::Result;

use super::{CommandSetup, TargetAccess};
use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::{Log, Logger};
use crate::provision::{InstallMode, Operation, Outcome};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails, the mode is illegal for the scope, or the
/// plan fails part-way.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Logger) -> Result<()> {
    log.info(&format!("assetctl {}", super::version::version()));
    let setup = CommandSetup::init(global, opts.scope, TargetAccess::Modify, log)?;
    let result = execute(&setup, opts.mode, log);
    super::finish(result, log)
}

/// Install the source at the resolved target.
///
/// # Errors
///
/// Returns an error if `mode` is illegal for the target's scope or the plan
/// fails part-way.
pub fn execute(setup: &CommandSetup, mode: Option<InstallMode>, log: &dyn Log) -> Result<Outcome> {
    let mode = setup.install_mode(mode)?;
    log.debug(&format!("install mode: {mode}"));
    setup.provision(Operation::Install(mode), log)
}
