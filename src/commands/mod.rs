//! Top-level subcommand orchestration.

pub mod completions;
pub mod install;
pub mod status;
pub mod uninstall;
pub mod update;
pub mod version;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{Overrides, Settings, validation};
use crate::error::ProvisionError;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::provision::{
    self, ConfirmationGate, ExecMode, InstallMode, Operation, Outcome, Request, ResolvedTarget,
    Resolver, Scope,
};
use crate::source::SourceTree;

/// What a command does with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAccess {
    /// The target may be changed; system scope must be writable.
    Modify,
    /// The target is only inspected; no permission is required.
    Read,
}

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates settings loading, source discovery and target resolution so
/// that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Effective settings.
    pub settings: Settings,
    /// Located source tree.
    pub source: SourceTree,
    /// Resolved target for the requested scope.
    pub target: ResolvedTarget,
    /// Apply, or describe under `--dry-run`.
    pub mode: ExecMode,
    /// Confirmation gate built from `--yes`.
    pub gate: ConfirmationGate,
}

impl CommandSetup {
    /// Load settings, then locate the source and resolve the target for
    /// `access`.
    ///
    /// # Errors
    ///
    /// Returns an error if settings fail to load or
    /// [`with_access`](Self::with_access) fails.
    pub fn init(
        global: &GlobalOpts,
        scope: Scope,
        access: TargetAccess,
        log: &dyn Log,
    ) -> Result<Self> {
        log.stage("Loading configuration");
        let settings = Settings::load(&Overrides {
            config: global.config.clone(),
            source: global.source.clone(),
        })?;

        let warnings = validation::validate(&settings);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  [{}]: {}", warning.item, warning.message));
            }
        }

        Self::with_access(global, scope, settings, Platform::detect(), access, log)
    }

    /// Locate the source and resolve the target for modification from
    /// already-loaded settings.
    ///
    /// # Errors
    ///
    /// See [`with_access`](Self::with_access).
    pub fn with_settings(
        global: &GlobalOpts,
        scope: Scope,
        settings: Settings,
        platform: Platform,
        log: &dyn Log,
    ) -> Result<Self> {
        Self::with_access(global, scope, settings, platform, TargetAccess::Modify, log)
    }

    /// Locate the source and resolve the target from already-loaded settings.
    ///
    /// Only [`TargetAccess::Modify`] checks that a system target is writable.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if the source tree cannot be
    /// found, and [`ProvisionError::Configuration`] if the target cannot be
    /// resolved or overlaps the source.
    pub fn with_access(
        global: &GlobalOpts,
        scope: Scope,
        settings: Settings,
        platform: Platform,
        access: TargetAccess,
        log: &dyn Log,
    ) -> Result<Self> {
        log.stage("Resolving paths");
        let source = SourceTree::locate(&settings)?;
        log.info(&format!("source: {}", source.path().display()));

        let resolver = Resolver::new(&settings, platform);
        let target = match access {
            TargetAccess::Modify => resolver.resolve(scope, global.target.as_deref())?,
            TargetAccess::Read => resolver.locate(scope, global.target.as_deref())?,
        };
        target.check_disjoint(source.path())?;
        log.info(&format!("target: {} ({scope})", target.path.display()));

        let gate = if global.yes {
            ConfirmationGate::assume_yes()
        } else {
            ConfirmationGate::interactive()
        };
        let mode = if global.dry_run {
            ExecMode::Describe
        } else {
            ExecMode::Apply
        };

        Ok(Self {
            settings,
            source,
            target,
            mode,
            gate,
        })
    }

    /// Replace the confirmation gate.
    #[must_use]
    pub fn with_gate(mut self, gate: ConfirmationGate) -> Self {
        self.gate = gate;
        self
    }

    /// The install mode to use: `requested` if legal for the target, else
    /// the configured default, falling back to the first legal mode.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] if `requested` is not legal
    /// in the target's scope.
    pub fn install_mode(
        &self,
        requested: Option<InstallMode>,
    ) -> Result<InstallMode, ProvisionError> {
        match requested {
            Some(mode) => {
                self.target.check_mode(mode)?;
                Ok(mode)
            }
            None => Ok(self.target.default_mode(self.settings.default_mode)),
        }
    }

    /// Run `operation` through the provisioning core.
    ///
    /// # Errors
    ///
    /// See [`provision::provision`].
    pub fn provision(&self, operation: Operation, log: &dyn Log) -> Result<Outcome> {
        let request = Request {
            operation,
            source: self.source.path(),
            target: &self.target,
            mode: self.mode,
        };
        provision::provision(&request, &self.settings, &self.gate, log)
    }
}

/// Log how a provisioning run ended.
pub fn report_outcome(result: &Result<Outcome>, log: &dyn Log) {
    match result {
        Ok(Outcome::Applied(applied)) if applied.is_empty() => log.info("nothing to change"),
        Ok(Outcome::Applied(applied)) => {
            for action in applied {
                if let Some(backup) = &action.backup {
                    log.info(&format!("previous content saved to {}", backup.display()));
                }
            }
        }
        Ok(Outcome::Declined { applied, step }) => {
            log.warn(&format!(
                "stopped at \"{}\" after {} applied action(s)",
                step.action,
                applied.len()
            ));
        }
        Ok(Outcome::DryRun(actions)) => {
            log.info(&format!("{} action(s) would be applied", actions.len()));
        }
        Err(err) => {
            if let Some(ProvisionError::Execution(failure)) = err.downcast_ref::<ProvisionError>() {
                log.error(&failure.partial_state());
            }
        }
    }
}

/// Report the outcome, print the run summary and discard the outcome.
///
/// # Errors
///
/// Returns the error in `result`, if any.
pub fn finish(result: Result<Outcome>, log: &Logger) -> Result<()> {
    report_outcome(&result, log);
    log.print_summary();
    result.map(drop)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::RecordingLog;
    use std::path::Path;

    fn settings(source: &Path) -> Settings {
        Settings {
            source: Some(source.to_path_buf()),
            ..Settings::default()
        }
    }

    fn setup(dir: &Path, global: &GlobalOpts, scope: Scope) -> Result<CommandSetup> {
        let source = dir.join("source");
        std::fs::create_dir_all(&source).unwrap();
        let log = RecordingLog::default();
        CommandSetup::with_settings(global, scope, settings(&source), Platform::detect(), &log)
    }

    #[test]
    fn flags_select_gate_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            dry_run: true,
            yes: true,
            target: Some(dir.path().join("assets")),
            ..GlobalOpts::default()
        };
        let setup = setup(dir.path(), &global, Scope::User).unwrap();
        assert_eq!(setup.mode, ExecMode::Describe);
        assert_eq!(setup.gate.policy(), provision::ConfirmPolicy::AssumeYes);
    }

    #[test]
    fn default_flags_apply_interactively() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            target: Some(dir.path().join("assets")),
            ..GlobalOpts::default()
        };
        let setup = setup(dir.path(), &global, Scope::User).unwrap();
        assert_eq!(setup.mode, ExecMode::Apply);
        assert_eq!(setup.gate.policy(), provision::ConfirmPolicy::Interactive);
    }

    #[test]
    fn target_inside_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            target: Some(dir.path().join("source").join("assets")),
            ..GlobalOpts::default()
        };
        let err = setup(dir.path(), &global, Scope::User).unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn missing_source_is_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            target: Some(dir.path().join("assets")),
            ..GlobalOpts::default()
        };
        let log = RecordingLog::default();
        let err = CommandSetup::with_settings(
            &global,
            Scope::User,
            settings(&dir.path().join("missing")),
            Platform::detect(),
            &log,
        )
        .unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), crate::error::EXIT_PRECONDITION);
    }

    #[test]
    fn install_mode_defaults_per_scope() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            target: Some(dir.path().join("assets")),
            ..GlobalOpts::default()
        };
        let setup = setup(dir.path(), &global, Scope::User).unwrap();
        assert_eq!(setup.install_mode(None).unwrap(), InstallMode::Symlink);
        assert_eq!(
            setup.install_mode(Some(InstallMode::Copy)).unwrap(),
            InstallMode::Copy
        );
    }

    #[test]
    fn explicit_symlink_in_system_scope_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut setup = setup(
            dir.path(),
            &GlobalOpts {
                target: Some(dir.path().join("assets")),
                ..GlobalOpts::default()
            },
            Scope::User,
        )
        .unwrap();
        setup.target.scope = Scope::System;
        setup.target.legal_modes = vec![InstallMode::Copy];

        assert!(matches!(
            setup.install_mode(Some(InstallMode::Symlink)),
            Err(ProvisionError::Configuration(_))
        ));
        assert_eq!(setup.install_mode(None).unwrap(), InstallMode::Copy);
    }

    #[test]
    fn read_access_resolves_system_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        let global = GlobalOpts {
            target: Some(dir.path().join("system").join("assets")),
            ..GlobalOpts::default()
        };
        let log = RecordingLog::default();

        let setup = CommandSetup::with_access(
            &global,
            Scope::System,
            settings(&source),
            Platform::detect(),
            TargetAccess::Read,
            &log,
        )
        .unwrap();

        assert_eq!(setup.target.scope, Scope::System);
        assert!(setup.target.path.ends_with("system/assets"));
        assert!(log.contains("(system)"));
    }

    #[test]
    fn declined_outcome_is_reported() {
        let log = RecordingLog::default();
        let step = provision::Step {
            action: provision::Action::RemoveDirectory {
                target: "/data/assets".into(),
            },
            confirm: true,
        };
        report_outcome(
            &Ok(Outcome::Declined {
                applied: vec![],
                step,
            }),
            &log,
        );
        assert!(log.contains("stopped at \"remove /data/assets\""));
    }
}
