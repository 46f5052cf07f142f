//! Status command implementation.
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::{CommandSetup, TargetAccess};
use crate::cli::{GlobalOpts, StatusOpts};
use crate::logging::{Log, Logger};
use crate::provision::digest;
use crate::provision::{Backup, BackupManager, Scope, TargetKind, inspect};

/// Whether an installed copy matches the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// Same digest as the source tree.
    InSync,
    /// Digest differs from the source tree.
    Drifted,
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => write!(f, "in sync"),
            Self::Drifted => write!(f, "drifted"),
        }
    }
}

/// Everything `status` reports about one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Source tree path.
    pub source: PathBuf,
    /// Target path.
    pub target: PathBuf,
    /// Scope the target was resolved for.
    pub scope: Scope,
    /// What sits at the target.
    pub state: TargetKind,
    /// Backups of the target, oldest first.
    pub backups: Vec<Backup>,
    /// Digest comparison, only for a directory target.
    pub content: Option<Content>,
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if setup fails or the target cannot be read.
pub fn run(global: &GlobalOpts, opts: &StatusOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, opts.scope, TargetAccess::Read, log)?;
    let report = collect(&setup, log)?;
    if opts.json {
        print_json(&report)
    } else {
        render(&report, log);
        Ok(())
    }
}

/// Build the report for the resolved target.  Never modifies the filesystem.
///
/// # Errors
///
/// Returns an error if backups cannot be listed or either tree cannot be read
/// for the digest.
pub fn collect(setup: &CommandSetup, log: &dyn Log) -> Result<StatusReport> {
    let target = setup.target.path.clone();
    let state = inspect(&target);
    let backups = BackupManager::new().list_backups(&target)?;

    let content = if matches!(state, TargetKind::Occupied { .. }) && target.is_dir() {
        log.debug("comparing target digest with source");
        let same = digest::in_sync(setup.source.path(), &target)
            .with_context(|| format!("comparing {} with source", target.display()))?;
        Some(if same { Content::InSync } else { Content::Drifted })
    } else {
        None
    };

    Ok(StatusReport {
        source: setup.source.path().to_path_buf(),
        target,
        scope: setup.target.scope,
        state,
        backups,
        content,
    })
}

/// Log the report as human-readable lines.
pub fn render(report: &StatusReport, log: &dyn Log) {
    log.stage("Status");
    log.info(&format!(
        "target: {} ({})",
        report.target.display(),
        report.scope
    ));
    log.info(&format!("source: {}", report.source.display()));
    log.info(&format!("state: {}", report.state));
    if let Some(content) = report.content {
        log.info(&format!("content: {content}"));
    }
    if report.backups.is_empty() {
        log.info("backups: none");
    } else {
        log.info(&format!("backups: {}", report.backups.len()));
        for backup in &report.backups {
            log.info(&format!("  {backup}"));
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_json(report: &StatusReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialising status report")?;
    println!("{json}");
    Ok(())
}
