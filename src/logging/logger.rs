//! Production [`Log`] implementation: tracing events plus an action ledger.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{ActionEntry, ActionStatus, Log};
use super::utils::log_file_path;

/// Counts of recorded actions by status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    applied: usize,
    dry_run: usize,
    declined: usize,
    failed: usize,
    skipped: usize,
}

impl Tally {
    fn of(entries: &[ActionEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut tally, entry| {
            match entry.status {
                ActionStatus::Applied => tally.applied += 1,
                ActionStatus::DryRun => tally.dry_run += 1,
                ActionStatus::Declined => tally.declined += 1,
                ActionStatus::Failed => tally.failed += 1,
                ActionStatus::Skipped => tally.skipped += 1,
            }
            tally
        })
    }
}

/// Summary glyph and colour for a status.
const fn badge(status: ActionStatus) -> (&'static str, &'static str) {
    match status {
        ActionStatus::Applied => ("✓", "\x1b[32m"),
        ActionStatus::DryRun => ("~", "\x1b[37m"),
        ActionStatus::Declined => ("○", "\x1b[33m"),
        ActionStatus::Failed => ("✗", "\x1b[31m"),
        ActionStatus::Skipped => ("·", "\x1b[2m"),
    }
}

/// Logger used by the binary.
///
/// Messages become [`tracing`] events, so they reach both the console and
/// `$XDG_CACHE_HOME/assetctl/<command>.log` once
/// [`init_subscriber`](super::init_subscriber) has run.  Every action the
/// executor reports is kept for [`Logger::print_summary`].
#[derive(Debug)]
pub struct Logger {
    actions: Mutex<Vec<ActionEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for a run of `command`.
    ///
    /// Only remembers where the log file lives; the file itself is opened by
    /// the subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Path of this run's log file, if one could be placed.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Snapshot of the recorded actions.
    #[must_use]
    pub fn action_entries(&self) -> Vec<ActionEntry> {
        self.actions.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of recorded actions that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        Tally::of(&self.action_entries()).failed
    }

    /// Log the recorded actions, one line each, then the per-status counts
    /// and the log file location.  Silent when nothing was recorded.
    pub fn print_summary(&self) {
        let entries = self.action_entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");
        for entry in &entries {
            let (glyph, colour) = badge(entry.status);
            let detail = entry
                .message
                .as_deref()
                .map(|m| format!(" ({m})"))
                .unwrap_or_default();
            self.info(&format!("{colour}{glyph} {}{detail}\x1b[0m", entry.action));
        }

        let t = Tally::of(&entries);
        self.info(&format!(
            "{} actions: \x1b[32m{} applied\x1b[0m, \x1b[37m{} dry-run\x1b[0m, \x1b[33m{} declined\x1b[0m, \x1b[31m{} failed\x1b[0m, \x1b[2m{} skipped\x1b[0m",
            entries.len(),
            t.applied,
            t.dry_run,
            t.declined,
            t.failed,
            t.skipped
        ));
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_action(&self, action: &str, status: ActionStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.actions.lock() {
            guard.push(ActionEntry {
                action: action.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}
