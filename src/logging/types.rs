//! Core logging types: action entries, status, and the [`Log`] trait.

/// One planned action as it ended up, for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    /// Rendered action, e.g. `back up /data/assets`.
    pub action: String,
    /// What happened to it.
    pub status: ActionStatus,
    /// Optional detail (backup path, decline reason, error).
    pub message: Option<String>,
}

/// Final status of a planned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// The action was applied to the filesystem.
    Applied,
    /// The action was only described (dry-run).
    DryRun,
    /// The user declined the confirmation for this action.
    Declined,
    /// The action failed; execution halted here.
    Failed,
    /// The action was not reached because an earlier one stopped execution.
    Skipped,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) is the production implementation; the
/// provisioning core only sees `&dyn Log` so tests can record messages.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record an action result for the summary.
    fn record_action(&self, action: &str, status: ActionStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_status_equality() {
        assert_eq!(ActionStatus::Applied, ActionStatus::Applied);
        assert_ne!(ActionStatus::Applied, ActionStatus::DryRun);
        assert_ne!(ActionStatus::Declined, ActionStatus::Failed);
    }

    #[test]
    fn action_entry_clone() {
        let entry = ActionEntry {
            action: "back up /data/assets".to_string(),
            status: ActionStatus::Applied,
            message: Some("/data/assets.backup.20260101T000000".to_string()),
        };
        assert_eq!(entry.clone(), entry);
    }
}
