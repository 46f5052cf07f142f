//! Approval gate for destructive steps.
use std::fmt;
use std::io::{self, BufRead as _, IsTerminal as _, Write as _};

use anyhow::{Context as _, Result};

use super::plan::Step;

/// Whether destructive steps need an answer from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Approve everything (`--yes`).
    AssumeYes,
    /// Ask before each destructive step.
    Interactive,
}

/// Source of yes/no answers.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt: Send + Sync {
    /// Ask `question`; `Ok(true)` means approved.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompt on stderr and read the answer from stdin.
///
/// A stdin that is not a terminal answers "no" immediately rather than
/// blocking, and so does end-of-input.  Only `y` and `yes` (any case) approve.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Ok(false);
        }

        let mut stderr = io::stderr();
        write!(stderr, "{question} [y/N] ").context("writing prompt")?;
        stderr.flush().context("flushing prompt")?;

        let mut input = String::new();
        let read = stdin
            .lock()
            .read_line(&mut input)
            .context("reading confirmation")?;
        Ok(read > 0 && is_affirmative(&input))
    }
}

/// Returns `true` for `y` or `yes`, ignoring case and surrounding whitespace.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Decides whether a step may run.
pub struct ConfirmationGate {
    policy: ConfirmPolicy,
    prompt: Box<dyn Prompt>,
}

impl fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ConfirmationGate {
    /// Gate with an explicit policy and prompt.
    #[must_use]
    pub fn new(policy: ConfirmPolicy, prompt: Box<dyn Prompt>) -> Self {
        Self { policy, prompt }
    }

    /// Gate that approves every step.
    #[must_use]
    pub fn assume_yes() -> Self {
        Self::new(ConfirmPolicy::AssumeYes, Box::new(StdinPrompt))
    }

    /// Gate that asks on the terminal.
    #[must_use]
    pub fn interactive() -> Self {
        Self::new(ConfirmPolicy::Interactive, Box::new(StdinPrompt))
    }

    /// The configured policy.
    #[must_use]
    pub const fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Whether `step` may run.  Steps not flagged for confirmation always may.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt fails to read an answer.
    pub fn approve(&self, step: &Step) -> Result<bool> {
        if !step.confirm {
            return Ok(true);
        }
        match self.policy {
            ConfirmPolicy::AssumeYes => Ok(true),
            ConfirmPolicy::Interactive => self.prompt.confirm(&format!("{}?", step.action)),
        }
    }
}
