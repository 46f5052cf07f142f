//! Spawning external programs.
//!
//! assetctl shells out in two places only: `git pull` when refreshing the
//! source tree, and `mklink /J` when a Windows symlink is refused.
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context as _, Result, bail};

/// Captured outcome of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Standard output, decoded lossily.
    pub stdout: String,
    /// Standard error, decoded lossily.
    pub stderr: String,
    /// `true` when the exit status was zero.
    pub success: bool,
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Seam between the source refresh and the process table.
///
/// Production code uses [`SystemRunner`]; tests substitute a runner that
/// records command lines instead of spawning `git`.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run_in<'a>(&self, dir: &Path, program: &str, args: &[&'a str]) -> Result<ExecResult>;

    /// Whether `program` resolves on `PATH`.
    fn is_available(&self, program: &str) -> bool;
}

/// [`CommandRunner`] that really spawns processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        run_in(dir, program, args)
    }

    fn is_available(&self, program: &str) -> bool {
        which(program)
    }
}

/// Wait for `program`, turning a non-zero exit into an error that quotes its
/// stderr.
fn spawn(program: &str, args: &[&str], dir: Option<&Path>) -> Result<ExecResult> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    let result: ExecResult = command
        .output()
        .with_context(|| format!("cannot start `{line}`"))?
        .into();

    if !result.success {
        let code = result
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        bail!("`{line}` exited with {code}: {}", result.stderr.trim());
    }
    Ok(result)
}

/// Run `program` from the current directory.
///
/// # Errors
///
/// Returns an error if the program cannot be started or exits non-zero.
pub fn run(program: &str, args: &[&str]) -> Result<ExecResult> {
    spawn(program, args, None)
}

/// Run `program` from `dir`.
///
/// # Errors
///
/// Returns an error if the program cannot be started or exits non-zero.
pub fn run_in(dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
    spawn(program, args, Some(dir)).with_context(|| format!("in {}", dir.display()))
}

/// Whether `program` resolves on `PATH`.
#[must_use]
pub fn which(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn run_captures_stdout() {
        let result = run("echo", &["assets"]).unwrap();
        assert!(result.success);
        assert_eq!(result.code, Some(0));
        assert_eq!(result.stdout.trim(), "assets");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_names_command_and_code() {
        let err = run("sh", &["-c", "echo not a repository >&2; exit 128"]).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("exited with 128"), "{text}");
        assert!(text.contains("not a repository"), "{text}");
    }

    #[test]
    fn missing_program_cannot_start() {
        let err = run("assetctl-no-such-program", &[]).unwrap_err();
        assert!(err.to_string().contains("cannot start"));
    }

    #[test]
    fn which_reports_missing_program() {
        assert!(!which("assetctl-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("theme.json"), "{}").unwrap();
        let result = SystemRunner.run_in(dir.path(), "ls", &[]).unwrap();
        assert!(result.stdout.contains("theme.json"));
    }

    #[test]
    fn mock_runner_matches_pull_arguments() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run_in()
            .withf(|_, program, args| program == "git" && args == ["pull", "--ff-only"])
            .times(1)
            .returning(|_, _, _| {
                Ok(ExecResult {
                    stdout: "Already up to date.\n".to_string(),
                    stderr: String::new(),
                    success: true,
                    code: Some(0),
                })
            });
        let result = runner
            .run_in(Path::new("/src"), "git", &["pull", "--ff-only"])
            .unwrap();
        assert!(result.success);
    }
}
