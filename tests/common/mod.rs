// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed source tree and target location plus
// in-memory implementations of the logging, prompting and command-running
// seams, so each integration test can drive the public API without touching
// the real terminal, `git` or the user's home directory.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use assetctl::cli::GlobalOpts;
use assetctl::commands::CommandSetup;
use assetctl::config::Settings;
use assetctl::exec::{CommandRunner, ExecResult};
use assetctl::logging::{ActionEntry, ActionStatus, Log};
use assetctl::platform::Platform;
use assetctl::provision::{ConfirmPolicy, ConfirmationGate, Prompt, Scope};

/// Write a small asset tree into `root`.
///
/// Creates:
/// - `theme.json`
/// - `icons/app.svg`
/// - `icons/nested/badge.svg`
pub fn write_source_tree(root: &Path) {
    std::fs::create_dir_all(root.join("icons").join("nested")).expect("create icons dir");
    std::fs::write(root.join("theme.json"), "{\"accent\":\"blue\"}").expect("write theme");
    std::fs::write(root.join("icons").join("app.svg"), "<svg/>").expect("write icon");
    std::fs::write(
        root.join("icons").join("nested").join("badge.svg"),
        "<svg id=\"badge\"/>",
    )
    .expect("write badge");
}

/// Relative path → file content for every file under `root`, following
/// symlinks and skipping `.git`.  Directories appear with an empty value and
/// a trailing `/`.
pub fn tree_contents(root: &Path) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("dir entry").path())
            .collect();
        entries.sort();
        for path in entries {
            if path.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            let rel = path
                .strip_prefix(root)
                .expect("strip prefix")
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                out.insert(format!("{rel}/"), String::new());
                walk(root, &path, out);
            } else {
                out.insert(rel, std::fs::read_to_string(&path).expect("read file"));
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

/// Sorted names of the entries directly inside `dir`.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// An isolated source tree and target location backed by a
/// [`tempfile::TempDir`].
///
/// Layout: `<tmp>/source/` holds the assets, `<tmp>/share/` is the parent of
/// the target `<tmp>/share/assets`.
pub struct IntegrationTestContext {
    /// Temporary directory holding source and target.
    pub dir: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with a populated source tree and an empty target
    /// parent directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_source_tree(&dir.path().join("source"));
        std::fs::create_dir_all(dir.path().join("share")).expect("create share dir");
        Self { dir }
    }

    /// Path to the source tree.
    pub fn source(&self) -> PathBuf {
        dunce::canonicalize(self.dir.path().join("source")).expect("canonical source")
    }

    /// Parent directory of the target.
    pub fn share(&self) -> PathBuf {
        dunce::canonicalize(self.dir.path().join("share")).expect("canonical share")
    }

    /// Target path.
    pub fn target(&self) -> PathBuf {
        self.share().join("assets")
    }

    /// Backup entries beside the target, sorted.
    pub fn backups(&self) -> Vec<String> {
        dir_listing(&self.share())
            .into_iter()
            .filter(|n| n.starts_with("assets.backup."))
            .collect()
    }

    /// Settings pointing at this context's source and target.
    pub fn settings(&self) -> Settings {
        Settings {
            source: Some(self.source()),
            user_target: Some(self.target()),
            system_target: Some(self.target()),
            ..Settings::default()
        }
    }

    /// Put foreign content at the target.
    pub fn occupy_target(&self, content: &str) {
        std::fs::create_dir_all(self.target()).expect("create target");
        std::fs::write(self.target().join("foreign.txt"), content).expect("write foreign");
    }

    /// Setup for `scope` approving every confirmation.
    pub fn setup(&self, scope: Scope) -> CommandSetup {
        self.setup_with(scope, false, self.settings())
    }

    /// Dry-run setup for `scope`.
    pub fn dry_run_setup(&self, scope: Scope) -> CommandSetup {
        self.setup_with(scope, true, self.settings())
    }

    /// Setup with explicit dry-run flag and settings, approving every
    /// confirmation.
    pub fn setup_with(&self, scope: Scope, dry_run: bool, settings: Settings) -> CommandSetup {
        let global = GlobalOpts {
            dry_run,
            yes: true,
            ..GlobalOpts::default()
        };
        CommandSetup::with_settings(
            &global,
            scope,
            settings,
            Platform::detect(),
            &RecordingLog::default(),
        )
        .expect("command setup")
    }
}

/// In-memory [`Log`] that keeps every message and recorded action.
#[derive(Debug, Default)]
pub struct RecordingLog {
    messages: Mutex<Vec<String>>,
    actions: Mutex<Vec<ActionEntry>>,
}

impl RecordingLog {
    fn push(&self, level: &str, msg: &str) {
        self.messages
            .lock()
            .expect("messages lock")
            .push(format!("[{level}] {msg}"));
    }

    /// Returns `true` if any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .expect("messages lock")
            .iter()
            .any(|m| m.contains(needle))
    }

    /// Statuses of the recorded actions, in order.
    pub fn statuses(&self) -> Vec<ActionStatus> {
        self.actions
            .lock()
            .expect("actions lock")
            .iter()
            .map(|a| a.status)
            .collect()
    }
}

impl Log for RecordingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record_action(&self, action: &str, status: ActionStatus, message: Option<&str>) {
        self.actions.lock().expect("actions lock").push(ActionEntry {
            action: action.to_string(),
            status,
            message: message.map(String::from),
        });
    }
}

/// [`Prompt`] answering from a fixed script and remembering the questions.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// Prompt giving `answers` in order, then "no".
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str) -> anyhow::Result<bool> {
        self.asked
            .lock()
            .expect("asked lock")
            .push(question.to_string());
        Ok(self
            .answers
            .lock()
            .expect("answers lock")
            .pop_front()
            .unwrap_or(false))
    }
}

/// Interactive gate answering from `answers`.
pub fn scripted_gate(answers: &[bool]) -> ConfirmationGate {
    ConfirmationGate::new(
        ConfirmPolicy::Interactive,
        Box::new(ScriptedPrompt::new(answers)),
    )
}

/// [`CommandRunner`] that records invocations instead of spawning them.
#[derive(Debug)]
pub struct FakeRunner {
    /// Whether `git` is reported as installed.
    pub git_available: bool,
    /// Error message returned from every `run_in`, if set.
    pub fail_with: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    /// Runner with `git` available whose commands succeed.
    pub fn new() -> Self {
        Self {
            git_available: true,
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Runner reporting that `git` is not installed.
    pub fn without_git() -> Self {
        Self {
            git_available: false,
            ..Self::new()
        }
    }

    /// Runner whose every command fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Command lines passed to `run_in`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("{program} {}", args.join(" ")));
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        Ok(ExecResult {
            stdout: "Already up to date.\n".to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        program == "git" && self.git_available
    }
}
