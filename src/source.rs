//! The source asset tree: locating it, and refreshing it from its upstream
//! before an update.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use git2::{Branch, ErrorCode, Repository};

use crate::config::{SOURCE_ENV, Settings};
use crate::error::ProvisionError;
use crate::exec::CommandRunner;
use crate::logging::Log;
use crate::provision::ExecMode;
use crate::provision::helpers::GIT_DIR;

/// Where the local branch stands relative to its upstream tracking branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamState {
    /// Local `HEAD` already contains the upstream commit.
    UpToDate,
    /// Upstream has this many commits local `HEAD` lacks.
    Behind(usize),
    /// Detached `HEAD`, unborn branch or no upstream configured.
    Unknown,
}

/// A located, existing source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    path: PathBuf,
}

impl SourceTree {
    /// Locate the source tree for this process.
    ///
    /// Uses `settings.source` when set; otherwise searches beside the running
    /// binary and then the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if no source tree is found.
    pub fn locate(settings: &Settings) -> Result<Self, ProvisionError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cwd = std::env::current_dir().ok();
        Self::discover(settings.source.as_deref(), exe_dir.as_deref(), cwd.as_deref())
    }

    /// Locate the source tree from explicit inputs.
    ///
    /// An `explicit` path must be an existing directory.  Discovered
    /// candidates (`<exe_dir>/../..`, `<exe_dir>/..`, `cwd`) are accepted only
    /// when they are git work trees.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if `explicit` is not a
    /// directory or no candidate qualifies.
    pub fn discover(
        explicit: Option<&Path>,
        exe_dir: Option<&Path>,
        cwd: Option<&Path>,
    ) -> Result<Self, ProvisionError> {
        if let Some(path) = explicit {
            return Self::open(path);
        }

        let mut candidates = Vec::new();
        if let Some(dir) = exe_dir {
            // target/release/ or bin/ → repository root
            candidates.push(dir.join("..").join(".."));
            candidates.push(dir.join(".."));
        }
        if let Some(dir) = cwd {
            candidates.push(dir.to_path_buf());
        }

        let Some(found) = candidates.iter().find(|c| c.join(GIT_DIR).exists()) else {
            return Err(ProvisionError::Precondition(format!(
                "source tree not found; use --source or set {SOURCE_ENV}"
            )));
        };
        Self::open(found)
    }

    /// Open an explicitly named source tree.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if `path` is not an existing
    /// directory.
    pub fn open(path: &Path) -> Result<Self, ProvisionError> {
        if !path.is_dir() {
            return Err(ProvisionError::Precondition(format!(
                "source tree {} does not exist or is not a directory",
                path.display()
            )));
        }
        let path = dunce::canonicalize(path).map_err(|e| ProvisionError::io("resolve", path, e))?;
        Ok(Self { path })
    }

    /// Canonical path of the tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the tree is a non-bare git work tree.
    #[must_use]
    pub fn is_repository(&self) -> bool {
        Repository::open(&self.path).is_ok_and(|repo| !repo.is_bare())
    }

    /// Compare local `HEAD` with its upstream tracking branch.
    ///
    /// Only refs already present locally are consulted; nothing is fetched.
    #[must_use]
    pub fn upstream_state(&self) -> UpstreamState {
        Repository::open(&self.path)
            .and_then(|repo| upstream_state(&repo))
            .unwrap_or(UpstreamState::Unknown)
    }

    /// Bring the tree up to date with its upstream before an update.
    ///
    /// In [`ExecMode::Apply`] this runs `git pull --ff-only` through
    /// `runner`.  In [`ExecMode::Describe`] it only reports whether a pull
    /// would happen and never runs git.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if the tree is not a git work
    /// tree or `git` is not on `PATH`, and an error if the pull fails.
    pub fn refresh(&self, mode: ExecMode, runner: &dyn CommandRunner, log: &dyn Log) -> Result<()> {
        log.stage("Refreshing source tree");

        if !self.is_repository() {
            return Err(ProvisionError::Precondition(format!(
                "source tree {} is not a git work tree",
                self.path.display()
            ))
            .into());
        }
        if !runner.is_available("git") {
            return Err(ProvisionError::Precondition(
                "git is not on PATH; it is required to update the source tree".to_string(),
            )
            .into());
        }

        match mode {
            ExecMode::Describe => {
                match self.upstream_state() {
                    UpstreamState::UpToDate => log.info("already up to date"),
                    UpstreamState::Behind(n) => {
                        log.debug(&format!("upstream is {n} commit(s) ahead"));
                        log.dry_run("would git pull");
                    }
                    UpstreamState::Unknown => log.dry_run("would git pull"),
                }
                Ok(())
            }
            ExecMode::Apply => {
                log.debug(&format!("pulling in {}", self.path.display()));
                let result = runner
                    .run_in(&self.path, "git", &["pull", "--ff-only"])
                    .with_context(|| format!("refreshing source tree {}", self.path.display()))?;
                let output = result.stdout.trim();
                log.debug(&format!("git pull output: {output}"));
                if output.contains("Already up to date") {
                    log.info("already up to date");
                } else {
                    log.info("source tree updated");
                }
                Ok(())
            }
        }
    }
}

fn upstream_state(repo: &Repository) -> Result<UpstreamState, git2::Error> {
    let head = repo.head()?;
    if !head.is_branch() {
        return Ok(UpstreamState::Unknown);
    }
    let Some(local) = head.target() else {
        return Ok(UpstreamState::Unknown);
    };
    let upstream = match Branch::wrap(head).upstream() {
        Ok(branch) => branch,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(UpstreamState::Unknown),
        Err(e) => return Err(e),
    };
    let Some(remote) = upstream.get().target() else {
        return Ok(UpstreamState::Unknown);
    };
    if local == remote {
        return Ok(UpstreamState::UpToDate);
    }
    let (_ahead, behind) = repo.graph_ahead_behind(local, remote)?;
    Ok(if behind == 0 {
        UpstreamState::UpToDate
    } else {
        UpstreamState::Behind(behind)
    })
}
