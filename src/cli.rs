//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::provision::{InstallMode, Scope};

/// Top-level CLI entry point for the asset provisioner.
#[derive(Parser, Debug)]
#[command(
    name = "assetctl",
    about = "Install, update and remove a directory of assets at a user or system location",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Approve every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Source tree to provision from
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Target path, replacing the per-scope default
    #[arg(long, global = true)]
    pub target: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/assetctl/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the source tree at the target
    Install(InstallOpts),
    /// Refresh the source tree, then reinstall it
    Update(InstallOpts),
    /// Remove the target and restore the latest backup
    Uninstall(ScopeOpts),
    /// Report what is installed at the target
    Status(StatusOpts),
    /// Print a shell completion script
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Subcommand name, used to name the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Update(_) => "update",
            Self::Uninstall(_) => "uninstall",
            Self::Status(_) => "status",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` and `update` subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Install mode; defaults to the configured mode when the scope allows it
    #[arg(long, value_enum)]
    pub mode: Option<InstallMode>,

    /// Target scope
    #[arg(long, value_enum, default_value_t = Scope::User)]
    pub scope: Scope,
}

/// Options for subcommands that only select a scope.
#[derive(Parser, Debug, Clone, Default)]
pub struct ScopeOpts {
    /// Target scope
    #[arg(long, value_enum, default_value_t = Scope::User)]
    pub scope: Scope,
}

/// Options for the `status` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct StatusOpts {
    /// Target scope
    #[arg(long, value_enum, default_value_t = Scope::User)]
    pub scope: Scope,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
