//! Asset provisioning engine.
//!
//! Installs a source tree of assets at a per-user or system-wide target path,
//! as a symbolic link or an independent copy, keeps the previous content as a
//! timestamped backup, and restores it again on uninstall.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: layered settings from defaults, TOML, environment and flags
//! - **[`provision`]**: the resolve, inspect, plan and execute state machine
//! - **[`source`]**: locating the source tree and refreshing it with git
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `update`, `uninstall`, `status`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod provision;
pub mod source;
