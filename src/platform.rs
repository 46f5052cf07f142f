//! Platform detection and default target locations.
use std::fmt;
use std::path::PathBuf;

use crate::provision::Scope;

/// Detected operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux, macOS and other Unix-like systems.
    Unix,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: if cfg!(windows) { Os::Windows } else { Os::Unix },
        }
    }

    /// Create a platform with an explicit OS.
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Returns `true` on Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Default target for `scope`, reading the process environment.
    #[must_use]
    pub fn default_target(&self, scope: Scope, name: &str) -> Option<PathBuf> {
        self.default_target_with(scope, name, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Default target for `scope`, reading variables through `lookup`.
    ///
    /// | Scope  | Unix                                              | Windows                |
    /// |--------|---------------------------------------------------|------------------------|
    /// | User   | `$XDG_DATA_HOME/<name>`, `~/.local/share/<name>`  | `%APPDATA%\<name>`     |
    /// | System | `/usr/local/share/<name>`                         | `%PROGRAMDATA%\<name>` |
    ///
    /// Returns `None` when the variables a location depends on are unset.
    pub fn default_target_with(
        &self,
        scope: Scope,
        name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<PathBuf> {
        let base = match (self.os, scope) {
            (Os::Unix, Scope::User) => lookup("XDG_DATA_HOME").map(PathBuf::from).or_else(|| {
                lookup("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
            })?,
            (Os::Unix, Scope::System) => PathBuf::from("/usr/local/share"),
            (Os::Windows, Scope::User) => PathBuf::from(lookup("APPDATA")?),
            (Os::Windows, Scope::System) => PathBuf::from(lookup("PROGRAMDATA")?),
        };
        Some(base.join(name))
    }
}
