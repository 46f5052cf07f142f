//! Layered settings.
//!
//! Precedence, lowest first: built-in defaults, the TOML config file,
//! environment variables, command-line flags.  The result is an immutable
//! [`Settings`] value passed by reference to the resolver, planner input and
//! executor.
pub mod toml_loader;
pub mod validation;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::ProvisionError;
use crate::provision::{InstallMode, Scope};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ASSETCTL_CONFIG";

/// Environment variable naming the source tree.
pub const SOURCE_ENV: &str = "ASSETCTL_SOURCE";

/// Target directory name used when the config file does not set one.
pub const DEFAULT_NAME: &str = "assets";

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Source tree; discovered when unset.
    pub source: Option<PathBuf>,
    /// Directory name of the target under the per-scope default location.
    pub name: String,
    /// Explicit user-scope target, replacing the platform default.
    pub user_target: Option<PathBuf>,
    /// Explicit system-scope target, replacing the platform default.
    pub system_target: Option<PathBuf>,
    /// Mode used when `--mode` is not given and the scope allows it.
    pub default_mode: InstallMode,
    /// Write a sibling ownership marker after copy installs.
    pub mark_owned: bool,
    /// Hold an advisory lock while a plan is applied.
    pub lock: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            name: DEFAULT_NAME.to_string(),
            user_target: None,
            system_target: None,
            default_mode: InstallMode::default(),
            mark_owned: false,
            lock: true,
        }
    }
}

/// Values taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--config`.
    pub config: Option<PathBuf>,
    /// `--source`.
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file is missing, the
    /// file cannot be parsed, or the resulting settings are invalid.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::load_with(overrides, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Load settings reading environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_with(overrides: &Overrides, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let explicit = overrides
            .config
            .clone()
            .or_else(|| lookup(CONFIG_ENV).map(PathBuf::from));

        let mut settings: Self = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ProvisionError::Configuration(format!(
                        "config file {} not found",
                        path.display()
                    ))
                    .into());
                }
                toml_loader::load_config(&path)?
            }
            None => match default_config_path(&lookup) {
                Some(path) => toml_loader::load_config(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => Self::default(),
            },
        };

        if let Some(source) = lookup(SOURCE_ENV) {
            settings.source = Some(PathBuf::from(source));
        }
        if let Some(source) = &overrides.source {
            settings.source = Some(source.clone());
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that would otherwise surface as confusing paths.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Configuration`] if `name` is not a single
    /// plain path component.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let mut components = Path::new(&self.name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(c)), None) if c == self.name.as_str()
        );
        if single {
            Ok(())
        } else {
            Err(ProvisionError::Configuration(format!(
                "name {:?} must be a single directory name",
                self.name
            )))
        }
    }

    /// Target configured for `scope`, if the config file sets one.
    #[must_use]
    pub fn configured_target(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::User => self.user_target.as_deref(),
            Scope::System => self.system_target.as_deref(),
        }
    }
}

/// Default config file location.
///
/// `$XDG_CONFIG_HOME/assetctl/config.toml`, else `~/.config/assetctl/config.toml`,
/// else `%APPDATA%\assetctl\config.toml`.
pub fn default_config_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let base = lookup("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".config")))
        .or_else(|| lookup("APPDATA").map(PathBuf::from))?;
    Some(base.join("assetctl").join("config.toml"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn xdg(dir: &Path) -> (&'static str, String) {
        ("XDG_CONFIG_HOME", dir.display().to_string())
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("assetctl").join("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    // -----------------------------------------------------------------------
    // defaults
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_with(&Overrides::default(), env(&[xdg(dir.path())])).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.lock);
        assert!(!settings.mark_owned);
        assert_eq!(settings.name, "assets");
    }

    #[test]
    fn default_config_path_prefers_xdg() {
        let path = default_config_path(env(&[
            ("XDG_CONFIG_HOME", "/x".to_string()),
            ("HOME", "/home/u".to_string()),
        ]));
        assert_eq!(path, Some(PathBuf::from("/x/assetctl/config.toml")));
    }

    #[test]
    fn default_config_path_falls_back_to_home() {
        let path = default_config_path(env(&[("HOME", "/home/u".to_string())]));
        assert_eq!(path, Some(PathBuf::from("/home/u/.config/assetctl/config.toml")));
    }

    // -----------------------------------------------------------------------
    // layering
    // -----------------------------------------------------------------------

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "name = \"icons\"\ndefault_mode = \"copy\"\nmark_owned = true\nlock = false\n",
        );
        let settings = Settings::load_with(&Overrides::default(), env(&[xdg(dir.path())])).unwrap();
        assert_eq!(settings.name, "icons");
        assert_eq!(settings.default_mode, InstallMode::Copy);
        assert!(settings.mark_owned);
        assert!(!settings.lock);
    }

    #[test]
    fn environment_source_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "source = \"/from/config\"\n");
        let settings = Settings::load_with(
            &Overrides::default(),
            env(&[xdg(dir.path()), (SOURCE_ENV, "/from/env".to_string())]),
        )
        .unwrap();
        assert_eq!(settings.source, Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn cli_source_overrides_environment() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config: None,
            source: Some(PathBuf::from("/from/cli")),
        };
        let settings = Settings::load_with(
            &overrides,
            env(&[xdg(dir.path()), (SOURCE_ENV, "/from/env".to_string())]),
        )
        .unwrap();
        assert_eq!(settings.source, Some(PathBuf::from("/from/cli")));
    }

    #[test]
    fn config_env_selects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "name = \"fonts\"\n").unwrap();
        let settings = Settings::load_with(
            &Overrides::default(),
            env(&[(CONFIG_ENV, path.display().to_string())]),
        )
        .unwrap();
        assert_eq!(settings.name, "fonts");
    }

    #[test]
    fn explicit_missing_config_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config: Some(dir.path().join("nope.toml")),
            source: None,
        };
        let err = Settings::load_with(&overrides, env(&[])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "colour = \"blue\"\n");
        let err = Settings::load_with(&Overrides::default(), env(&[xdg(dir.path())])).unwrap_err();
        assert!(format!("{err:#}").contains("colour"));
    }

    // -----------------------------------------------------------------------
    // validation
    // -----------------------------------------------------------------------

    #[test]
    fn name_must_be_single_component() {
        for bad in ["", "a/b", "..", "."] {
            let settings = Settings {
                name: bad.to_string(),
                ..Settings::default()
            };
            assert!(settings.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn configured_target_by_scope() {
        let settings = Settings {
            user_target: Some(PathBuf::from("/u")),
            system_target: Some(PathBuf::from("/s")),
            ..Settings::default()
        };
        assert_eq!(settings.configured_target(Scope::User), Some(Path::new("/u")));
        assert_eq!(settings.configured_target(Scope::System), Some(Path::new("/s")));
    }
}
