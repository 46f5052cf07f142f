//! Non-fatal checks on loaded settings.
use std::path::Path;

use super::Settings;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The setting that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning for `item`.
    #[must_use]
    pub fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Collect warnings for settings that are legal but probably unintended.
#[must_use]
pub fn validate(settings: &Settings) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let paths: [(&str, Option<&Path>); 3] = [
        ("source", settings.source.as_deref()),
        ("user_target", settings.user_target.as_deref()),
        ("system_target", settings.system_target.as_deref()),
    ];
    for (item, path) in paths {
        if let Some(path) = path
            && path.is_relative()
        {
            warnings.push(ValidationWarning::new(
                item,
                format!(
                    "{} is relative and resolves against the current directory",
                    path.display()
                ),
            ));
        }
    }

    if !settings.lock {
        warnings.push(ValidationWarning::new(
            "lock",
            "locking is disabled; concurrent runs against one target are not serialised",
        ));
    }

    warnings
}
