//! Target inspection.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Where an occupied target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// No ownership marker; may be a previous copy install or foreign content.
    Unknown,
    /// A copy install made by this tool with the ownership marker enabled.
    OwnedByUs,
}

/// What currently sits at a target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    /// Nothing at the path.
    Absent,
    /// A symbolic link, possibly dangling.
    Symlink {
        /// The link's recorded destination, for display only.
        points_to: PathBuf,
    },
    /// A real file or directory.
    Occupied {
        /// Whether the entry is known to be ours.
        origin: Origin,
    },
}

impl TargetKind {
    /// Returns `true` for [`TargetKind::Absent`].
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Symlink { points_to } => write!(f, "symlink -> {}", points_to.display()),
            Self::Occupied {
                origin: Origin::Unknown,
            } => write!(f, "occupied"),
            Self::Occupied {
                origin: Origin::OwnedByUs,
            } => write!(f, "occupied (installed copy)"),
        }
    }
}

/// Classify the entry at `path` without following symlinks.
///
/// A dangling symlink is still reported as [`TargetKind::Symlink`].  An entry
/// whose metadata cannot be read at all is reported as [`TargetKind::Absent`].
#[must_use]
pub fn inspect(path: &Path) -> TargetKind {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return TargetKind::Absent;
    };
    if meta.file_type().is_symlink() {
        let points_to = std::fs::read_link(path).unwrap_or_default();
        return TargetKind::Symlink { points_to };
    }
    let origin = if super::owned_marker_path(path).is_file() {
        Origin::OwnedByUs
    } else {
        Origin::Unknown
    };
    TargetKind::Occupied { origin }
}
