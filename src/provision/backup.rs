//! Timestamped sibling backups of a displaced target.
//!
//! A backup of `<target>` lives beside it as
//! `<target>.backup.<YYYYMMDDTHHMMSS>[.NNN]`.  The timestamp is UTC at second
//! resolution; when a name is already taken within the same second a
//! zero-padded counter is appended, so the lexicographic order of backup
//! names always matches the order they were created in.  Backups are never
//! deleted by this module.
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::inspect::inspect;
use crate::error::ProvisionError;

/// Infix between the target's file name and the timestamp.
const BACKUP_INFIX: &str = ".backup.";

/// `strftime` format of the timestamp part.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Highest collision counter tried within a single second.
const MAX_COLLISIONS: u16 = 999;

/// A former target that was moved aside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    /// Absolute path of the backup entry.
    pub path: PathBuf,
    /// Timestamp part of the name, including any collision counter.
    pub stamp: String,
}

impl fmt::Display for Backup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Creates, lists, and restores backups.
pub struct BackupManager {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupManager")
            .field("clock", &"<fn>")
            .finish()
    }
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupManager {
    /// Manager that timestamps backups with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Manager with an injected clock.
    #[must_use]
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Move the entry at `target` to a fresh backup sibling.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if nothing exists at `target`
    /// or if every collision counter for the current second is taken, and
    /// [`ProvisionError::Io`] if the rename fails.
    pub fn create_backup(&self, target: &Path) -> Result<Backup, ProvisionError> {
        if inspect(target).is_absent() {
            return Err(ProvisionError::Precondition(format!(
                "cannot back up {}: nothing there",
                target.display()
            )));
        }
        let base = (self.clock)().format(TIMESTAMP_FORMAT).to_string();
        let backup = unused_backup_name(target, &base)?;
        std::fs::rename(target, &backup.path)
            .map_err(|e| ProvisionError::io("rename", target, e))?;
        Ok(backup)
    }

    /// The most recent backup of `target`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Io`] if the parent directory exists but
    /// cannot be listed.
    pub fn latest_backup(&self, target: &Path) -> Result<Option<Backup>, ProvisionError> {
        Ok(self.list_backups(target)?.pop())
    }

    /// All backups of `target`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Io`] if the parent directory exists but
    /// cannot be listed.
    pub fn list_backups(&self, target: &Path) -> Result<Vec<Backup>, ProvisionError> {
        let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{}{BACKUP_INFIX}", name.to_string_lossy());
        let entries = match std::fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProvisionError::io("list", parent, e)),
        };

        let mut backups: Vec<Backup> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let stamp = file_name.strip_prefix(&prefix)?;
                is_backup_stamp(stamp).then(|| Backup {
                    path: parent.join(&file_name),
                    stamp: stamp.to_string(),
                })
            })
            .collect();
        backups.sort_by(|a, b| a.stamp.cmp(&b.stamp));
        Ok(backups)
    }

    /// Move `backup` back into place at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Precondition`] if `target` is not absent, and
    /// [`ProvisionError::Io`] if the rename fails.
    pub fn restore(&self, backup: &Backup, target: &Path) -> Result<(), ProvisionError> {
        let current = inspect(target);
        if !current.is_absent() {
            return Err(ProvisionError::Precondition(format!(
                "cannot restore onto {}: target is {current}",
                target.display()
            )));
        }
        std::fs::rename(&backup.path, target)
            .map_err(|e| ProvisionError::io("rename", &backup.path, e))
    }
}

/// Path of the backup `target` would get for the timestamp `stamp`, before
/// collision handling.
#[must_use]
pub fn backup_path(target: &Path, stamp: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map_or_else(|| "target".into(), std::ffi::OsStr::to_os_string);
    name.push(BACKUP_INFIX);
    name.push(stamp);
    target.with_file_name(name)
}

/// First backup name for `base` that is not taken yet.
fn unused_backup_name(target: &Path, base: &str) -> Result<Backup, ProvisionError> {
    let taken = |p: &Path| p.symlink_metadata().is_ok();

    let path = backup_path(target, base);
    if !taken(&path) {
        return Ok(Backup {
            path,
            stamp: base.to_string(),
        });
    }
    for n in 1..=MAX_COLLISIONS {
        let stamp = format!("{base}.{n:03}");
        let path = backup_path(target, &stamp);
        if !taken(&path) {
            return Ok(Backup { path, stamp });
        }
    }
    Err(ProvisionError::Precondition(format!(
        "too many backups of {} within {base}",
        target.display()
    )))
}

/// Returns `true` if `s` is `YYYYMMDDTHHMMSS` optionally followed by `.NNN`.
fn is_backup_stamp(s: &str) -> bool {
    let (stamp, counter) = match s.split_once('.') {
        Some((stamp, counter)) => (stamp, Some(counter)),
        None => (s, None),
    };
    let well_formed = stamp.len() == 15
        && stamp.char_indices().all(|(i, c)| {
            if i == 8 {
                c == 'T'
            } else {
                c.is_ascii_digit()
            }
        });
    let counter_ok = counter.is_none_or(|c| c.len() == 3 && c.chars().all(|c| c.is_ascii_digit()));
    well_formed && counter_ok
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn fixed_clock(secs: i64) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        move || Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn ticking_clock(start: i64) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        let next = AtomicI64::new(start);
        move || {
            let secs = next.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(secs, 0).single().unwrap()
        }
    }

    fn occupied_target(dir: &Path, content: &str) -> PathBuf {
        let target = dir.join("assets");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("marker.txt"), content).unwrap();
        target
    }

    // -----------------------------------------------------------------------
    // naming
    // -----------------------------------------------------------------------

    #[test]
    fn stamp_pattern_accepts_plain_and_counter_forms() {
        assert!(is_backup_stamp("20261019T101010"));
        assert!(is_backup_stamp("20261019T101010.007"));
    }

    #[test]
    fn stamp_pattern_rejects_other_names() {
        assert!(!is_backup_stamp("20261019-101010"));
        assert!(!is_backup_stamp("20261019T10101"));
        assert!(!is_backup_stamp("20261019T101010.7"));
        assert!(!is_backup_stamp("20261019T101010.abc"));
        assert!(!is_backup_stamp("old"));
    }

    #[test]
    fn backup_path_is_sibling() {
        let p = backup_path(Path::new("/home/u/.local/share/assets"), "20260101T000000");
        assert_eq!(
            p,
            PathBuf::from("/home/u/.local/share/assets.backup.20260101T000000")
        );
    }

    // -----------------------------------------------------------------------
    // create_backup
    // -----------------------------------------------------------------------

    #[test]
    fn create_backup_moves_target_aside() {
        let dir = tempfile::tempdir().unwrap();
        let target = occupied_target(dir.path(), "v1");
        // 2026-01-01T00:00:00Z
        let mgr = BackupManager::with_clock(fixed_clock(1_767_225_600));

        let backup = mgr.create_backup(&target).unwrap();

        assert_eq!(backup.stamp, "20260101T000000");
        assert!(!target.exists());
        assert_eq!(
            std::fs::read_to_string(backup.path.join("marker.txt")).unwrap(),
            "v1"
        );
    }

    #[test]
    fn create_backup_requires_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = BackupManager::new();
        let err = mgr.create_backup(&dir.path().join("assets")).unwrap_err();
        assert!(matches!(err, ProvisionError::Precondition(_)));
    }

    #[test]
    fn same_second_backups_get_counter_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = BackupManager::with_clock(fixed_clock(1_767_225_600));

        let first = mgr
            .create_backup(&occupied_target(dir.path(), "v1"))
            .unwrap();
        let second = mgr
            .create_backup(&occupied_target(dir.path(), "v2"))
            .unwrap();
        let third = mgr
            .create_backup(&occupied_target(dir.path(), "v3"))
            .unwrap();

        assert_eq!(first.stamp, "20260101T000000");
        assert_eq!(second.stamp, "20260101T000000.001");
        assert_eq!(third.stamp, "20260101T000000.002");
        assert!(first.path.exists() && second.path.exists() && third.path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn create_backup_accepts_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("assets");
        std::os::unix::fs::symlink("/nonexistent", &target).unwrap();
        let mgr = BackupManager::with_clock(fixed_clock(0));
        let backup = mgr.create_backup(&target).unwrap();
        assert!(backup.path.symlink_metadata().unwrap().is_symlink());
    }

    // -----------------------------------------------------------------------
    // latest_backup / list_backups
    // -----------------------------------------------------------------------

    #[test]
    fn latest_backup_none_without_backups() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = BackupManager::new();
        assert_eq!(mgr.latest_backup(&dir.path().join("assets")).unwrap(), None);
    }

    #[test]
    fn latest_backup_none_when_parent_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = BackupManager::new();
        let target = dir.path().join("missing").join("assets");
        assert_eq!(mgr.latest_backup(&target).unwrap(), None);
    }

    #[test]
    fn latest_backup_is_lexicographically_greatest() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("assets");
        for stamp in [
            "20250101T000000",
            "20261231T235959",
            "20261231T235959.001",
            "20260606T120000",
        ] {
            std::fs::create_dir(backup_path(&target, stamp)).unwrap();
        }
        // Decoys that must not be picked up.
        std::fs::create_dir(dir.path().join("assets.backup.latest")).unwrap();
        std::fs::create_dir(dir.path().join("other.backup.20991231T000000")).unwrap();

        let mgr = BackupManager::new();
        let latest = mgr.latest_backup(&target).unwrap().unwrap();
        assert_eq!(latest.stamp, "20261231T235959.001");

        let all: Vec<String> = mgr
            .list_backups(&target)
            .unwrap()
            .into_iter()
            .map(|b| b.stamp)
            .collect();
        assert_eq!(
            all,
            vec![
                "20250101T000000",
                "20260606T120000",
                "20261231T235959",
                "20261231T235959.001"
            ]
        );
    }

    #[test]
    fn increasing_clock_produces_increasing_names() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = BackupManager::with_clock(ticking_clock(1_767_225_600));
        let created: Vec<Backup> = (0..3)
            .map(|i| {
                mgr.create_backup(&occupied_target(dir.path(), &format!("v{i}")))
                    .unwrap()
            })
            .collect();
        let listed = mgr.list_backups(&dir.path().join("assets")).unwrap();
        assert_eq!(listed, created);
    }

    // -----------------------------------------------------------------------
    // restore
    // -----------------------------------------------------------------------

    #[test]
    fn restore_moves_backup_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = occupied_target(dir.path(), "original");
        let mgr = BackupManager::with_clock(fixed_clock(0));
        let backup = mgr.create_backup(&target).unwrap();

        mgr.restore(&backup, &target).unwrap();

        assert!(!backup.path.exists());
        assert_eq!(
            std::fs::read_to_string(target.join("marker.txt")).unwrap(),
            "original"
        );
    }

    #[test]
    fn restore_refuses_occupied_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = occupied_target(dir.path(), "original");
        let mgr = BackupManager::with_clock(fixed_clock(0));
        let backup = mgr.create_backup(&target).unwrap();
        occupied_target(dir.path(), "newer");

        let err = mgr.restore(&backup, &target).unwrap_err();

        assert!(matches!(err, ProvisionError::Precondition(_)));
        assert!(backup.path.exists(), "backup must be left untouched");
    }

    #[test]
    fn debug_hides_clock() {
        let mgr = BackupManager::new();
        assert!(format!("{mgr:?}").contains("<fn>"));
    }
}
