//! Log file location, escape stripping and timestamps.
use std::ffi::OsString;
use std::path::PathBuf;

/// Directory under the cache root that holds one log file per subcommand.
const APP_DIR: &str = "assetctl";

/// Remove terminal escape sequences so the log file holds plain text.
///
/// A CSI sequence (`ESC [` ... final byte in `@`..=`~`) is dropped whole;
/// any other escape drops the `ESC` and the single character after it.
pub(super) fn strip_ansi(s: &str) -> String {
    enum State {
        Text,
        Escape,
        Csi,
    }

    let mut state = State::Text;
    s.chars()
        .filter(|&c| match state {
            State::Text if c == '\x1b' => {
                state = State::Escape;
                false
            }
            State::Text => true,
            State::Escape => {
                state = if c == '[' { State::Csi } else { State::Text };
                false
            }
            State::Csi => {
                if ('@'..='~').contains(&c) {
                    state = State::Text;
                }
                false
            }
        })
        .collect()
}

/// Pick the cache root: a non-empty `XDG_CACHE_HOME`, else `<home>/.cache`,
/// else `./.cache`.
fn cache_root(xdg_cache_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match xdg_cache_home.filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => home
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(".cache"),
    }
}

/// `<cache root>/assetctl`, created on first use.
///
/// Returns `None` when the directory cannot be created; logging to file is
/// then skipped rather than failing the run.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    let dir = cache_root(std::env::var_os("XDG_CACHE_HOME"), home).join(APP_DIR);
    std::fs::create_dir_all(&dir).ok().map(|()| dir)
}

/// Log file for one subcommand, e.g. `~/.cache/assetctl/install.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(command).with_extension("log"))
}

/// Current UTC time for the run header, `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%F %T").to_string()
}

/// Current UTC time for a log line, `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%T").to_string()
}
