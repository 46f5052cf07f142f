//! Global tracing subscriber: coloured console output plus a per-command log file.
//!
//! [`Logger`](super::Logger) emits stage headers and dry-run lines as `INFO`
//! events under dedicated targets.  Both layers here classify each event into
//! an [`EventKind`] first and only then decide how to render it.
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Environment variable that overrides the console filter.
pub const LOG_ENV: &str = "ASSETCTL_LOG";

/// Target used for stage headers.
pub(super) const STAGE_TARGET: &str = "assetctl::stage";
/// Target used for dry-run descriptions.
pub(super) const DRY_RUN_TARGET: &str = "assetctl::dry_run";

/// How an event is presented, independent of where it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Stage,
    DryRun,
    Error,
    Warn,
    Info,
    Debug,
}

impl EventKind {
    fn of(event: &Event<'_>) -> Self {
        let meta = event.metadata();
        match (*meta.level(), meta.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Plain-text prefix used in the log file.
    const fn file_prefix(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::DryRun => "    [dry run] ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Info => "    ",
            Self::Debug => "    [debug] ",
        }
    }
}

/// The formatted `message` field of an event.
fn message_of(event: &Event<'_>) -> String {
    struct Message(String);

    impl Visit for Message {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message(String::new());
    event.record(&mut message);
    message.0
}

/// Layer appending every event to `<cache>/assetctl/<command>.log`.
///
/// The file is truncated at startup and begins with a header naming the
/// version, the subcommand and the start time.  Lines carry a UTC time and
/// no escape codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<File>,
}

impl FileLayer {
    /// Start a fresh log file for `command`.
    ///
    /// Returns `None` if the file cannot be written; the run then logs to the
    /// console only.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version = crate::commands::version::version();
        let rule = "=".repeat(42);
        let header = format!(
            "{rule}\nassetctl {version} {command} {}\n{rule}\n",
            format_utc_datetime()
        );
        std::fs::write(&path, header).ok()?;
        let file = OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self::from_file(file))
    }

    const fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let kind = EventKind::of(event);
        let line = format!(
            "[{}] {}{}",
            format_utc_time(),
            kind.file_prefix(),
            strip_ansi(&message_of(event))
        );
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console rendering: bold stage arrows, a yellow dry-run tag, coloured
/// warning and error labels, dimmed debug lines.
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = message_of(event);
        match EventKind::of(event) {
            EventKind::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            EventKind::DryRun => writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            EventKind::Error => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            EventKind::Warn => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            EventKind::Info => writeln!(writer, "  {msg}"),
            EventKind::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the global subscriber for a run of `command`.
///
/// Warnings and errors go to stderr, everything else to stdout.  The console
/// shows `info` and up (`debug` with `--verbose`) unless [`LOG_ENV`] holds an
/// [`EnvFilter`] directive; the log file always receives `debug` and up.
/// Call once, before the first log line.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
    };

    let to_terminal = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console = tracing_subscriber::fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(to_terminal)
        .with_filter(console_filter(verbose, std::env::var(LOG_ENV).ok().as_deref()));

    let file = FileLayer::new(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}

/// A valid directive wins; otherwise `--verbose` picks `debug` over `info`.
fn console_filter(verbose: bool, directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}
