//! Subscriber setup: human-readable console output plus an optional JSON log
//! file rotated by size. Both outputs share the per-crate `levels` table.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;

type LogFile = Mutex<FileRotate<AppendTimestamp>>;

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
///
/// A log file that cannot be opened is reported on stderr and skipped, so the
/// server still starts with console output only.
pub fn init_logging(cfg: &LoggingConfig, home_dir: &Path) {
    // Route `log` records (sqlx, hyper internals) through tracing.
    let _ = tracing_log::LogTracer::init();

    let console = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(targets(&cfg.console_level, cfg));

    let file = open_log_file(cfg, home_dir).map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .with_filter(targets(&cfg.file_level, cfg))
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}

/// Level names are case-insensitive. "none" is accepted as "off", anything
/// unrecognised falls back to info.
fn parse_level(raw: &str) -> LevelFilter {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return LevelFilter::OFF;
    }
    raw.parse().unwrap_or(LevelFilter::INFO)
}

fn targets(default_level: &str, cfg: &LoggingConfig) -> Targets {
    cfg.levels
        .iter()
        .fold(Targets::new().with_default(parse_level(default_level)), |t, (krate, level)| {
            t.with_target(krate.clone(), parse_level(level))
        })
}

fn log_path(file: &str, home_dir: &Path) -> Option<PathBuf> {
    let file = file.trim();
    if file.is_empty() {
        return None;
    }
    Some(home_dir.join(file))
}

fn open_log_file(cfg: &LoggingConfig, home_dir: &Path) -> Option<LogFile> {
    let path = log_path(&cfg.file, home_dir)?;
    if parse_level(&cfg.file_level) == LevelFilter::OFF {
        return None;
    }

    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {}: {e}", dir.display());
            return None;
        }
    }

    let max_bytes = usize::try_from(cfg.max_size_mb.max(1).saturating_mul(1024 * 1024))
        .unwrap_or(usize::MAX);
    Some(Mutex::new(FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(cfg.max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )))
}
