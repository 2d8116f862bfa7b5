use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,atp_terminal=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// File logging for the terminal UI, which owns stdout. Returns the writer guard,
/// which must stay alive for the process; `None` when the directory is unusable.
pub fn init_file_logging(log_dir: &Path) -> Option<WorkerGuard> {
    // rolling::daily panics when it cannot create the file, so check writability first.
    fs::create_dir_all(log_dir).ok()?;
    let probe = log_dir.join(".write_test");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
        .ok()?;
    let _ = fs::remove_file(&probe);

    let appender = tracing_appender::rolling::daily(log_dir, "atp_terminal.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .ok()?;
    Some(guard)
}

/// Stderr logging for one-shot command line tools.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
