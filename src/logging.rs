//! Debug log to a file. The terminal owns stdout, so nothing is printed there.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Opens (truncates) the log file and turns logging on. `verbose` also enables
/// per-event detail (every click and spawn).
pub fn init(path: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    if let Ok(mut slot) = LOG_FILE.lock() {
        *slot = Some(file);
    }
    VERBOSE.store(verbose, Ordering::Relaxed);
    Ok(())
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Appends one line. Write errors are dropped; logging never takes the game down.
pub fn write_line(level: &str, message: &str) {
    if let Ok(mut slot) = LOG_FILE.lock() {
        if let Some(file) = slot.as_mut() {
            let _ = writeln!(file, "[{level}] {message}");
            let _ = file.flush();
        }
    }
}

/// Lifecycle messages (start, restart, game over). Written whenever a log file is open.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::write_line("info", &format!($($arg)*))
    };
}

/// Per-event detail, only with `--verbose`.
#[macro_export]
macro_rules! vlog {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            $crate::logging::write_line("debug", &format!($($arg)*));
        }
    };
}
