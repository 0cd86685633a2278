//! Process-wide error boundary.
//!
//! Anything that escapes normal error handling, panics on any thread
//! included, ends up in a crash log before the process exits with status 1.

use chrono::Local;
use std::backtrace::Backtrace;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

pub const DEFAULT_CRASH_LOG: &str = "error_log.txt";

/// Overwrites `path` with a timestamped report.
pub fn write_report(path: &Path, summary: &str, detail: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "{} {} crashed at {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        Local::now().to_rfc3339()
    )?;
    writeln!(file, "{}", summary)?;
    if !detail.is_empty() {
        writeln!(file)?;
        writeln!(file, "{}", detail)?;
    }
    file.sync_all()
}

/// Records an error that reached the top of `main`: its message, the chain
/// of causes and the backtrace captured where the error was created (when
/// `RUST_BACKTRACE` enables capture).
pub fn report(path: &Path, error: &anyhow::Error) -> io::Result<()> {
    write_report(path, &error.to_string(), &format!("{:?}", error))
}

/// Installs the panic hook. `before_exit` runs after the report is written,
/// e.g. to give the terminal back.
pub fn install<F>(path: PathBuf, before_exit: F)
where
    F: Fn() + Send + Sync + 'static,
{
    panic::set_hook(Box::new(move |info| {
        let current = thread::current();
        let summary = format!("thread '{}' {}", current.name().unwrap_or("<unnamed>"), info);
        let backtrace = Backtrace::force_capture();
        let written = write_report(&path, &summary, &backtrace.to_string());

        before_exit();
        match written {
            Ok(()) => eprintln!("[FATAL] {}. Details written to {}", summary, path.display()),
            Err(e) => eprintln!("[FATAL] {}. Could not write {}: {}", summary, path.display(), e),
        }
        process::exit(1);
    }));
}
