//! Runtime settings for the monitor.

use crate::crash::DEFAULT_CRASH_LOG;
use crate::revision::Revision;
use std::path::PathBuf;
use std::time::Duration;

/// How often a polled board is asked for a new record.
pub const REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// How often the display is redrawn from the latest record.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_LOG_FILE: &str = "monitor.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub revision: Revision,
    /// Substring the port description must contain.
    pub port_marker: String,
    pub crash_log: PathBuf,
    /// Where log output goes while the dashboard owns the terminal.
    pub log_file: PathBuf,
    /// Print records instead of drawing the dashboard.
    pub headless: bool,
    pub request_interval: Duration,
    pub refresh_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Revision::default())
    }
}

impl Settings {
    /// Defaults for a board revision.
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            port_marker: revision.port_marker().to_string(),
            crash_log: PathBuf::from(DEFAULT_CRASH_LOG),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            headless: false,
            request_interval: REQUEST_INTERVAL,
            refresh_interval: REFRESH_INTERVAL,
        }
    }

    /// Match a different port description.
    pub fn with_marker(mut self, marker: &str) -> Self {
        self.port_marker = marker.to_string();
        self
    }

    pub fn with_crash_log(mut self, path: PathBuf) -> Self {
        self.crash_log = path;
        self
    }

    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = path;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::{STLINK_MARKER, USB_SERIAL_MARKER};

    #[test]
    fn defaults_follow_revision() {
        let settings = Settings::default();
        assert_eq!(settings.revision, Revision::Rev1);
        assert_eq!(settings.port_marker, USB_SERIAL_MARKER);
        assert_eq!(settings.crash_log, PathBuf::from("error_log.txt"));
        assert_eq!(settings.request_interval, Duration::from_millis(250));
        assert_eq!(settings.refresh_interval, Duration::from_millis(100));

        assert_eq!(Settings::new(Revision::Rev3).port_marker, STLINK_MARKER);
    }

    #[test]
    fn builder_overrides() {
        let settings = Settings::new(Revision::Rev2)
            .with_marker("CP2102")
            .with_crash_log(PathBuf::from("/tmp/crash.txt"))
            .headless(true);

        assert_eq!(settings.port_marker, "CP2102");
        assert_eq!(settings.crash_log, PathBuf::from("/tmp/crash.txt"));
        assert!(settings.headless);
        assert_eq!(settings.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }
}
