//! # Hall Sensor Monitor Library
//!
//! Core of a desktop monitor for a hall-sensor driver board. The board sends
//! one telemetry line at a time over a serial link (voltage, current, two or
//! three diagnostic flags and, on most revisions, a PWM measurement). This
//! library finds the board's port, reads and parses those lines on a
//! background thread, classifies each record against the revision's
//! thresholds and draws the result as a small terminal dashboard.

pub mod classify;
pub mod config;
pub mod crash;
pub mod dashboard;
pub mod discovery;
pub mod reader;
pub mod record;
pub mod revision;
pub mod schedule;

pub use classify::{classify, ClassificationResult, DutyBand, FlagStatus, PercentBand, PwmClass};
pub use config::Settings;
pub use dashboard::Dashboard;
pub use reader::{spawn_reader, ReaderError, ReaderLink, RecordSink, TelemetryReader};
pub use record::{decode_line, LineError, TelemetryRecord};
pub use revision::{ReadMode, Revision};
pub use schedule::Schedule;
