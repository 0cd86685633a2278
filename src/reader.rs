//! Background telemetry reader.
//!
//! The reader owns the serial connection and is the only code that reads from
//! it. Parsed records leave the reader thread through a single-slot channel;
//! when the slot is still occupied the new record is dropped.

use crate::record::{decode_line, LineError, TelemetryRecord};
use crate::revision::{ReadMode, Revision, BAUD_RATE};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Driver-level read timeout. Timeouts are retried, so reads never give up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial connection lost: {0}")]
    Io(#[from] io::Error),
    #[error("telemetry reader thread panicked")]
    Panicked,
}

/// Receives every record the reader parses.
pub trait RecordSink {
    /// Returns `false` once nobody is listening, which stops the reader.
    fn deliver(&mut self, record: TelemetryRecord) -> bool;
}

impl<F: FnMut(TelemetryRecord)> RecordSink for F {
    fn deliver(&mut self, record: TelemetryRecord) -> bool {
        self(record);
        true
    }
}

/// Sending half of the single-slot hand-off to the presentation thread.
pub struct SlotSender {
    tx: SyncSender<TelemetryRecord>,
}

impl RecordSink for SlotSender {
    fn deliver(&mut self, record: TelemetryRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Display has not taken the previous record, dropping this one");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Creates the depth-1 record channel.
pub fn record_slot() -> (SlotSender, Receiver<TelemetryRecord>) {
    let (tx, rx) = sync_channel(1);
    (SlotSender { tx }, rx)
}

/// Splits a byte stream into newline-terminated lines.
///
/// Bytes received before a read timeout stay buffered, so a timeout in the
/// middle of a line does not cut it in two.
pub struct LineSource<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Blocks until a full line is available. `Ok(None)` means end of stream.
    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            match self.inner.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
                Ok(_) => {
                    if self.pending.last() == Some(&b'\n') {
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                    // Stream ended mid-line; the next call returns what is left.
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// Counters reported when the reader stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub lines: u64,
    pub records: u64,
    pub malformed: u64,
}

/// Reads, parses and forwards telemetry for one board revision.
pub struct TelemetryReader<R> {
    lines: LineSource<R>,
    revision: Revision,
    stats: ReaderStats,
}

impl<R: BufRead> TelemetryReader<R> {
    pub fn new(source: R, revision: Revision) -> Self {
        Self {
            lines: LineSource::new(source),
            revision,
            stats: ReaderStats::default(),
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Reads one line and forwards it if it parses.
    ///
    /// Returns `Ok(false)` when the stream ended or the sink went away.
    pub fn step(&mut self, sink: &mut impl RecordSink) -> Result<bool, ReaderError> {
        let raw = match self.lines.next_line()? {
            Some(raw) => raw,
            None => {
                log::info!("Serial stream closed");
                return Ok(false);
            }
        };
        self.stats.lines += 1;

        match decode_line(&raw, self.revision) {
            Ok(record) => {
                self.stats.records += 1;
                Ok(sink.deliver(record))
            }
            Err(err) => {
                self.stats.malformed += 1;
                match err {
                    LineError::FieldCount(_) => log::debug!("Skipping line: {}", err),
                    _ => log::warn!("Skipping line: {}", err),
                }
                Ok(true)
            }
        }
    }

    /// Push mode: forwards every line the board sends until the stream ends.
    pub fn run_push(&mut self, sink: &mut impl RecordSink) -> Result<(), ReaderError> {
        while self.step(sink)? {}
        Ok(())
    }

    /// Poll mode: reads exactly one line per request, until the requesting
    /// side hangs up.
    pub fn run_poll(
        &mut self,
        requests: &Receiver<()>,
        sink: &mut impl RecordSink,
    ) -> Result<(), ReaderError> {
        for () in requests.iter() {
            if !self.step(sink)? {
                break;
            }
        }
        Ok(())
    }
}

/// Opens the board's serial port at the fixed baud rate, 8N1.
pub fn open_port(port: &str) -> Result<BufReader<Box<dyn SerialPort>>, ReaderError> {
    let connection = serialport::new(port, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| ReaderError::Open {
            port: port.to_string(),
            source,
        })?;

    log::info!("Opened {} at {} baud", port, BAUD_RATE);
    Ok(BufReader::new(connection))
}

/// Presentation-side handle to a running reader thread.
pub struct ReaderLink {
    records: Receiver<TelemetryRecord>,
    requests: Option<SyncSender<()>>,
    handle: JoinHandle<Result<ReaderStats, ReaderError>>,
}

impl ReaderLink {
    /// Asks the reader for one line. A no-op in push mode, and while an
    /// earlier request is still pending.
    pub fn request(&self) {
        if let Some(requests) = &self.requests {
            match requests.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    log::debug!("Request dropped, reader has stopped")
                }
            }
        }
    }

    /// Takes the record waiting in the slot, if any. `Err` once the reader
    /// thread has exited and the slot is empty.
    pub fn try_take(&self) -> Result<Option<TelemetryRecord>, TryRecvError> {
        match self.records.try_recv() {
            Ok(record) => Ok(Some(record)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the reader thread and returns how it ended.
    pub fn join(self) -> Result<ReaderStats, ReaderError> {
        drop(self.requests);
        drop(self.records);
        self.handle.join().map_err(|_| ReaderError::Panicked)?
    }
}

/// Moves `reader` onto its own thread and wires it to the presentation side.
pub fn spawn_reader<R>(mut reader: TelemetryReader<R>) -> io::Result<ReaderLink>
where
    R: BufRead + Send + 'static,
{
    let (mut sink, records) = record_slot();
    let (request_tx, request_rx) = match reader.revision().read_mode() {
        ReadMode::Push => (None, None),
        ReadMode::Poll => {
            let (tx, rx) = sync_channel(1);
            (Some(tx), Some(rx))
        }
    };

    let handle = thread::Builder::new()
        .name("telemetry-reader".into())
        .spawn(move || {
            let result = match &request_rx {
                Some(requests) => reader.run_poll(requests, &mut sink),
                None => reader.run_push(&mut sink),
            };
            let stats = reader.stats();
            log::info!(
                "Reader stopped after {} lines ({} records, {} malformed)",
                stats.lines,
                stats.records,
                stats.malformed
            );
            result.map(|()| stats)
        })?;

    Ok(ReaderLink {
        records,
        requests: request_tx,
        handle,
    })
}
