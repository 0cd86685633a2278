//! Telemetry records and the line parser that produces them.

use crate::revision::{Revision, FIELD_COUNT};
use std::num::ParseFloatError;
use std::str::Utf8Error;
use thiserror::Error;

// Reasons a received line is dropped instead of forwarded.
#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    /// The raw bytes are not valid UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    Decode(#[from] Utf8Error),
    /// Fewer delimited fields than a record needs.
    #[error("expected at least 5 fields, got {0}")]
    FieldCount(usize),
    /// A field is not a number.
    #[error("field {index} ({text:?}) is not a number: {source}")]
    InvalidField {
        index: usize,
        text: String,
        source: ParseFloatError,
    },
}

/// One decoded line of telemetry, fields kept in wire order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub fields: [f64; FIELD_COUNT],
}

impl TelemetryRecord {
    pub fn new(fields: [f64; FIELD_COUNT]) -> Self {
        Self { fields }
    }

    pub fn voltage(&self) -> f64 {
        self.fields[0]
    }

    pub fn current(&self) -> f64 {
        self.fields[1]
    }

    /// Field 4. Only meaningful for revisions that carry a PWM measurement.
    pub fn pwm(&self) -> f64 {
        self.fields[4]
    }

    pub fn field(&self, index: usize) -> Option<f64> {
        self.fields.get(index).copied()
    }
}

/// Splits a trimmed line on `delimiter` and parses every field.
///
/// All fields are parsed, including any beyond the fifth, so a bad trailing
/// field still rejects the whole line. Only the first five are kept.
pub fn parse_fields(line: &str, delimiter: char) -> Result<TelemetryRecord, LineError> {
    let parts: Vec<&str> = line.trim().split(delimiter).collect();
    if parts.len() < FIELD_COUNT {
        return Err(LineError::FieldCount(parts.len()));
    }

    let mut fields = [0.0; FIELD_COUNT];
    for (index, text) in parts.iter().enumerate() {
        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|source| LineError::InvalidField {
                index,
                text: text.to_string(),
                source,
            })?;
        if let Some(slot) = fields.get_mut(index) {
            *slot = value;
        }
    }

    Ok(TelemetryRecord::new(fields))
}

/// Decodes one raw line into a record for the given revision, descaling
/// voltage and current where the revision sends them as integers.
pub fn decode_line(raw: &[u8], revision: Revision) -> Result<TelemetryRecord, LineError> {
    let text = std::str::from_utf8(raw)?;
    let mut record = parse_fields(text, revision.delimiter())?;

    if let Some((voltage_div, current_div)) = revision.descale() {
        record.fields[0] /= voltage_div;
        record.fields[1] /= current_div;
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_line_keeps_field_order() {
        let record = decode_line(b"120.5,250.0,1,0,75\n", Revision::Rev1).unwrap();
        assert_eq!(record.fields, [120.5, 250.0, 1.0, 0.0, 75.0]);
        assert_eq!(record.voltage(), 120.5);
        assert_eq!(record.current(), 250.0);
        assert_eq!(record.pwm(), 75.0);
    }

    #[test]
    fn semicolon_line_is_descaled() {
        let record = decode_line(b"1205;25000;1;0;4095\r\n", Revision::Rev3).unwrap();
        assert_eq!(record.fields, [120.5, 250.0, 1.0, 0.0, 4095.0]);
    }

    #[test]
    fn short_line_is_rejected() {
        assert_eq!(
            decode_line(b"1,2,3", Revision::Rev1).unwrap_err(),
            LineError::FieldCount(3)
        );
        assert_eq!(
            decode_line(b"", Revision::Rev1).unwrap_err(),
            LineError::FieldCount(1)
        );
    }

    #[test]
    fn wrong_delimiter_counts_as_one_field() {
        assert_eq!(
            decode_line(b"1205;25000;1;0;4095", Revision::Rev1).unwrap_err(),
            LineError::FieldCount(1)
        );
    }

    #[test]
    fn non_numeric_field_rejects_whole_line() {
        let err = decode_line(b"1.0,2.0,x,0,50", Revision::Rev1).unwrap_err();
        assert!(matches!(err, LineError::InvalidField { index: 2, .. }));
    }

    #[test]
    fn bad_extra_field_rejects_whole_line() {
        let err = decode_line(b"1,2,3,4,5,oops", Revision::Rev1).unwrap_err();
        assert!(matches!(err, LineError::InvalidField { index: 5, .. }));
    }

    #[test]
    fn extra_numeric_fields_are_dropped() {
        let record = decode_line(b"1,2,3,4,5,6,7", Revision::Rev2).unwrap();
        assert_eq!(record.fields, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn padded_fields_are_accepted() {
        let record = parse_fields("  1 , 2 ,0, 1 ,99.5 ", ',').unwrap();
        assert_eq!(record.fields, [1.0, 2.0, 0.0, 1.0, 99.5]);
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let err = decode_line(&[0xff, b',', b'1'], Revision::Rev1).unwrap_err();
        assert!(matches!(err, LineError::Decode(_)));
    }

    #[test]
    fn field_accessor_is_bounded() {
        let record = TelemetryRecord::new([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(record.field(3), Some(4.0));
        assert_eq!(record.field(5), None);
    }
}
