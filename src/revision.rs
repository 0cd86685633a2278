//! Firmware revisions and the wire layout each one uses.

use std::fmt;

/// Fixed baud rate shared by every board revision.
pub const BAUD_RATE: u32 = 115_200;

/// Number of fields in a telemetry record.
pub const FIELD_COUNT: usize = 5;

// Description markers used to autodetect the board's serial port.
pub const USB_SERIAL_MARKER: &str = "USB Serial Port";
pub const STLINK_MARKER: &str = "STMicroelectronics STLink Virtual COM Port";

/// How the reader obtains lines from the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The board streams records unsolicited.
    Push,
    /// A line is read only after the presenter requests one.
    Poll,
}

/// Which threshold table applies to the PWM field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmScale {
    /// Duty cycle in percent, 0-100.
    Percent,
    /// Raw 12-bit duty-cycle code, 0-4095.
    DutyCode,
}

/// The three board firmware revisions the monitor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revision {
    /// `v,i,d2,d1,pwm` with PWM in percent, pushed continuously.
    #[default]
    Rev1,
    /// `v,i,f1,f2,f3` with three diagnostic flags, pushed continuously.
    Rev2,
    /// `v_raw;i_raw;d2;d1;pwm_raw`, polled on demand.
    Rev3,
}

impl Revision {
    pub fn delimiter(self) -> char {
        match self {
            Revision::Rev1 | Revision::Rev2 => ',',
            Revision::Rev3 => ';',
        }
    }

    pub fn read_mode(self) -> ReadMode {
        match self {
            Revision::Rev1 | Revision::Rev2 => ReadMode::Push,
            Revision::Rev3 => ReadMode::Poll,
        }
    }

    /// Divisors applied to voltage and current before a record is forwarded.
    pub fn descale(self) -> Option<(f64, f64)> {
        match self {
            Revision::Rev3 => Some((10.0, 100.0)),
            _ => None,
        }
    }

    pub fn port_marker(self) -> &'static str {
        match self {
            Revision::Rev1 | Revision::Rev2 => USB_SERIAL_MARKER,
            Revision::Rev3 => STLINK_MARKER,
        }
    }

    /// PWM table for this revision, or `None` when field 4 is a flag.
    pub fn pwm_scale(self) -> Option<PwmScale> {
        match self {
            Revision::Rev1 => Some(PwmScale::Percent),
            Revision::Rev2 => None,
            Revision::Rev3 => Some(PwmScale::DutyCode),
        }
    }

    /// Record indices of the diagnostic flags, in display order.
    ///
    /// Revisions 1 and 3 send `d2` before `d1`, so "Diag 1" is field 3.
    pub fn flag_fields(self) -> &'static [(&'static str, usize)] {
        match self {
            Revision::Rev1 | Revision::Rev3 => &[("Diag 1", 3), ("Diag 2", 2)],
            Revision::Rev2 => &[("Flag 1", 2), ("Flag 2", 3), ("Flag 3", 4)],
        }
    }
}

impl TryFrom<u8> for Revision {
    type Error = u8;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Revision::Rev1),
            2 => Ok(Revision::Rev2),
            3 => Ok(Revision::Rev3),
            other => Err(other),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Rev1 => write!(f, "revision 1"),
            Revision::Rev2 => write!(f, "revision 2"),
            Revision::Rev3 => write!(f, "revision 3"),
        }
    }
}
