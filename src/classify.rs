//! Threshold classification of telemetry records.
//!
//! Every record is classified on its own: no history, no hysteresis.

use crate::record::TelemetryRecord;
use crate::revision::{PwmScale, Revision};

/// Full-scale 12-bit duty-cycle code.
pub const DUTY_CODE_MAX: f64 = 4095.0;

// Half-width of the duty-code windows, relative to the window center.
const DUTY_WINDOW: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStatus {
    Fault,
    Normal,
}

impl FlagStatus {
    /// Exactly zero is a fault; anything else, NaN included, is normal.
    pub fn from_value(value: f64) -> Self {
        if value == 0.0 {
            FlagStatus::Fault
        } else {
            FlagStatus::Normal
        }
    }
}

/// Bands of the percentage PWM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentBand {
    /// `<= 20`
    Critical,
    /// `(20, 50]`
    Low,
    /// `(50, 80]`
    Medium,
    /// `(80, 99]`
    High,
    /// Everything above 99, and values no other band accepts.
    Full,
}

impl PercentBand {
    pub fn from_percent(pwm: f64) -> Self {
        if pwm <= 20.0 {
            PercentBand::Critical
        } else if pwm > 20.0 && pwm <= 50.0 {
            PercentBand::Low
        } else if pwm > 50.0 && pwm <= 80.0 {
            PercentBand::Medium
        } else if pwm > 80.0 && pwm <= 99.0 {
            PercentBand::High
        } else {
            PercentBand::Full
        }
    }
}

/// Bands of the raw duty-code PWM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyBand {
    /// Around 819 (20 % of full scale).
    Duty20,
    /// Around 2048 (50 %).
    Duty50,
    /// Around 3276 (80 %).
    Duty80,
    /// Exactly 4095.
    NoProblem,
    /// Falls between the windows. No band applies.
    Unclassified,
}

impl DutyBand {
    const WINDOWS: [(f64, DutyBand); 3] = [
        (819.0, DutyBand::Duty20),
        (2048.0, DutyBand::Duty50),
        (3276.0, DutyBand::Duty80),
    ];

    pub fn from_code(code: f64) -> Self {
        if code == DUTY_CODE_MAX {
            return DutyBand::NoProblem;
        }
        Self::WINDOWS
            .iter()
            .find(|(center, _)| {
                let low = center * (1.0 - DUTY_WINDOW);
                let high = center * (1.0 + DUTY_WINDOW);
                (low..=high).contains(&code)
            })
            .map(|&(_, band)| band)
            .unwrap_or(DutyBand::Unclassified)
    }

    pub fn label(self) -> &'static str {
        match self {
            DutyBand::Duty20 => "20% PWM Duty Cycle",
            DutyBand::Duty50 => "50% PWM Duty Cycle",
            DutyBand::Duty80 => "80% PWM Duty Cycle",
            DutyBand::NoProblem => "No PWM Duty Cycle problem",
            DutyBand::Unclassified => "Unclassified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmClass {
    Percent(PercentBand),
    Duty(DutyBand),
}

impl PwmClass {
    pub fn from_value(scale: PwmScale, pwm: f64) -> Self {
        match scale {
            PwmScale::Percent => PwmClass::Percent(PercentBand::from_percent(pwm)),
            PwmScale::DutyCode => PwmClass::Duty(DutyBand::from_code(pwm)),
        }
    }
}

/// A diagnostic flag as it is shown, with the value it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagReading {
    pub label: &'static str,
    pub value: f64,
    pub status: FlagStatus,
}

/// Display state derived from one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Flags in display order.
    pub flags: Vec<FlagReading>,
    /// `None` for revisions without a PWM field.
    pub pwm: Option<PwmClass>,
}

pub fn classify(record: &TelemetryRecord, revision: Revision) -> ClassificationResult {
    let flags = revision
        .flag_fields()
        .iter()
        .map(|&(label, index)| {
            let value = record.fields[index];
            FlagReading {
                label,
                value,
                status: FlagStatus::from_value(value),
            }
        })
        .collect();

    let pwm = revision
        .pwm_scale()
        .map(|scale| PwmClass::from_value(scale, record.pwm()));

    ClassificationResult { flags, pwm }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Flags ---

    #[test]
    fn zero_flag_is_fault() {
        assert_eq!(FlagStatus::from_value(0.0), FlagStatus::Fault);
        assert_eq!(FlagStatus::from_value(-0.0), FlagStatus::Fault);
    }

    #[test]
    fn nonzero_flag_is_normal() {
        for value in [1.0, -1.0, 0.001, 42.0, f64::NAN] {
            assert_eq!(FlagStatus::from_value(value), FlagStatus::Normal);
        }
    }

    #[test]
    fn flags_are_independent_of_other_fields() {
        let a = classify(&TelemetryRecord::new([0.0, 0.0, 1.0, 0.0, 0.0]), Revision::Rev1);
        let b = classify(&TelemetryRecord::new([9.0, 9.0, 1.0, 0.0, 99.0]), Revision::Rev1);
        assert_eq!(a.flags, b.flags);
    }

    // --- Percent table ---

    #[test]
    fn percent_band_boundaries() {
        assert_eq!(PercentBand::from_percent(0.0), PercentBand::Critical);
        assert_eq!(PercentBand::from_percent(20.0), PercentBand::Critical);
        assert_eq!(PercentBand::from_percent(21.0), PercentBand::Low);
        assert_eq!(PercentBand::from_percent(50.0), PercentBand::Low);
        assert_eq!(PercentBand::from_percent(51.0), PercentBand::Medium);
        assert_eq!(PercentBand::from_percent(80.0), PercentBand::Medium);
        assert_eq!(PercentBand::from_percent(81.0), PercentBand::High);
        assert_eq!(PercentBand::from_percent(99.0), PercentBand::High);
        assert_eq!(PercentBand::from_percent(100.0), PercentBand::Full);
    }

    #[test]
    fn percent_values_between_integers_follow_comparisons() {
        assert_eq!(PercentBand::from_percent(20.5), PercentBand::Low);
        assert_eq!(PercentBand::from_percent(99.5), PercentBand::Full);
        assert_eq!(PercentBand::from_percent(-3.0), PercentBand::Critical);
        assert_eq!(PercentBand::from_percent(f64::NAN), PercentBand::Full);
    }

    // --- Duty-code table ---

    #[test]
    fn full_scale_code_has_no_problem() {
        assert_eq!(DutyBand::from_code(4095.0), DutyBand::NoProblem);
        assert_eq!(DutyBand::NoProblem.label(), "No PWM Duty Cycle problem");
    }

    #[test]
    fn code_just_below_full_scale_is_unclassified() {
        assert_eq!(DutyBand::from_code(4094.0), DutyBand::Unclassified);
    }

    #[test]
    fn duty_windows_match_their_centers() {
        assert_eq!(DutyBand::from_code(819.0), DutyBand::Duty20);
        assert_eq!(DutyBand::from_code(835.0), DutyBand::Duty20);
        assert_eq!(DutyBand::from_code(803.0), DutyBand::Duty20);
        assert_eq!(DutyBand::from_code(2048.0), DutyBand::Duty50);
        assert_eq!(DutyBand::from_code(2008.0), DutyBand::Duty50);
        assert_eq!(DutyBand::from_code(3276.0), DutyBand::Duty80);
        assert_eq!(DutyBand::from_code(3341.0), DutyBand::Duty80);
    }

    #[test]
    fn codes_between_windows_are_unclassified() {
        for code in [0.0, 700.0, 802.0, 836.0, 1500.0, 2007.0, 2090.0, 3000.0, 3400.0] {
            assert_eq!(DutyBand::from_code(code), DutyBand::Unclassified, "code {}", code);
        }
    }

    // --- Whole records ---

    #[test]
    fn comma_scenario_classifies_diag_fault_and_medium_pwm() {
        let record = TelemetryRecord::new([120.5, 250.0, 1.0, 0.0, 75.0]);
        let result = classify(&record, Revision::Rev1);

        assert_eq!(result.flags[0].label, "Diag 1");
        assert_eq!(result.flags[0].value, 0.0);
        assert_eq!(result.flags[0].status, FlagStatus::Fault);
        assert_eq!(result.flags[1].label, "Diag 2");
        assert_eq!(result.flags[1].status, FlagStatus::Normal);
        assert_eq!(result.pwm, Some(PwmClass::Percent(PercentBand::Medium)));
    }

    #[test]
    fn semicolon_scenario_classifies_no_problem() {
        let record = TelemetryRecord::new([120.5, 250.0, 1.0, 0.0, 4095.0]);
        let result = classify(&record, Revision::Rev3);
        assert_eq!(result.pwm, Some(PwmClass::Duty(DutyBand::NoProblem)));
        assert_eq!(result.flags[0].status, FlagStatus::Fault);
    }

    #[test]
    fn triple_flag_revision_has_no_pwm() {
        let record = TelemetryRecord::new([1.0, 2.0, 0.0, 1.0, 0.0]);
        let result = classify(&record, Revision::Rev2);
        let statuses: Vec<FlagStatus> = result.flags.iter().map(|f| f.status).collect();
        assert_eq!(statuses, vec![FlagStatus::Fault, FlagStatus::Normal, FlagStatus::Fault]);
        assert_eq!(result.pwm, None);
    }

    #[test]
    fn classification_is_deterministic() {
        let record = TelemetryRecord::new([1.0, 2.0, 1.0, 1.0, 2050.0]);
        assert_eq!(classify(&record, Revision::Rev3), classify(&record, Revision::Rev3));
    }
}
