//! Terminal dashboard: one header row, one value row, colored by status.

use crate::classify::{classify, ClassificationResult, DutyBand, FlagStatus, PercentBand, PwmClass};
use crate::record::TelemetryRecord;
use crate::revision::{PwmScale, Revision};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

pub const TITLE: &str = "Hall Sensor Application";

const VOLTAGE_COLOR: Color = Color::LightBlue;
const CURRENT_COLOR: Color = Color::LightGreen;
const PWM_COLOR: Color = Color::Magenta;
const FLAG_COLOR: Color = Color::LightRed;

pub fn flag_color(status: FlagStatus) -> Color {
    match status {
        FlagStatus::Fault => Color::Red,
        FlagStatus::Normal => Color::Green,
    }
}

/// Color for a PWM class. `None` leaves the current color in place.
pub fn pwm_color(class: PwmClass) -> Option<Color> {
    match class {
        PwmClass::Percent(band) => Some(match band {
            PercentBand::Critical => Color::Red,
            PercentBand::Low => Color::Gray,
            PercentBand::Medium => Color::LightBlue,
            PercentBand::High => Color::Cyan,
            PercentBand::Full => Color::Green,
        }),
        PwmClass::Duty(band) => match band {
            DutyBand::Duty20 => Some(Color::Red),
            DutyBand::Duty50 => Some(Color::Yellow),
            DutyBand::Duty80 => Some(Color::LightBlue),
            DutyBand::NoProblem => Some(Color::Green),
            DutyBand::Unclassified => None,
        },
    }
}

/// Formats a reading. Whole numbers keep one decimal place (`250.0`).
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// The most recent record and what it classified to.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub record: TelemetryRecord,
    pub classification: ClassificationResult,
}

/// Display state owned by the presentation thread.
///
/// Holds only the latest record: a new record replaces the old one and a
/// refresh without news redraws the same snapshot.
pub struct Dashboard {
    revision: Revision,
    latest: Option<Snapshot>,
    pwm_color: Color,
    updates: u64,
}

impl Dashboard {
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            latest: None,
            pwm_color: PWM_COLOR,
            updates: 0,
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Classifies `record` and makes it the snapshot to draw.
    pub fn update(&mut self, record: TelemetryRecord) {
        let classification = classify(&record, self.revision);
        if let Some(color) = classification.pwm.and_then(pwm_color) {
            self.pwm_color = color;
        }
        self.latest = Some(Snapshot {
            record,
            classification,
        });
        self.updates += 1;
    }

    fn headers(&self) -> Vec<(String, Color)> {
        let mut headers = match self.revision {
            Revision::Rev1 => vec![
                ("Voltage [mV]".to_string(), VOLTAGE_COLOR),
                ("Current [mA]".to_string(), CURRENT_COLOR),
                ("PWM [%]".to_string(), PWM_COLOR),
            ],
            Revision::Rev2 => vec![
                ("Voltage".to_string(), VOLTAGE_COLOR),
                ("Current".to_string(), CURRENT_COLOR),
            ],
            Revision::Rev3 => vec![
                ("Voltage".to_string(), VOLTAGE_COLOR),
                ("Current".to_string(), CURRENT_COLOR),
                ("PWM".to_string(), PWM_COLOR),
            ],
        };
        for &(label, _) in self.revision.flag_fields() {
            headers.push((label.to_string(), FLAG_COLOR));
        }
        headers
    }

    fn values(&self) -> Vec<(String, Color)> {
        let Some(snapshot) = &self.latest else {
            return self
                .headers()
                .into_iter()
                .map(|(_, color)| ("-".to_string(), color))
                .collect();
        };

        let record = &snapshot.record;
        let mut values = vec![
            (format_value(record.voltage()), VOLTAGE_COLOR),
            (format_value(record.current()), CURRENT_COLOR),
        ];
        if snapshot.classification.pwm.is_some() {
            values.push((format_value(record.pwm()), self.pwm_color));
        }
        for flag in &snapshot.classification.flags {
            values.push((format_value(flag.value), flag_color(flag.status)));
        }
        values
    }

    fn footer(&self) -> Vec<Line<'static>> {
        let legend = match self.revision {
            Revision::Rev2 => "Flag 1, 2, 3 - diagnostics (0 - false, 1 - true)",
            _ => "Diag 1, 2 - diagnostics (0 - false, 1 - true)",
        };
        let mut lines = vec![Line::from(legend)];

        if self.revision.pwm_scale() == Some(PwmScale::DutyCode) {
            let status = match self.latest.as_ref().and_then(|s| s.classification.pwm) {
                Some(PwmClass::Duty(band)) => band.label(),
                _ => "-",
            };
            lines.push(Line::from(format!("PWM: {}", status)));
        }
        lines.push(Line::from("Press q to quit"));
        lines
    }

    /// One line of text for the current snapshot, for non-graphical output.
    pub fn describe(&self) -> Option<String> {
        let snapshot = self.latest.as_ref()?;
        let headers = self.headers();
        let values = self.values();
        let mut parts: Vec<String> = headers
            .iter()
            .zip(values.iter())
            .map(|((label, _), (value, _))| format!("{}={}", label, value))
            .collect();

        for flag in &snapshot.classification.flags {
            if flag.status == FlagStatus::Fault {
                parts.push(format!("{} FAULT", flag.label));
            }
        }
        match snapshot.classification.pwm {
            Some(PwmClass::Percent(band)) => parts.push(format!("PWM band {:?}", band)),
            Some(PwmClass::Duty(band)) => parts.push(band.label().to_string()),
            None => {}
        }
        Some(parts.join("  "))
    }

    pub fn render(&self, frame: &mut Frame) {
        let block = Block::default()
            .title(format!(" {} ({}) ", TITLE, self.revision))
            .borders(Borders::ALL);
        let inner = block.inner(frame.size());
        frame.render_widget(block, frame.size());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let styled = |cells: Vec<(String, Color)>| {
            Row::new(cells.into_iter().map(|(text, color)| {
                Cell::from(text).style(Style::default().fg(Color::Black).bg(color))
            }))
        };

        let headers = self.headers();
        let widths = vec![Constraint::Ratio(1, headers.len() as u32); headers.len()];
        let table = Table::new(vec![styled(self.values())], widths)
            .header(styled(headers).bottom_margin(1));
        frame.render_widget(table, chunks[0]);

        frame.render_widget(Paragraph::new(self.footer()), chunks[1]);
    }
}
