use core::fmt::{self, Display, Write};

use heapless::String;
use log::warn;

use crate::battery::DerivedMetrics;
use crate::error::MonitorError;
use crate::lcd1602::LCD_COLUMNS;
use crate::sensors::SensorSample;

/// One display row
pub type Line = String<LCD_COLUMNS>;

/// Placeholder for the classifier and state-of-health fields
const PLACEHOLDER: &str = "OFF";

/// A two row character display
pub trait CharacterDisplay {
    type Error: Display;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Writes text starting at column 0 of `row`
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error>;
}

/// The four rotating status pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Electrical,
    Climate,
    Charge,
    Discharge,
}

impl Page {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Page for any counter value, wrapping modulo the page count
    pub fn from_index(index: usize) -> Page {
        match index % Self::COUNT {
            0 => Page::Electrical,
            1 => Page::Climate,
            2 => Page::Charge,
            _ => Page::Discharge,
        }
    }

    pub fn next(self) -> Page {
        Page::from_index(self.index() + 1)
    }
}

/// Top and bottom row of a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLines {
    pub top: Line,
    pub bottom: Line,
}

/// fmt::Write sink that keeps the first 16 characters and drops the rest
struct Clipped {
    line: Line,
    clipped: bool,
}

impl Write for Clipped {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.line.push(ch).is_err() {
                self.clipped = true;
                break;
            }
        }
        Ok(())
    }
}

/// Formats a single row, clipping anything past the display width
pub fn format_line(args: fmt::Arguments<'_>) -> Line {
    let mut out = Clipped {
        line: Line::new(),
        clipped: false,
    };
    // Clipped never fails, so neither does the formatting
    let _ = out.write_fmt(args);
    if out.clipped {
        warn!("line clipped to {} columns: {}", LCD_COLUMNS, args);
    }
    out.line
}

/// Formats the rows for a page
/// param page: which layout to use
/// param sample: raw sensor values
/// param metrics: values derived from the sample
pub fn render_page(page: Page, sample: &SensorSample, metrics: &DerivedMetrics) -> PageLines {
    match page {
        Page::Electrical => PageLines {
            top: format_line(format_args!("Battery:{:<7}", metrics.status)),
            bottom: format_line(format_args!(
                "V:{:.2} I:{:.0}mA",
                sample.bus_voltage_v, sample.current_ma
            )),
        },
        Page::Climate => PageLines {
            top: format_line(format_args!("Battery:{:<7}", metrics.status)),
            bottom: format_line(format_args!(
                "T:{:.1} H:{:.0}%",
                sample.temperature_c, sample.humidity_pct
            )),
        },
        Page::Charge => PageLines {
            top: format_line(format_args!("SVM:{PLACEHOLDER}")),
            bottom: format_line(format_args!(
                "SOC:{}% SOH:{PLACEHOLDER}",
                metrics.soc_pct.trunc() as u8
            )),
        },
        Page::Discharge => PageLines {
            top: format_line(format_args!("SVM:{PLACEHOLDER}")),
            bottom: format_line(format_args!(
                "DOD:{}% Z:{:.1}R",
                metrics.dod_pct.trunc() as u8,
                metrics.impedance_ohms
            )),
        },
    }
}

fn display_error<E: Display>(err: E) -> MonitorError {
    MonitorError::DisplayWrite(err.to_string())
}

/// Clears the display and writes both rows
/// param lines: rendered page
/// param display: display instance
pub fn render_screen<D: CharacterDisplay>(
    lines: &PageLines,
    display: &mut D,
) -> Result<(), MonitorError> {
    display.clear().map_err(display_error)?;
    display.write_line(0, &lines.top).map_err(display_error)?;
    display.write_line(1, &lines.bottom).map_err(display_error)
}

/// Clears the display and writes a single message on the top row
pub fn render_message<D: CharacterDisplay>(
    message: &str,
    display: &mut D,
) -> Result<(), MonitorError> {
    display.clear().map_err(display_error)?;
    display.write_line(0, message).map_err(display_error)
}
