//! Two-row status screen.
//!
//! Rendering is split in two: [`render`] builds a [`Screen`] value from the
//! current tuning and live readout, and [`Screen::draw`] pushes it through a
//! [`TextDisplay`]. Only the second step touches hardware.

use core::fmt::Write as _;

use heapless::String;

use crate::sensors::{SENSOR_COUNT, SensorFrame};
use crate::tuning::{Parameter, ReadoutSnapshot, TuningStore};

/// Characters per display row.
pub const DISPLAY_COLUMNS: usize = 16;
/// Rows on the display.
pub const DISPLAY_ROWS: u8 = 2;
/// Column where a tuning value is printed on the second row.
pub const VALUE_COLUMN: u8 = 6;

/// One display row.
pub type Row = String<DISPLAY_COLUMNS>;

/// Text output capability of the character display.
pub trait TextDisplay {
    fn clear(&mut self);

    /// Moves the cursor to `column` of `row` (both zero based).
    fn set_cursor(&mut self, column: u8, row: u8);

    fn write_char(&mut self, ch: char);

    fn write_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.write_char(ch);
        }
    }
}

/// Formats `value` as exactly three digits, keeping the lowest three.
#[must_use]
pub fn three_digits(value: u32) -> String<3> {
    let value = value % 1000;
    let mut out = String::new();
    for divisor in [100, 10, 1] {
        let digit = (value / divisor) % 10;
        // Digit is always 0..=9.
        let ch = char::from_digit(digit, 10).unwrap_or('0');
        let _ = out.push(ch);
    }
    out
}

/// Screen content: two rows, each starting at a given column.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Screen {
    pub top: Row,
    pub bottom: Row,
    pub bottom_column: u8,
}

impl Screen {
    fn new(top: &str, bottom_column: u8) -> Self {
        let mut screen = Self {
            bottom_column,
            ..Self::default()
        };
        push_clipped(&mut screen.top, top);
        screen
    }

    /// Clears the display and writes both rows.
    pub fn draw<D: TextDisplay + ?Sized>(&self, display: &mut D) {
        display.clear();
        display.write_str(&self.top);
        display.set_cursor(self.bottom_column, 1);
        display.write_str(&self.bottom);
    }

    /// Bottom row as it appears on the glass, left-padded to its column.
    #[must_use]
    pub fn bottom_line(&self) -> Row {
        let mut line = Row::new();
        for _ in 0..self.bottom_column {
            let _ = line.push(' ');
        }
        push_clipped(&mut line, &self.bottom);
        line
    }
}

fn push_clipped(row: &mut Row, text: &str) {
    for ch in text.chars() {
        if row.push(ch).is_err() {
            break;
        }
    }
}

/// Title shown above each menu entry.
#[must_use]
pub const fn parameter_title(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::Proportional => "Proportional:",
        Parameter::Integral => "Integral:",
        Parameter::Derivative => "Derivative:",
        Parameter::MinSpeed => "Min. speed:",
        Parameter::SensorCalibration => "Sensors calib.:",
    }
}

/// Builds the screen for the current state.
///
/// While running the screen shows live motor speeds. While stopped it shows
/// the selected menu entry: a tuning value, or the raw sensor bits for the
/// calibration view.
#[must_use]
pub fn render(store: &TuningStore, readout: &ReadoutSnapshot) -> Screen {
    if store.is_running() {
        return running_screen(readout);
    }

    let selected = store.selected();
    match store.value(selected) {
        Some(value) => {
            let mut screen = Screen::new(parameter_title(selected), VALUE_COLUMN);
            push_clipped(&mut screen.bottom, &three_digits(u32::from(value)));
            screen
        }
        None => calibration_screen(readout.frame),
    }
}

fn running_screen(readout: &ReadoutSnapshot) -> Screen {
    let mut screen = Screen::new("Running...", 0);
    let _ = write!(
        screen.bottom,
        "A: {} B: {}",
        three_digits(u32::from(readout.speeds.a)),
        three_digits(u32::from(readout.speeds.b)),
    );
    screen
}

fn calibration_screen(frame: SensorFrame) -> Screen {
    let mut screen = Screen::new(parameter_title(Parameter::SensorCalibration), 0);
    push_clipped(&mut screen.bottom, "    ");
    for index in 0..SENSOR_COUNT {
        let _ = screen.bottom.push(if frame.is_active(index) { '1' } else { '0' });
    }
    screen
}
