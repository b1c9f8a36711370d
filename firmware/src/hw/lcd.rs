//! Write-only HD44780 driver on a 4-bit bus.
//!
//! Timing uses busy waits so the driver can sit behind the synchronous
//! [`TextDisplay`] trait; only the foreground context draws, and the control
//! task preempts it freely.

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, block_for};
use follower_core::display::{DISPLAY_COLUMNS, DISPLAY_ROWS, TextDisplay};

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; DISPLAY_ROWS as usize] = [0x00, 0x40];

const POWER_ON_DELAY: Duration = Duration::from_millis(50);
const CLEAR_DELAY: Duration = Duration::from_micros(2_000);
const COMMAND_DELAY: Duration = Duration::from_micros(50);
const ENABLE_PULSE: Duration = Duration::from_micros(1);

pub struct CharacterLcd<'d> {
    rs: Output<'d>,
    enable: Output<'d>,
    data: [Output<'d>; 4],
}

impl<'d> CharacterLcd<'d> {
    /// Takes the pins and runs the power-on initialisation sequence.
    pub fn new(rs: Output<'d>, enable: Output<'d>, data: [Output<'d>; 4]) -> Self {
        let mut lcd = Self { rs, enable, data };
        lcd.initialise();
        lcd
    }

    fn initialise(&mut self) {
        block_for(POWER_ON_DELAY);
        self.rs.set_low();
        // Three 8-bit function sets resynchronise the controller, then 4-bit.
        for _ in 0..3 {
            self.write_nibble(0x03);
            block_for(Duration::from_micros(4_500));
        }
        self.write_nibble(0x02);
        block_for(COMMAND_DELAY);

        self.command(CMD_FUNCTION_4BIT_2LINE);
        self.command(CMD_DISPLAY_ON);
        self.command(CMD_ENTRY_MODE_INCREMENT);
        self.clear();
    }

    fn command(&mut self, byte: u8) {
        self.rs.set_low();
        self.write_byte(byte);
        block_for(COMMAND_DELAY);
    }

    fn data(&mut self, byte: u8) {
        self.rs.set_high();
        self.write_byte(byte);
        block_for(COMMAND_DELAY);
    }

    fn write_byte(&mut self, byte: u8) {
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            if nibble & (1 << bit) == 0 {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
        self.enable.set_high();
        block_for(ENABLE_PULSE);
        self.enable.set_low();
    }
}

impl TextDisplay for CharacterLcd<'_> {
    fn clear(&mut self) {
        self.command(CMD_CLEAR);
        block_for(CLEAR_DELAY);
    }

    fn set_cursor(&mut self, column: u8, row: u8) {
        let row = usize::from(row).min(ROW_OFFSETS.len() - 1);
        let column = column.min(u8::try_from(DISPLAY_COLUMNS - 1).unwrap_or(u8::MAX));
        self.command(CMD_SET_DDRAM | (ROW_OFFSETS[row] + column));
    }

    fn write_char(&mut self, ch: char) {
        // The character ROM covers printable ASCII.
        let byte = if ch.is_ascii() && !ch.is_ascii_control() {
            u8::try_from(ch).unwrap_or(b'?')
        } else {
            b'?'
        };
        self.data(byte);
    }
}
