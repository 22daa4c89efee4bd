//! 16x2 HD44780 character LCD behind a PCF8574 I2C backpack.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use hd44780_driver::bus::I2CBus;
use hd44780_driver::charset::{CharsetUniversal, EmptyFallback};
use hd44780_driver::memory_map::StandardMemoryMap;
use hd44780_driver::setup::DisplayOptionsI2C;
use hd44780_driver::{Cursor, CursorBlink, Display, DisplayMode, HD44780};
use thiserror::Error;

use crate::rendering::CharacterDisplay;

pub const LCD_DEFAULT_ADDRESS: u8 = 0x27;
pub const LCD_COLUMNS: usize = 16;
pub const LCD_ROWS: u8 = 2;

type Hd44780I2c<I> = HD44780<
    I2CBus<I>,
    StandardMemoryMap<LCD_COLUMNS, { LCD_ROWS as usize }>,
    EmptyFallback<CharsetUniversal>,
>;

#[derive(Error, Debug)]
pub enum LcdError {
    #[error("lcd controller error: {0}")]
    Driver(String),

    #[error("row {0} is outside the display")]
    RowOutOfRange(u8),
}

fn driver_error<E: Debug>(err: E) -> LcdError {
    LcdError::Driver(format!("{err:?}"))
}

pub struct Lcd1602<I, D> {
    lcd: Hd44780I2c<I>,
    delay: D,
}

impl<I: I2c, D: DelayNs> Lcd1602<I, D> {
    /// Initialises the controller and leaves the screen cleared, cursor hidden
    /// param i2c: bus handle
    /// param delay: delay used for controller timing
    /// param address: 7-bit backpack address
    pub fn new(i2c: I, mut delay: D, address: u8) -> Result<Self, LcdError> {
        let options = DisplayOptionsI2C::new(StandardMemoryMap::new()).with_i2c_bus(i2c, address);
        let mut lcd: Hd44780I2c<I> =
            HD44780::new(options, &mut delay).map_err(|(_, err)| driver_error(err))?;

        lcd.set_display_mode(
            DisplayMode {
                display: Display::On,
                cursor_visibility: Cursor::Invisible,
                cursor_blink: CursorBlink::Off,
            },
            &mut delay,
        )
        .map_err(driver_error)?;
        lcd.clear(&mut delay).map_err(driver_error)?;

        Ok(Lcd1602 { lcd, delay })
    }
}

impl<I: I2c, D: DelayNs> CharacterDisplay for Lcd1602<I, D> {
    type Error = LcdError;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.lcd.clear(&mut self.delay).map_err(driver_error)
    }

    /// Writes from column 0, clipped to the display width
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
        if row >= LCD_ROWS {
            return Err(LcdError::RowOutOfRange(row));
        }
        let end = text
            .char_indices()
            .nth(LCD_COLUMNS)
            .map_or(text.len(), |(i, _)| i);

        self.lcd
            .set_cursor_xy((0, row), &mut self.delay)
            .map_err(driver_error)?;
        self.lcd
            .write_str(&text[..end], &mut self.delay)
            .map_err(driver_error)
    }
}
