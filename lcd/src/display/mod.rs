//! High-level character display API.

mod shared;

pub use shared::*;

use crate::config::LcdConfig;
use crate::hal::{NoWatchdog, Watchdog};
use crate::hd44780::driver::{
    CursorDirection, DisplayControl, DisplayFunction, EntryMode, HD44780Driver, I2cHD44780Driver,
};
use crate::{LcdError, LcdResult, TransferStatus};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};
use std::fmt::{Debug, Formatter};

/// DDRAM address of the first column of each row.
///
/// Rows 2 and 3 continue rows 0 and 1 in memory, which is why they don't follow on linearly.
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// A character LCD on an I2C backpack.
///
/// Keeps a local copy of the mode flags, since the controller can't be read over the expander,
/// and a shadow of the cursor position. Every toggle flips one flag and sends the whole flag byte
/// again.
///
/// Call [LcdI2c::begin] before anything else; the controller's state after power-up or a host
/// reset is unknown.
///
/// # Errors
///
/// Every operation returns the first transfer error it hits. After a failed transfer the driver
/// stops writing to the bus altogether and all operations return [LcdError::Faulted], until
/// [LcdI2c::clear_transfer_status] is called. [LcdI2c::last_transfer_status] tells whether that
/// happened.
pub struct LcdI2c<I, D, W = NoWatchdog> {
    driver: I2cHD44780Driver<I, D, W>,
    config: LcdConfig,
    function: DisplayFunction,
    control: DisplayControl,
    entry_mode: EntryMode,
    column: u8,
    row: u8,
}

impl<I: I2c, D: DelayNs> LcdI2c<I, D> {
    /// Creates the driver. Doesn't touch the bus.
    ///
    /// # Errors
    /// - `LcdError::InvalidConfig` if [LcdConfig::validate] rejects the configuration.
    pub fn new(i2c: I, delay: D, config: LcdConfig) -> LcdResult<Self> {
        config.validate()?;

        let driver = I2cHD44780Driver::new(i2c, delay, config.address, config.timings)
            .with_backlight(config.backlight);

        Ok(LcdI2c {
            driver,
            config,
            function: DisplayFunction::for_rows(config.rows, config.char_size),
            control: DisplayControl::default(),
            entry_mode: EntryMode::default(),
            column: 0,
            row: 0,
        })
    }
}

impl<I: I2c, D: DelayNs, W: Watchdog> LcdI2c<I, D, W> {
    /// Sets the watchdog to refresh during [LcdI2c::begin].
    pub fn with_watchdog<W2: Watchdog>(self, watchdog: W2) -> LcdI2c<I, D, W2> {
        LcdI2c {
            driver: self.driver.with_watchdog(watchdog),
            config: self.config,
            function: self.function,
            control: self.control,
            entry_mode: self.entry_mode,
            column: self.column,
            row: self.row,
        }
    }

    /// Initializes the display: 4-bit mode, line count and font, display on without cursor,
    /// cleared, left-to-right text, cursor at home.
    ///
    /// Blocks for over a second with the default [crate::Timings].
    pub fn begin(&mut self) -> LcdResult<()> {
        debug!("Initializing {}x{} display at {:#04x}", self.config.columns, self.config.rows, self.config.address);

        self.function = DisplayFunction::for_rows(self.config.rows, self.config.char_size);
        self.driver.init(self.function)?;

        self.control = DisplayControl {
            display_on: true,
            cursor_on: false,
            blink_on: false,
        };
        self.driver.set_display_control(self.control)?;
        self.driver.refresh_watchdog();

        self.clear()?;

        self.entry_mode = EntryMode::default();
        self.driver.set_entry_mode(self.entry_mode)?;

        self.home()
    }

    /// Clears the display and moves the cursor to (0, 0).
    pub fn clear(&mut self) -> LcdResult<()> {
        self.driver.clear_display()?;
        // Clearing takes far longer than other instructions
        self.driver.delay_us(self.config.timings.clear_home_us);
        self.column = 0;
        self.row = 0;
        Ok(())
    }

    /// Moves the cursor to (0, 0) and undoes any scrolling.
    pub fn home(&mut self) -> LcdResult<()> {
        self.driver.return_home()?;
        self.driver.delay_us(self.config.timings.clear_home_us);
        self.column = 0;
        self.row = 0;
        Ok(())
    }

    /// Moves the cursor to `column` on `row`, both 0-based.
    ///
    /// Rows past the last one are clamped to the last one. The column isn't checked against the
    /// display width; columns past it address the off-screen part of the row.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the resulting address is outside DDRAM. Nothing is sent.
    pub fn set_cursor(&mut self, column: u8, row: u8) -> LcdResult<()> {
        let row = row.min(self.config.rows - 1);
        let address = column
            .checked_add(ROW_OFFSETS[row as usize])
            .ok_or(LcdError::InvalidArgument)?;
        self.driver.set_ddram_address(address)?;
        self.column = column;
        self.row = row;
        Ok(())
    }

    /// Turns the display on. DDRAM is kept while it's off.
    pub fn display(&mut self) -> LcdResult<()> {
        self.control.display_on = true;
        self.driver.set_display_control(self.control)
    }

    pub fn no_display(&mut self) -> LcdResult<()> {
        self.control.display_on = false;
        self.driver.set_display_control(self.control)
    }

    /// Shows the underline cursor.
    pub fn cursor(&mut self) -> LcdResult<()> {
        self.control.cursor_on = true;
        self.driver.set_display_control(self.control)
    }

    pub fn no_cursor(&mut self) -> LcdResult<()> {
        self.control.cursor_on = false;
        self.driver.set_display_control(self.control)
    }

    /// Blinks the character cell at the cursor.
    pub fn blink(&mut self) -> LcdResult<()> {
        self.control.blink_on = true;
        self.driver.set_display_control(self.control)
    }

    pub fn no_blink(&mut self) -> LcdResult<()> {
        self.control.blink_on = false;
        self.driver.set_display_control(self.control)
    }

    /// Shifts the whole display one column to the left, without changing DDRAM.
    pub fn scroll_display_left(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Left)
    }

    pub fn scroll_display_right(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Right)
    }

    pub fn left_to_right(&mut self) -> LcdResult<()> {
        self.entry_mode.direction = CursorDirection::Right;
        self.driver.set_entry_mode(self.entry_mode)
    }

    pub fn right_to_left(&mut self) -> LcdResult<()> {
        self.entry_mode.direction = CursorDirection::Left;
        self.driver.set_entry_mode(self.entry_mode)
    }

    /// Shifts the display on every write, so text appears to be pushed out from the cursor.
    pub fn autoscroll(&mut self) -> LcdResult<()> {
        self.entry_mode.shift = true;
        self.driver.set_entry_mode(self.entry_mode)
    }

    pub fn no_autoscroll(&mut self) -> LcdResult<()> {
        self.entry_mode.shift = false;
        self.driver.set_entry_mode(self.entry_mode)
    }

    /// Defines custom character `slot` (0–7, higher bits are ignored) from 8 rows of 5 pixels,
    /// top row first. Print it by writing the slot number as data.
    ///
    /// Leaves the controller addressing CGRAM, so move the cursor before printing.
    pub fn create_char(&mut self, slot: u8, bitmap: &[u8; 8]) -> LcdResult<()> {
        let slot = slot & 0b111;
        self.driver.set_cgram_address(slot << 3)?;
        for &row in bitmap {
            self.driver.send_data(row)?;
        }
        Ok(())
    }

    pub fn backlight(&mut self) -> LcdResult<()> {
        self.driver.set_backlight(true)
    }

    pub fn no_backlight(&mut self) -> LcdResult<()> {
        self.driver.set_backlight(false)
    }

    pub fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.driver.set_backlight(on)
    }

    pub fn backlight_enabled(&self) -> bool {
        self.driver.backlight()
    }

    /// Sends a raw instruction byte.
    pub fn command(&mut self, command: u8) -> LcdResult<()> {
        self.driver.send_command(command)
    }

    /// Writes a raw character code at the cursor. Returns the number of bytes written, always 1.
    ///
    /// Doesn't move the cursor shadow; use [LcdI2c::print_bytes] for that.
    pub fn write(&mut self, data: u8) -> LcdResult<usize> {
        self.driver.send_data(data)?;
        Ok(1)
    }

    /// Prints raw character codes.
    ///
    /// `\n` moves to the start of the next row (staying on the last row if already there), and
    /// `\r` is skipped. Everything else is written as is, advancing the column shadow.
    pub fn print_bytes(&mut self, bytes: &[u8]) -> LcdResult<()> {
        for &byte in bytes {
            self.print_byte(byte)?;
        }
        Ok(())
    }

    /// Prints a string like [LcdI2c::print_bytes]. Characters outside ASCII are printed as `?`,
    /// as the character ROM only matches ASCII.
    pub fn print_str(&mut self, s: &str) -> LcdResult<()> {
        for c in s.chars() {
            if c.is_ascii() {
                self.print_byte(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.print_byte(b'?')?;
            }
        }
        Ok(())
    }

    fn print_byte(&mut self, byte: u8) -> LcdResult<()> {
        match byte {
            b'\n' => self.set_cursor(0, self.row.saturating_add(1)),
            b'\r' => Ok(()),
            _ => {
                self.write(byte)?;
                self.column = self.column.saturating_add(1);
                Ok(())
            }
        }
    }

    pub fn last_transfer_status(&self) -> TransferStatus {
        self.driver.transfer_status()
    }

    /// Lets writes reach the bus again after a failed transfer.
    ///
    /// The controller may have lost track of the nibble order, so [LcdI2c::begin] is usually the
    /// next call.
    pub fn clear_transfer_status(&mut self) {
        self.driver.clear_transfer_status();
    }

    pub fn current_column(&self) -> u8 {
        self.column
    }

    pub fn current_row(&self) -> u8 {
        self.row
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    /// Gives back the bus, the delay and the watchdog.
    pub fn release(self) -> (I, D, W) {
        self.driver.release()
    }
}

impl<I: I2c, D: DelayNs, W: Watchdog> std::fmt::Write for LcdI2c<I, D, W> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.print_str(s).map_err(|_| std::fmt::Error)
    }
}

impl<I, D, W> Debug for LcdI2c<I, D, W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcdI2c")
            .field("driver", &self.driver)
            .field("config", &self.config)
            .field("function", &self.function)
            .field("control", &self.control)
            .field("entry_mode", &self.entry_mode)
            .field("cursor", &(self.column, self.row))
            .finish()
    }
}
