mod i2c;

use crate::{LcdError, LcdResult};
pub use i2c::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Low-level interface for HD44780 controllers.
///
/// The provided methods build the instruction bytes; an implementation only has to know how to
/// get a byte to the controller with the right RS level, and how to bring it up from an unknown
/// state in [HD44780Driver::init].
///
/// All instructions are write-only here. The busy flag can't be read, so implementations wait
/// a fixed time after every instruction instead.
pub trait HD44780Driver: Debug {
    /// Forces the controller into 4-bit mode and applies the function set.
    fn init(&mut self, function: DisplayFunction) -> LcdResult<()>;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> LcdResult<()> {
        self.send_command(0b00000001)
    }

    /// Sets the cursor to the home position and undoes any display shift.
    fn return_home(&mut self) -> LcdResult<()> {
        self.send_command(0b00000010)
    }

    /// Sets the entry mode: cursor direction after each write and whether the display shifts.
    fn set_entry_mode(&mut self, mode: EntryMode) -> LcdResult<()> {
        self.send_command(0b00000100 | mode.to_mask())
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(&mut self, control: DisplayControl) -> LcdResult<()> {
        self.send_command(0b00001000 | control.to_mask())
    }

    /// Moves the cursor or shifts the display, without touching DDRAM.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> LcdResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the interface width, line count and font.
    fn function_set(&mut self, function: DisplayFunction) -> LcdResult<()> {
        self.send_command(0b00100000 | function.to_mask())
    }

    /// Sets the CGRAM address.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the address doesn't fit in 6 bits.
    fn set_cgram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b00111111 {
            return Err(LcdError::InvalidArgument);
        }
        self.send_command(0b01000000 | address)
    }

    /// Sets the DDRAM address.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the address doesn't fit in 7 bits.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b01111111 {
            return Err(LcdError::InvalidArgument);
        }
        self.send_command(0b10000000 | address)
    }

    // Low-level commands
    // These are used by the high-level functions above and implemented by the transport.

    /// Sends a command to the HD44780 controller.
    /// Sets the RS line to 0 (instruction register).
    fn send_command(&mut self, command: u8) -> LcdResult<()>;

    /// Sends data to the HD44780 controller.
    /// Sets the RS line to 1 (data register).
    fn send_data(&mut self, data: u8) -> LcdResult<()>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

/// Character font of the controller.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CharSize {
    #[default]
    Dots5x8,
    /// Only available on single-line displays.
    Dots5x10,
}

/// Function set flags. The interface is always 4 bits wide.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DisplayFunction {
    pub two_lines: bool,
    pub char_size: CharSize,
}

impl DisplayFunction {
    /// Builds the function set for a display with `rows` rows.
    ///
    /// The controller can't drive a 5x10 font with two lines, so for multi-row displays the
    /// font request is dropped in favor of the line count.
    pub fn for_rows(rows: u8, char_size: CharSize) -> Self {
        let two_lines = rows > 1;
        DisplayFunction {
            two_lines,
            char_size: if two_lines { CharSize::Dots5x8 } else { char_size },
        }
    }

    pub fn to_mask(&self) -> u8 {
        let mut mask = 0;
        if self.two_lines {
            mask |= 0b00001000;
        }
        if self.char_size == CharSize::Dots5x10 {
            mask |= 0b00000100;
        }
        mask
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DisplayControl {
    pub display_on: bool,
    pub cursor_on: bool,
    pub blink_on: bool,
}

impl DisplayControl {
    pub fn to_mask(&self) -> u8 {
        let mut mask = 0;
        if self.display_on {
            mask |= 0b00000100;
        }
        if self.cursor_on {
            mask |= 0b00000010;
        }
        if self.blink_on {
            mask |= 0b00000001;
        }
        mask
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EntryMode {
    pub direction: CursorDirection,
    /// Shifts the whole display on every write, keeping the cursor in place.
    pub shift: bool,
}

impl EntryMode {
    pub fn to_mask(&self) -> u8 {
        let mut mask = 0;
        if self.direction == CursorDirection::Right {
            mask |= 0b00000010;
        }
        if self.shift {
            mask |= 0b00000001;
        }
        mask
    }
}

/// Left-to-right text without shifting, the usual mode for latin scripts.
impl Default for EntryMode {
    fn default() -> Self {
        EntryMode {
            direction: CursorDirection::Right,
            shift: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_dot_font_only_on_single_row() {
        assert_eq!(DisplayFunction::for_rows(1, CharSize::Dots5x10).to_mask(), 0b00000100);
        assert_eq!(DisplayFunction::for_rows(2, CharSize::Dots5x10).to_mask(), 0b00001000);
        assert_eq!(DisplayFunction::for_rows(4, CharSize::Dots5x8).to_mask(), 0b00001000);
        assert_eq!(DisplayFunction::for_rows(1, CharSize::Dots5x8).to_mask(), 0);
    }

    #[test]
    fn control_and_entry_masks() {
        let control = DisplayControl { display_on: true, cursor_on: false, blink_on: true };
        assert_eq!(control.to_mask(), 0b101);
        assert_eq!(EntryMode::default().to_mask(), 0b10);
        let mode = EntryMode { direction: CursorDirection::Left, shift: true };
        assert_eq!(mode.to_mask(), 0b01);
    }
}
