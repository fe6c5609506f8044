//! Driver for HD44780 character LCDs behind a PCF8574-style I2C GPIO expander.
//!
//! The controller runs in 4-bit mode: every command or data byte is sent as two nibbles, each
//! latched with a pulse on the E line. The expander also drives the backlight, so every byte on
//! the bus carries the backlight bit.
//!
//! See [LcdI2c] for the high-level API and [hd44780::driver::HD44780Driver] for the command set.

pub mod config;
pub mod display;
pub mod fake;
pub mod hal;
pub mod hd44780;
#[cfg(feature = "linux")]
pub mod linux;

pub use config::{LcdConfig, Timings};
pub use display::{LcdI2c, SharedLcd};
pub use embedded_hal::i2c::ErrorKind;

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
pub enum LcdError {
    #[error("I2C transfer failed: {0:?}")]
    Bus(ErrorKind),
    /// An earlier transfer failed and the bus is latched. See [LcdI2c::clear_transfer_status].
    #[error("bus is faulted by an earlier transfer")]
    Faulted,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type LcdResult<T> = Result<T, LcdError>;

/// Result of the last transfer attempted on the bus.
///
/// Once a transfer fails, the status stays [TransferStatus::Failed] and all further writes are
/// skipped until it's cleared.
#[derive(Debug, Default, Eq, PartialEq, Clone, Copy)]
pub enum TransferStatus {
    #[default]
    Ok,
    Failed(ErrorKind),
}

impl TransferStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, TransferStatus::Ok)
    }
}
