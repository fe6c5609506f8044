//! HD44780 LCD module.
//!
//! [driver::HD44780Driver] encodes the controller's instruction set, and
//! [driver::I2cHD44780Driver] implements it over a PCF8574 I2C expander in 4-bit mode.

pub mod driver;
