use crate::hd44780::driver::CharSize;
use crate::{LcdError, LcdResult};
use serde::{Deserialize, Serialize};

/// The most common address of PCF8574 backpacks. PCF8574A ones usually sit at `0x3F`.
pub const DEFAULT_ADDRESS: u8 = 0x27;

/// Static description of the attached display.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(default)]
pub struct LcdConfig {
    /// 7-bit I2C address of the expander.
    pub address: u8,
    pub columns: u8,
    /// Number of rows, 1 to 4.
    pub rows: u8,
    /// Requested font. [CharSize::Dots5x10] only takes effect on single-row displays.
    pub char_size: CharSize,
    /// Backlight state used from construction until changed.
    pub backlight: bool,
    pub timings: Timings,
}

impl LcdConfig {
    pub fn new(address: u8, columns: u8, rows: u8) -> Self {
        LcdConfig {
            address,
            columns,
            rows,
            ..Default::default()
        }
    }

    pub fn with_char_size(mut self, char_size: CharSize) -> Self {
        self.char_size = char_size;
        self
    }

    pub fn with_backlight(mut self, backlight: bool) -> Self {
        self.backlight = backlight;
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Checks the geometry and the timings.
    ///
    /// # Errors
    /// - `LcdError::InvalidConfig` if the address isn't 7-bit, there are no columns, the row
    ///   count isn't 1 to 4, or a delay is below its documented minimum.
    pub fn validate(&self) -> LcdResult<()> {
        if self.address > 0x7F {
            return Err(LcdError::InvalidConfig("address must be a 7-bit I2C address"));
        }
        if self.columns == 0 {
            return Err(LcdError::InvalidConfig("display must have at least one column"));
        }
        if !(1..=4).contains(&self.rows) {
            return Err(LcdError::InvalidConfig("display must have 1 to 4 rows"));
        }
        self.timings.validate()
    }
}

impl Default for LcdConfig {
    fn default() -> Self {
        LcdConfig {
            address: DEFAULT_ADDRESS,
            columns: 16,
            rows: 2,
            char_size: CharSize::default(),
            backlight: true,
            timings: Timings::default(),
        }
    }
}

/// Every delay used by the driver.
///
/// The defaults are generous. They can be tightened, but never below the minimums from the
/// HD44780 datasheet, which [Timings::validate] enforces.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(default)]
pub struct Timings {
    /// Wait after power rises before the first command. Min 40 ms.
    pub power_on_ms: u32,
    /// Wait after resetting the expander outputs.
    pub expander_reset_ms: u32,
    /// Wait after each of the first two 4-bit mode probes. Min 4.1 ms.
    pub mode_probe_us: u32,
    /// Wait after the third probe. Min 100 µs.
    pub mode_probe_final_us: u32,
    /// Width of the E pulse. Min 450 ns.
    pub enable_pulse_ns: u32,
    /// Wait after each E pulse for the command to execute. Min 37 µs.
    pub command_settle_us: u32,
    /// Extra wait after clear display and return home. Min 1.52 ms.
    pub clear_home_us: u32,
}

impl Timings {
    pub const MIN_POWER_ON_MS: u32 = 40;
    pub const MIN_MODE_PROBE_US: u32 = 4100;
    pub const MIN_MODE_PROBE_FINAL_US: u32 = 100;
    pub const MIN_ENABLE_PULSE_NS: u32 = 450;
    pub const MIN_COMMAND_SETTLE_US: u32 = 37;
    pub const MIN_CLEAR_HOME_US: u32 = 1520;

    pub fn validate(&self) -> LcdResult<()> {
        let checks = [
            (self.power_on_ms >= Self::MIN_POWER_ON_MS, "power-on delay below 40 ms"),
            (self.mode_probe_us >= Self::MIN_MODE_PROBE_US, "mode probe delay below 4.1 ms"),
            (self.mode_probe_final_us >= Self::MIN_MODE_PROBE_FINAL_US, "final mode probe delay below 100 µs"),
            (self.enable_pulse_ns >= Self::MIN_ENABLE_PULSE_NS, "enable pulse below 450 ns"),
            (self.command_settle_us >= Self::MIN_COMMAND_SETTLE_US, "command settle delay below 37 µs"),
            (self.clear_home_us >= Self::MIN_CLEAR_HOME_US, "clear/home delay below 1.52 ms"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, reason)) => Err(LcdError::InvalidConfig(*reason)),
            None => Ok(()),
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            power_on_ms: 50,
            expander_reset_ms: 1000,
            mode_probe_us: 4500,
            mode_probe_final_us: 150,
            enable_pulse_ns: 1000,
            command_settle_us: 50,
            clear_home_us: 2000,
        }
    }
}
