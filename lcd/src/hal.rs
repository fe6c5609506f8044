//! Platform seams the driver needs besides the I2C bus itself.

use embedded_hal::delay::DelayNs;
use std::thread::sleep;
use std::time::Duration;

/// A hardware watchdog that has to be fed during long blocking sequences.
///
/// [crate::LcdI2c::begin] takes over a second with the default timings, so it refreshes the
/// watchdog between its longer steps.
pub trait Watchdog {
    fn refresh(&mut self);
}

/// Watchdog for platforms that don't run one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn refresh(&mut self) {}
}

impl<W: Watchdog + ?Sized> Watchdog for &mut W {
    fn refresh(&mut self) {
        (**self).refresh()
    }
}

/// [DelayNs] backed by [std::thread::sleep].
///
/// The OS may oversleep, which is fine here: every delay the driver uses is a minimum.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}
