use crate::config::Timings;
use crate::hal::{NoWatchdog, Watchdog};
use crate::hd44780::driver::{DisplayFunction, HD44780Driver};
use crate::{LcdError, LcdResult, TransferStatus};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error, I2c};
use log::{debug, trace, warn};
use std::fmt::{Debug, Formatter};

/// Register select, P0 of the expander.
pub const PIN_RS: u8 = 0b00000001;
/// Read/write, P1 of the expander. Always low, the link is write-only.
pub const PIN_RW: u8 = 0b00000010;
/// Enable strobe, P2 of the expander.
pub const PIN_E: u8 = 0b00000100;
/// Backlight transistor, P3 of the expander.
pub const PIN_BACKLIGHT: u8 = 0b00001000;

/// HD44780 driver for displays behind a PCF8574 I2C backpack.
///
/// The expander's P4–P7 are wired to D4–D7 of the controller, so the controller runs in 4-bit mode
/// and every byte goes out as two nibbles, high one first. Each nibble is written to the expander
/// three times: once to set up the lines, then with E high, then with E low. The controller latches
/// the nibble on the falling edge, and the driver waits [Timings::command_settle_us] afterwards.
///
/// The first failed transfer latches [TransferStatus::Failed]. From then on every write is skipped
/// without touching the bus and reports [LcdError::Faulted], until
/// [I2cHD44780Driver::clear_transfer_status] is called.
pub struct I2cHD44780Driver<I, D, W = NoWatchdog> {
    i2c: I,
    delay: D,
    watchdog: W,
    address: u8,
    timings: Timings,
    backlight: bool,
    status: TransferStatus,
}

impl<I: I2c, D: DelayNs> I2cHD44780Driver<I, D> {
    /// Creates a new driver for the expander at `address`, without a watchdog.
    ///
    /// Doesn't touch the bus. The backlight starts on.
    pub fn new(i2c: I, delay: D, address: u8, timings: Timings) -> Self {
        I2cHD44780Driver {
            i2c,
            delay,
            watchdog: NoWatchdog,
            address,
            timings,
            backlight: true,
            status: TransferStatus::Ok,
        }
    }
}

impl<I: I2c, D: DelayNs, W: Watchdog> I2cHD44780Driver<I, D, W> {
    /// Replaces the watchdog refreshed during [HD44780Driver::init].
    pub fn with_watchdog<W2: Watchdog>(self, watchdog: W2) -> I2cHD44780Driver<I, D, W2> {
        I2cHD44780Driver {
            i2c: self.i2c,
            delay: self.delay,
            watchdog,
            address: self.address,
            timings: self.timings,
            backlight: self.backlight,
            status: self.status,
        }
    }

    /// Sets the initial backlight state. Takes effect with the next write.
    pub fn with_backlight(mut self, on: bool) -> Self {
        self.backlight = on;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Switches the backlight and writes it out right away, with all control lines low.
    pub fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.backlight = on;
        self.expander_write(0)
    }

    pub fn transfer_status(&self) -> TransferStatus {
        self.status
    }

    /// Unlatches a failed transfer so writes reach the bus again.
    ///
    /// The controller may have missed a nibble, which leaves it out of sync with the 4-bit
    /// framing; run the init sequence again if the display shows garbage.
    pub fn clear_transfer_status(&mut self) {
        if !self.status.is_ok() {
            debug!("Clearing latched transfer status {:?}", self.status);
        }
        self.status = TransferStatus::Ok;
    }

    pub fn refresh_watchdog(&mut self) {
        self.watchdog.refresh();
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Gives back the bus, the delay and the watchdog.
    pub fn release(self) -> (I, D, W) {
        (self.i2c, self.delay, self.watchdog)
    }

    /// Writes a single byte to the expander, with the backlight bit applied.
    fn expander_write(&mut self, data: u8) -> LcdResult<()> {
        if !self.status.is_ok() {
            return Err(LcdError::Faulted);
        }

        let byte = data | if self.backlight { PIN_BACKLIGHT } else { 0 };
        if let Err(err) = self.i2c.write(self.address, &[byte]) {
            let kind = err.kind();
            warn!(
                "I2C write of {:08b} to {:#04x} failed ({:?}), suspending further writes",
                byte, self.address, kind
            );
            self.status = TransferStatus::Failed(kind);
            return Err(LcdError::Bus(kind));
        }
        Ok(())
    }

    fn pulse_e(&mut self, data: u8) -> LcdResult<()> {
        // Set E high
        self.expander_write(data | PIN_E)?;
        self.delay.delay_ns(self.timings.enable_pulse_ns);
        // Set E low, the controller latches on the falling edge
        self.expander_write(data & !PIN_E)?;
        self.delay.delay_us(self.timings.command_settle_us);
        Ok(())
    }

    /// Presents one nibble (in the high 4 bits of `data`, with the control bits in the low ones)
    /// and strobes it into the controller.
    pub fn write_nibble(&mut self, data: u8) -> LcdResult<()> {
        trace!("Writing nibble: {:04b}, RS: {}", data >> 4, data & PIN_RS != 0);
        self.expander_write(data)?;
        self.pulse_e(data)
    }

    fn send(&mut self, data: u8, rs: bool) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        let mode = if rs { PIN_RS } else { 0 };
        let high_nibble = data & 0xF0;
        let low_nibble = (data << 4) & 0xF0;
        self.write_nibble(high_nibble | mode)?;
        self.write_nibble(low_nibble | mode)
    }
}

impl<I, D, W> Debug for I2cHD44780Driver<I, D, W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cHD44780Driver")
            .field("address", &format_args!("{:#04x}", self.address))
            .field("backlight", &self.backlight)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<I: I2c, D: DelayNs, W: Watchdog> HD44780Driver for I2cHD44780Driver<I, D, W> {
    /// Brings the controller into 4-bit mode from whatever state it's in.
    ///
    /// A warm reset of the host doesn't reset the display, so the controller might be in 8-bit
    /// mode, in 4-bit mode, or halfway through a 4-bit byte. Following the datasheet (figure 24),
    /// `0011` is sent three times, which lands in 8-bit mode from any of those, and then `0010`
    /// switches to 4-bit mode. Each of these is a single nibble, as the controller only sees the
    /// upper four data lines.
    ///
    /// Before that, it waits for the power to settle and resets the expander outputs to all
    /// control lines low. The watchdog is refreshed after the two longest waits.
    fn init(&mut self, function: DisplayFunction) -> LcdResult<()> {
        let timings = self.timings;

        debug!("Waiting {} ms for the controller to power up", timings.power_on_ms);
        self.delay.delay_ms(timings.power_on_ms);

        // RS, RW and E low
        self.expander_write(0)?;
        self.delay.delay_ms(timings.expander_reset_ms);
        self.watchdog.refresh();

        // Synchronize
        debug!("Forcing 4-bit interface");
        self.write_nibble(0b00110000)?;
        self.delay.delay_us(timings.mode_probe_us);
        self.write_nibble(0b00110000)?;
        self.delay.delay_us(timings.mode_probe_us);
        self.write_nibble(0b00110000)?;
        self.delay.delay_us(timings.mode_probe_final_us);
        self.write_nibble(0b00100000)?;
        self.watchdog.refresh();

        self.function_set(function)
    }

    fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.send(data, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{BusEvent, FakeBus};
    use crate::hd44780::driver::{CharSize, DisplayControl};
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    fn driver(bus: &FakeBus) -> I2cHD44780Driver<crate::fake::FakeI2c, crate::fake::FakeDelay> {
        I2cHD44780Driver::new(bus.i2c(), bus.delay(), 0x27, Timings::default())
    }

    #[test]
    fn send_splits_into_high_then_low_nibble() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus);

        driver.send_command(0xA5).unwrap();

        let writes = bus.written();
        assert_eq!(writes.len(), 6);
        // setup, E high, E low for each nibble, backlight always on
        assert_eq!(writes, vec![0xA8, 0xAC, 0xA8, 0x58, 0x5C, 0x58]);
    }

    #[test]
    fn data_sets_register_select() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus);

        driver.send_data(b'A').unwrap();

        assert_eq!(bus.written(), vec![0x49, 0x4D, 0x49, 0x19, 0x1D, 0x19]);
    }

    #[test]
    fn strobe_waits_pulse_then_settle() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus);

        driver.write_nibble(0x30).unwrap();

        assert_eq!(
            bus.events(),
            vec![
                BusEvent::Write { address: 0x27, byte: 0x38 },
                BusEvent::Write { address: 0x27, byte: 0x3C },
                BusEvent::Delay { ns: 1_000 },
                BusEvent::Write { address: 0x27, byte: 0x38 },
                BusEvent::Delay { ns: 50_000 },
            ]
        );
    }

    #[test]
    fn every_write_carries_backlight_state() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus);

        driver.set_display_control(DisplayControl { display_on: false, ..Default::default() }).unwrap();
        driver.send_data(0x00).unwrap();
        assert!(bus.written().iter().all(|b| b & PIN_BACKLIGHT != 0));

        bus.clear();
        driver.set_backlight(false).unwrap();
        driver.set_display_control(DisplayControl { display_on: true, ..Default::default() }).unwrap();
        driver.send_data(0xFF).unwrap();
        let writes = bus.written();
        assert_eq!(writes[0], 0x00);
        assert!(writes.iter().all(|b| b & PIN_BACKLIGHT == 0));
    }

    #[test]
    fn failure_latches_and_skips_later_writes() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus);

        bus.fail_on_write(1);
        let kind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        assert_eq!(driver.send_command(0x01), Err(LcdError::Bus(kind)));
        assert_eq!(driver.transfer_status(), TransferStatus::Failed(kind));
        assert_eq!(bus.written().len(), 1);

        assert_eq!(driver.send_data(b'x'), Err(LcdError::Faulted));
        assert_eq!(driver.set_backlight(false), Err(LcdError::Faulted));
        assert_eq!(bus.attempted_writes(), 2);

        driver.clear_transfer_status();
        driver.send_data(b'x').unwrap();
        assert_eq!(bus.attempted_writes(), 8);
    }

    #[test]
    fn init_forces_four_bit_mode() {
        let bus = FakeBus::new();
        let mut driver = driver(&bus).with_watchdog(bus.watchdog());

        driver.init(DisplayFunction::for_rows(2, CharSize::Dots5x8)).unwrap();

        let events = bus.events();
        assert_eq!(events[0], BusEvent::Delay { ns: 50_000_000 });
        assert_eq!(events[1], BusEvent::Write { address: 0x27, byte: PIN_BACKLIGHT });
        assert_eq!(events[2], BusEvent::Delay { ns: 1_000_000_000 });
        assert_eq!(events[3], BusEvent::WatchdogRefresh);

        let latched = bus.latched_nibbles();
        assert_eq!(latched, vec![0x30, 0x30, 0x30, 0x20, 0x20, 0x80]);
        assert_eq!(bus.count(|e| *e == BusEvent::WatchdogRefresh), 2);
        assert_eq!(bus.count(|e| *e == BusEvent::Delay { ns: 4_500_000 }), 2);
        assert_eq!(bus.count(|e| *e == BusEvent::Delay { ns: 150_000 }), 1);
    }
}
