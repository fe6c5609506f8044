mod config;

use crate::config::Config;
use dotenv::dotenv;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use lcdi2c::fake::FakeBus;
use lcdi2c::hal::StdDelay;
use lcdi2c::linux::LinuxI2cBus;
use lcdi2c::LcdI2c;
use log::{debug, info, warn};
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;
use time::OffsetDateTime;
use time::macros::format_description;

/// A padlock, for the custom character demo.
const LOCK_GLYPH: [u8; 8] = [
    0b01110,
    0b10001,
    0b10001,
    0b11111,
    0b11011,
    0b11011,
    0b11111,
    0b00000,
];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    let config = Config::load()?;
    info!("{:?}", config);

    let host = System::host_name().unwrap_or_else(|| UNKNOWN_STR.to_string());

    if config.dry_run {
        info!("Dry run, writing to a fake bus");
        let bus = FakeBus::new();
        let lcd = LcdI2c::new(bus.i2c(), bus.delay(), config.lcd)?;
        run(lcd, &host, config.updates)?;
        let nibbles = bus.latched_nibbles();
        info!("The controller would have latched {} nibbles", nibbles.len());
        debug!("{:02x?}", nibbles);
    } else {
        let i2c = LinuxI2cBus::open(&config.bus_path, config.lcd.address)?;
        let lcd = LcdI2c::new(i2c, StdDelay, config.lcd)?;
        run(lcd, &host, config.updates)?;
    }

    Ok(())
}

fn run<I: I2c, D: DelayNs>(mut lcd: LcdI2c<I, D>, host: &str, updates: Option<u32>) -> eyre::Result<()> {
    info!("Initializing display...");
    lcd.begin()?;
    debug!("{:?} initialized.", lcd);

    lcd.create_char(0, &LOCK_GLYPH)?;
    lcd.home()?;
    lcd.write(0)?;
    let columns = lcd.config().columns as usize;
    let greeting: String = format!(" {}", host).chars().take(columns - 1).collect();
    lcd.print_str(&greeting)?;

    let clock_format = format_description!("[hour]:[minute]:[second]");
    let mut update = 0;
    while updates.is_none_or(|updates| update < updates) {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let line = now.format(clock_format)?;

        let result = lcd.set_cursor(0, 1).and_then(|_| lcd.print_str(&line));
        if let Err(err) = result {
            warn!("Display update failed: {}, reinitializing", err);
            lcd.clear_transfer_status();
            lcd.begin()?;
        }

        update += 1;
        sleep(Duration::from_secs(1));
    }

    lcd.no_display()?;
    lcd.no_backlight()?;
    info!("Done.");
    Ok(())
}
