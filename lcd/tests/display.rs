use lcdi2c::fake::{BusEvent, FakeBus, FakeDelay, FakeI2c, FakeWatchdog, Sent};
use lcdi2c::hd44780::driver::{CharSize, PIN_BACKLIGHT, PIN_E};
use lcdi2c::{ErrorKind, LcdConfig, LcdError, LcdI2c, TransferStatus};

fn new_lcd(bus: &FakeBus, config: LcdConfig) -> LcdI2c<FakeI2c, FakeDelay, FakeWatchdog> {
    LcdI2c::new(bus.i2c(), bus.delay(), config)
        .unwrap()
        .with_watchdog(bus.watchdog())
}

#[test]
fn begin_runs_the_full_init_sequence() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 2));

    lcd.begin().unwrap();

    assert_eq!(
        bus.latched_nibbles(),
        vec![
            0x30, 0x30, 0x30, 0x20, // force 4-bit mode
            0x20, 0x80, // function set: 2 lines, 5x8
            0x00, 0xC0, // display on, no cursor, no blink
            0x00, 0x10, // clear
            0x00, 0x60, // entry mode: left to right
            0x00, 0x20, // home
        ]
    );
    assert_eq!(bus.count(|e| *e == BusEvent::WatchdogRefresh), 3);
    assert_eq!(bus.count(|e| *e == BusEvent::Delay { ns: 2_000_000 }), 2);
    assert_eq!(lcd.last_transfer_status(), TransferStatus::Ok);
    assert_eq!((lcd.current_column(), lcd.current_row()), (0, 0));
}

#[test]
fn begin_keeps_order_of_waits() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 2));

    lcd.begin().unwrap();

    let events = bus.events();
    let first_probe = events
        .iter()
        .position(|e| matches!(e, BusEvent::Write { byte, .. } if byte & PIN_E != 0))
        .unwrap();
    // power-on wait, expander reset, reset wait and watchdog all happen before the first probe
    assert_eq!(
        events[..first_probe],
        [
            BusEvent::Delay { ns: 50_000_000 },
            BusEvent::Write { address: 0x27, byte: PIN_BACKLIGHT },
            BusEvent::Delay { ns: 1_000_000_000 },
            BusEvent::WatchdogRefresh,
            BusEvent::Write { address: 0x27, byte: 0x30 | PIN_BACKLIGHT },
        ]
    );
}

#[test]
fn ten_dot_font_is_ignored_on_multi_row_displays() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 2).with_char_size(CharSize::Dots5x10));
    lcd.begin().unwrap();
    assert_eq!(bus.latched_nibbles()[4..6], [0x20, 0x80]);

    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 1).with_char_size(CharSize::Dots5x10));
    lcd.begin().unwrap();
    assert_eq!(bus.latched_nibbles()[4..6], [0x20, 0x40]);
}

#[test]
fn every_write_carries_backlight_bit() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 20, 4));
    lcd.begin().unwrap();
    lcd.no_display().unwrap();
    lcd.print_str("off").unwrap();
    lcd.display().unwrap();
    lcd.print_str("on").unwrap();
    assert!(bus.written().iter().all(|b| b & PIN_BACKLIGHT != 0));

    bus.clear();
    lcd.no_backlight().unwrap();
    lcd.print_str("dark").unwrap();
    lcd.no_display().unwrap();
    assert!(bus.written().iter().all(|b| b & PIN_BACKLIGHT == 0));
}

#[test]
fn print_moves_to_next_row_on_newline() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 2));
    lcd.begin().unwrap();
    bus.clear();

    lcd.print_str("AB\nCD").unwrap();

    assert_eq!(
        bus.sent(),
        vec![
            Sent::Data(b'A'),
            Sent::Data(b'B'),
            Sent::Command(0xC0),
            Sent::Data(b'C'),
            Sent::Data(b'D'),
        ]
    );
    assert_eq!((lcd.current_column(), lcd.current_row()), (2, 1));
}

#[test]
fn failed_transfer_silences_the_bus() {
    let bus = FakeBus::new();
    let mut lcd = new_lcd(&bus, LcdConfig::new(0x27, 16, 2));
    lcd.begin().unwrap();

    bus.fail_on_write(3);
    assert!(matches!(lcd.print_str("Hello"), Err(LcdError::Bus(_))));
    assert!(matches!(lcd.last_transfer_status(), TransferStatus::Failed(ErrorKind::NoAcknowledge(_))));
    let attempted = bus.attempted_writes();

    assert_eq!(lcd.clear(), Err(LcdError::Faulted));
    assert_eq!(lcd.set_cursor(1, 1), Err(LcdError::Faulted));
    assert_eq!(lcd.blink(), Err(LcdError::Faulted));
    assert_eq!(lcd.create_char(0, &[0; 8]), Err(LcdError::Faulted));
    assert_eq!(lcd.no_backlight(), Err(LcdError::Faulted));
    assert_eq!(lcd.write(b'x'), Err(LcdError::Faulted));
    assert_eq!(lcd.begin(), Err(LcdError::Faulted));
    assert_eq!(bus.attempted_writes(), attempted);

    lcd.clear_transfer_status();
    lcd.begin().unwrap();
    assert!(bus.attempted_writes() > attempted);
    assert_eq!(lcd.last_transfer_status(), TransferStatus::Ok);
}
