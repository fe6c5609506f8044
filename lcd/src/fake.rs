//! In-memory stand-ins for the bus, the delay and the watchdog.
//!
//! All three handles of a [FakeBus] append to one shared event log, so the exact interleaving of
//! writes, waits and watchdog refreshes can be inspected afterwards. Used by the tests and by the
//! dry-run mode of the test program.

use crate::hal::Watchdog;
use crate::hd44780::driver::{PIN_BACKLIGHT, PIN_E, PIN_RS};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::trace;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BusEvent {
    /// A byte acknowledged by the fake device.
    Write { address: u8, byte: u8 },
    /// A byte whose write was made to fail.
    Failed { address: u8, byte: u8 },
    Delay { ns: u64 },
    WatchdogRefresh,
}

/// A byte as the controller saw it, reassembled from two latched nibbles.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Sent {
    Command(u8),
    Data(u8),
}

#[derive(Debug, Default)]
struct FakeState {
    events: Vec<BusEvent>,
    attempted_writes: usize,
    fail_at: Option<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct FakeBus {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn i2c(&self) -> FakeI2c {
        FakeI2c { bus: self.clone() }
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay { bus: self.clone() }
    }

    pub fn watchdog(&self) -> FakeWatchdog {
        FakeWatchdog { bus: self.clone() }
    }

    /// Makes the `n`-th write attempted from now on (0-based) fail with a NACK. Only that one.
    pub fn fail_on_write(&self, n: usize) {
        let mut state = self.state();
        state.fail_at = Some(state.attempted_writes + n);
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state().events.clone()
    }

    /// Forgets all recorded events. The attempted write counter keeps going.
    pub fn clear(&self) {
        self.state().events.clear();
    }

    pub fn count(&self, predicate: impl Fn(&BusEvent) -> bool) -> usize {
        self.state().events.iter().filter(|&e| predicate(e)).count()
    }

    pub fn attempted_writes(&self) -> usize {
        self.state().attempted_writes
    }

    /// Bytes that reached the device, in order.
    pub fn written(&self) -> Vec<u8> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write { byte, .. } => Some(*byte),
                _ => None,
            })
            .collect()
    }

    /// Nibbles the controller latched, i.e. the writes with E high, without E and backlight.
    pub fn latched_nibbles(&self) -> Vec<u8> {
        self.written()
            .into_iter()
            .filter(|b| b & PIN_E != 0)
            .map(|b| b & !(PIN_E | PIN_BACKLIGHT))
            .collect()
    }

    /// Pairs up latched nibbles into the bytes the controller received.
    ///
    /// Only meaningful when the log starts on a byte boundary, so clear it after the init
    /// sequence, which sends lone nibbles.
    pub fn sent(&self) -> Vec<Sent> {
        self.latched_nibbles()
            .chunks_exact(2)
            .map(|pair| {
                let byte = (pair[0] & 0xF0) | (pair[1] >> 4);
                if pair[0] & PIN_RS != 0 {
                    Sent::Data(byte)
                } else {
                    Sent::Command(byte)
                }
            })
            .collect()
    }

    fn push(&self, event: BusEvent) {
        self.state().events.push(event);
    }
}

/// Fake expander that acknowledges every byte unless told otherwise.
#[derive(Debug, Clone)]
pub struct FakeI2c {
    bus: FakeBus,
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        let mut state = self.bus.state();
                        let index = state.attempted_writes;
                        state.attempted_writes += 1;
                        if state.fail_at == Some(index) {
                            state.fail_at = None;
                            state.events.push(BusEvent::Failed { address, byte });
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                        }
                        trace!("[fake] {:#04x} <- {:08b}", address, byte);
                        state.events.push(BusEvent::Write { address, byte });
                    }
                }
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}

/// Fake delay that records how long it was asked to wait, without waiting.
#[derive(Debug, Clone)]
pub struct FakeDelay {
    bus: FakeBus,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.bus.push(BusEvent::Delay { ns: ns as u64 });
    }

    fn delay_us(&mut self, us: u32) {
        self.bus.push(BusEvent::Delay { ns: us as u64 * 1_000 });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.push(BusEvent::Delay { ns: ms as u64 * 1_000_000 });
    }
}

#[derive(Debug, Clone)]
pub struct FakeWatchdog {
    bus: FakeBus,
}

impl Watchdog for FakeWatchdog {
    fn refresh(&mut self) {
        self.bus.push(BusEvent::WatchdogRefresh);
    }
}
