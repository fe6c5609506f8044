use crate::display::LcdI2c;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An [LcdI2c] that can be shared between threads.
///
/// A multi-step operation (moving the cursor and then printing, say) has to run under a single
/// lock to come out right, so hold the guard from [SharedLcd::lock] or use [SharedLcd::with]
/// for the whole sequence. The lock is released when the guard is dropped, including on early
/// returns and panics.
///
/// The lock is **not reentrant**: locking again from the thread that holds it deadlocks.
#[derive(Debug)]
pub struct SharedLcd<I, D, W> {
    inner: Mutex<LcdI2c<I, D, W>>,
}

impl<I, D, W> SharedLcd<I, D, W> {
    pub fn new(lcd: LcdI2c<I, D, W>) -> Self {
        SharedLcd {
            inner: Mutex::new(lcd),
        }
    }

    /// Locks the display until the guard is dropped.
    ///
    /// A thread that panicked while holding the lock leaves the driver usable, since its state
    /// is just flags and a cursor position, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, LcdI2c<I, D, W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with the display locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut LcdI2c<I, D, W>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn into_inner(self) -> LcdI2c<I, D, W> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I, D, W> From<LcdI2c<I, D, W>> for SharedLcd<I, D, W> {
    fn from(lcd: LcdI2c<I, D, W>) -> Self {
        SharedLcd::new(lcd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LcdConfig;
    use crate::fake::{FakeBus, Sent};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sequences_from_threads_do_not_interleave() {
        let bus = FakeBus::new();
        let lcd = LcdI2c::new(bus.i2c(), bus.delay(), LcdConfig::new(0x27, 16, 2)).unwrap();
        let shared = Arc::new(SharedLcd::new(lcd));

        let handles: Vec<_> = (0..2u8)
            .map(|row| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..10 {
                        shared
                            .with(|lcd| {
                                lcd.set_cursor(0, row)?;
                                lcd.print_str(if row == 0 { "ab" } else { "cd" })
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let sent = bus.sent();
        assert_eq!(sent.len(), 60);
        for chunk in sent.chunks(3) {
            match chunk[0] {
                Sent::Command(0x80) => assert_eq!(chunk[1..], [Sent::Data(b'a'), Sent::Data(b'b')]),
                Sent::Command(0xC0) => assert_eq!(chunk[1..], [Sent::Data(b'c'), Sent::Data(b'd')]),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn guard_gives_access_to_state() {
        let bus = FakeBus::new();
        let lcd = LcdI2c::new(bus.i2c(), bus.delay(), LcdConfig::new(0x27, 16, 2)).unwrap();
        let shared = SharedLcd::from(lcd);

        shared.lock().set_cursor(7, 1).unwrap();

        let lcd = shared.into_inner();
        assert_eq!((lcd.current_column(), lcd.current_row()), (7, 1));
    }
}
