//! I2C through the Linux `i2c-dev` interface, e.g. on a Raspberry Pi.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Linux I2C error: {0}")]
pub struct LinuxBusError(#[from] LinuxI2CError);

impl embedded_hal::i2c::Error for LinuxBusError {
    fn kind(&self) -> ErrorKind {
        // The kernel doesn't tell a NACK apart from other failures reliably.
        ErrorKind::Other
    }
}

/// An I2C bus opened from `/dev/i2c-N`.
///
/// The kernel binds a file descriptor to one slave address, so the address is switched whenever
/// a transaction targets a different device than the previous one.
pub struct LinuxI2cBus {
    path: PathBuf,
    dev: LinuxI2CDevice,
    address: u8,
}

impl LinuxI2cBus {
    /// Opens the bus device at `path`, initially addressing `address`.
    pub fn open(path: impl AsRef<Path>, address: u8) -> Result<Self, LinuxBusError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening {} for device {:#04x}", path.display(), address);
        let dev = LinuxI2CDevice::new(&path, address as u16)?;
        Ok(LinuxI2cBus { path, dev, address })
    }

    /// Opens `/dev/i2c-<bus>`.
    pub fn open_bus(bus: u8, address: u8) -> Result<Self, LinuxBusError> {
        Self::open(format!("/dev/i2c-{}", bus), address)
    }

    fn select(&mut self, address: u8) -> Result<(), LinuxBusError> {
        if address != self.address {
            self.dev.set_slave_address(address as u16)?;
            self.address = address;
        }
        Ok(())
    }
}

impl Debug for LinuxI2cBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxI2cBus")
            .field("path", &self.path)
            .field("address", &format_args!("{:#04x}", self.address))
            .finish()
    }
}

impl ErrorType for LinuxI2cBus {
    type Error = LinuxBusError;
}

impl I2c for LinuxI2cBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.select(address)?;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.dev.write(bytes)?,
                Operation::Read(buffer) => self.dev.read(buffer)?,
            }
        }
        Ok(())
    }
}
