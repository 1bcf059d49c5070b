// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! I2C master that reads status packets from a device.

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};

use super::{BusReader, ReadError};
use crate::packet::PACKET_SIZE;

/// 7-bit address of the device.
pub const DEFAULT_ADDRESS: u8 = 0x42;

/// Reads packets from a device with a single I2C read transaction.
#[derive(Debug)]
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cBus<I2C>
where
    I2C: I2c,
{
    /// Create a new bus reader.
    ///
    /// Takes ownership of the peripheral for exclusive access.
    #[must_use]
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn into_inner(self) -> I2C {
        self.i2c
    }
}

impl<I2C> BusReader for I2cBus<I2C>
where
    I2C: I2c,
{
    async fn read_packet(&mut self, buf: &mut [u8; PACKET_SIZE]) -> Result<(), ReadError> {
        self.i2c
            .read(self.address, buf)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NoAcknowledge(_) => ReadError::NoDevice,
                kind => ReadError::Bus(format!("{kind:?}")),
            })
    }
}
