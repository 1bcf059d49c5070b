// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Host side of the polled transport.

use std::future::Future;

use thiserror::Error;

use crate::packet::PACKET_SIZE;

#[cfg(feature = "embedded-hal")]
pub mod i2c;
#[cfg(feature = "embedded-hal")]
pub use self::i2c::I2cBus;

pub mod loopback;
pub use self::loopback::SharedBuffer;

/// Transient failure while reading from the bus.
///
/// The caller is expected to skip the cycle and retry with the next one.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("no device responded")]
    NoDevice,

    #[error("no packet published yet")]
    NoData,

    #[error("bus error: {0}")]
    Bus(String),
}

/// Reads the latest status packet from a device.
pub trait BusReader {
    /// Read exactly [`PACKET_SIZE`] bytes into `buf`.
    ///
    /// A single transaction without retries. The contents of `buf`
    /// are unspecified if an error is returned.
    fn read_packet(
        &mut self,
        buf: &mut [u8; PACKET_SIZE],
    ) -> impl Future<Output = Result<(), ReadError>>;
}
