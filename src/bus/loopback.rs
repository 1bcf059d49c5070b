// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! In-memory transport that connects a publisher with a poller.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use super::{BusReader, ReadError};
use crate::{
    device::{PacketSink, PublishError},
    packet::PACKET_SIZE,
};

/// The most recently published packet, shared by both ends.
///
/// Publishing replaces the previous packet. Reading does not consume
/// it, i.e. a slow publisher results in duplicate reads just like a
/// real bus register.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    latest: Arc<Mutex<Option<[u8; PACKET_SIZE]>>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current contents.
    #[must_use]
    pub fn latest(&self) -> Option<[u8; PACKET_SIZE]> {
        self.latest.lock().ok().and_then(|latest| *latest)
    }
}

impl PacketSink for SharedBuffer {
    fn publish(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), PublishError> {
        // A contended lock must not block the publishing task
        let mut latest = self.latest.try_lock().map_err(|err| match err {
            std::sync::TryLockError::WouldBlock => PublishError::Busy,
            std::sync::TryLockError::Poisoned(err) => {
                PublishError::Unavailable(err.to_string())
            }
        })?;
        *latest = Some(*packet);
        Ok(())
    }
}

impl BusReader for SharedBuffer {
    fn read_packet(
        &mut self,
        buf: &mut [u8; PACKET_SIZE],
    ) -> impl Future<Output = Result<(), ReadError>> {
        let result = self
            .latest
            .lock()
            .map_err(|err| ReadError::Bus(err.to_string()))
            .and_then(|latest| (*latest).ok_or(ReadError::NoData))
            .map(|latest| *buf = latest);
        std::future::ready(result)
    }
}
