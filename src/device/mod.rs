// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Device side: periodic status packets.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    encoder::{EncoderChannel, EncoderId, PulseCounter},
    input::{AnalogInput, ButtonLatch, ADC_MAX},
    packet::{EncoderState, Packet, Potentiometers, PACKET_SIZE},
};

#[cfg(feature = "device-task")]
pub mod task;

#[cfg(test)]
mod tests;

/// Nominal period between two velocity samples.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(10);

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since boot, wrapping around after ~49 days.
    fn now_millis(&self) -> u32;
}

/// Measures the time since it has been created.
#[derive(Debug, Clone, Copy)]
pub struct BootClock {
    boot: Instant,
}

impl BootClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BootClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_millis(&self) -> u32 {
        // Truncation implements the wrap around
        self.boot.elapsed().as_millis() as u32
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport busy")]
    Busy,

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Transport that exposes the latest packet to the host.
pub trait PacketSink {
    /// Replace the published packet.
    ///
    /// Must not block.
    fn publish(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), PublishError>;
}

impl<T> PacketSink for &mut T
where
    T: PacketSink + ?Sized,
{
    fn publish(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), PublishError> {
        (**self).publish(packet)
    }
}

/// The two potentiometers.
#[derive(Debug)]
pub struct AnalogInputs<A> {
    pub volume: A,
    pub slider: A,
}

/// Assembles and publishes status packets.
#[derive(Debug)]
pub struct StatusPublisher<C, A, K, S> {
    channels: [EncoderChannel<C>; 2],
    buttons: Arc<ButtonLatch>,
    pots: AnalogInputs<A>,
    clock: K,
    sink: S,
    sample_period: Duration,
    buf: [u8; PACKET_SIZE],
}

impl<C, A, K, S> StatusPublisher<C, A, K, S>
where
    C: PulseCounter,
    A: AnalogInput,
    K: Clock,
    S: PacketSink,
{
    /// Create a new publisher.
    ///
    /// The velocity is derived from the nominal `sample_period`, which
    /// should match the period of [`Self::publish()`] invocations.
    #[must_use]
    pub fn new(
        counters: [C; 2],
        buttons: Arc<ButtonLatch>,
        pots: AnalogInputs<A>,
        clock: K,
        sink: S,
        sample_period: Duration,
    ) -> Self {
        let [counter1, counter2] = counters;
        Self {
            channels: [
                EncoderChannel::new(EncoderId::One, counter1),
                EncoderChannel::new(EncoderId::Two, counter2),
            ],
            buttons,
            pots,
            clock,
            sink,
            sample_period,
            buf: [0; PACKET_SIZE],
        }
    }

    #[must_use]
    pub const fn sample_period(&self) -> Duration {
        self.sample_period
    }

    pub fn channel_mut(&mut self, id: EncoderId) -> &mut EncoderChannel<C> {
        &mut self.channels[id.index()]
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Reset both encoder positions to zero.
    pub fn reset_positions(&mut self) {
        for channel in &mut self.channels {
            channel.reset_position();
        }
    }

    /// Snapshot all inputs and publish a new packet.
    ///
    /// The latched button presses are only cleared after the packet
    /// has been published successfully. The encoders keep counting
    /// independent of the outcome.
    pub fn publish(&mut self) -> Result<Packet, PublishError> {
        let mut encoders = [EncoderState::default(); 2];
        for (encoder, channel) in encoders.iter_mut().zip(&mut self.channels) {
            let (position, velocity) = channel.sample(self.sample_period);
            *encoder = EncoderState::new(position, velocity);
        }
        let timestamp_ms = self.clock.now_millis();
        let buttons = self.buttons.pressed();
        let pots = Potentiometers {
            volume: read_adc(&mut self.pots.volume, "volume"),
            slider: read_adc(&mut self.pots.slider, "slider"),
        };
        let packet = Packet {
            encoders,
            timestamp_ms,
            buttons,
            pots,
        };
        packet.encode_into(&mut self.buf);
        self.sink.publish(&self.buf)?;
        self.buttons.clear(buttons);
        log::trace!("Published {packet:?}");
        Ok(packet)
    }
}

fn read_adc(input: &mut impl AnalogInput, name: &str) -> u16 {
    match input.read_raw() {
        Ok(raw) => raw.min(ADC_MAX),
        Err(err) => {
            log::warn!("Failed to read {name} potentiometer: {err}");
            0
        }
    }
}
