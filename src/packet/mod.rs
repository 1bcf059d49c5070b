// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Status packet wire format.
//!
//! Fixed layout of 25 bytes, all fields little-endian:
//!
//! | Offset | Size | Type | Field |
//! |--------|------|------|-------|
//! | 0      | 4    | i32  | Encoder 1 position |
//! | 4      | 4    | i32  | Encoder 1 velocity x100 |
//! | 8      | 4    | i32  | Encoder 2 position |
//! | 12     | 4    | i32  | Encoder 2 velocity x100 |
//! | 16     | 4    | u32  | Timestamp, ms since device boot |
//! | 20     | 1    | u8   | Button bitmap, bits 0-5 |
//! | 21     | 2    | u16  | Volume potentiometer, 0-4095 |
//! | 23     | 2    | u16  | Slider potentiometer, 0-4095 |

use strum::EnumCount as _;
use thiserror::Error;

use crate::{
    encoder::{EncoderId, POSITION_MAX, POSITION_MIN},
    input::{ButtonSet, ADC_MAX},
};

#[cfg(test)]
mod tests;

pub const PACKET_SIZE: usize = 25;

/// Scaling factor of the fixed-point velocity.
pub const VELOCITY_FIXED_POINT_SCALE: f64 = 100.0;

const ENCODER_OFFSETS: [usize; EncoderId::COUNT] = [0, 8];
const POSITION_OFFSET: usize = 0;
const VELOCITY_OFFSET: usize = 4;
const TIMESTAMP_OFFSET: usize = 16;
const BUTTONS_OFFSET: usize = 20;
const VOLUME_OFFSET: usize = 21;
const SLIDER_OFFSET: usize = 23;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid packet length: expected 25 bytes, got {actual}")]
    InvalidLength { actual: usize },

    #[error("unknown button bits: {bits:#010b}")]
    UnknownButtons { bits: u8 },

    #[error("ADC value out of range: {value}")]
    AdcOutOfRange { value: u16 },

    #[error("{id} position out of range: {position}")]
    PositionOutOfRange { id: EncoderId, position: i32 },
}

/// Convert a velocity in counts/sec into fixed-point.
///
/// Rounds to the nearest representable value. Out of range values
/// saturate and NaN maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn velocity_to_fixed_point(velocity: f64) -> i32 {
    // Float to int casts are saturating
    (velocity * VELOCITY_FIXED_POINT_SCALE).round() as i32
}

#[must_use]
pub fn fixed_point_to_velocity(fixed_point: i32) -> f64 {
    f64::from(fixed_point) / VELOCITY_FIXED_POINT_SCALE
}

/// Snapshot of a single encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderState {
    pub position: i32,

    /// Velocity in counts/sec x100
    pub velocity_fixed_point: i32,
}

impl EncoderState {
    #[must_use]
    pub fn new(position: i32, velocity: f64) -> Self {
        Self {
            position,
            velocity_fixed_point: velocity_to_fixed_point(velocity),
        }
    }

    #[must_use]
    pub fn velocity(&self) -> f64 {
        fixed_point_to_velocity(self.velocity_fixed_point)
    }
}

/// One sample of a single encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub position: i32,

    /// Velocity in counts/sec x100
    pub velocity_fixed_point: i32,

    /// Milliseconds since device boot
    pub timestamp_ms: u32,
}

impl RawSample {
    #[must_use]
    pub fn velocity(&self) -> f64 {
        fixed_point_to_velocity(self.velocity_fixed_point)
    }
}

/// Raw 12-bit potentiometer readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Potentiometers {
    pub volume: u16,
    pub slider: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Packet {
    pub encoders: [EncoderState; EncoderId::COUNT],

    /// Milliseconds since device boot
    pub timestamp_ms: u32,

    /// Buttons pressed since the previous packet
    pub buttons: ButtonSet,

    pub pots: Potentiometers,
}

impl Packet {
    #[must_use]
    pub const fn encoder(&self, id: EncoderId) -> EncoderState {
        self.encoders[id.index()]
    }

    #[must_use]
    pub const fn raw_sample(&self, id: EncoderId) -> RawSample {
        let EncoderState {
            position,
            velocity_fixed_point,
        } = self.encoder(id);
        RawSample {
            position,
            velocity_fixed_point,
            timestamp_ms: self.timestamp_ms,
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0; PACKET_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    pub fn encode_into(&self, buf: &mut [u8; PACKET_SIZE]) {
        for (encoder, offset) in self.encoders.iter().zip(ENCODER_OFFSETS) {
            write_bytes(
                buf,
                offset + POSITION_OFFSET,
                encoder.position.to_le_bytes(),
            );
            write_bytes(
                buf,
                offset + VELOCITY_OFFSET,
                encoder.velocity_fixed_point.to_le_bytes(),
            );
        }
        write_bytes(buf, TIMESTAMP_OFFSET, self.timestamp_ms.to_le_bytes());
        buf[BUTTONS_OFFSET] = self.buttons.bits();
        write_bytes(buf, VOLUME_OFFSET, self.pots.volume.to_le_bytes());
        write_bytes(buf, SLIDER_OFFSET, self.pots.slider.to_le_bytes());
    }

    /// Parse and validate a packet.
    ///
    /// Rejects packets of the wrong size and packets with implausible
    /// field values. Never returns a partially parsed packet.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let buf = <&[u8; PACKET_SIZE]>::try_from(bytes).map_err(|_| {
            DecodeError::InvalidLength {
                actual: bytes.len(),
            }
        })?;
        let mut encoders = [EncoderState::default(); EncoderId::COUNT];
        for (encoder, offset) in encoders.iter_mut().zip(ENCODER_OFFSETS) {
            *encoder = EncoderState {
                position: i32::from_le_bytes(read_bytes(buf, offset + POSITION_OFFSET)),
                velocity_fixed_point: i32::from_le_bytes(read_bytes(
                    buf,
                    offset + VELOCITY_OFFSET,
                )),
            };
        }
        let timestamp_ms = u32::from_le_bytes(read_bytes(buf, TIMESTAMP_OFFSET));
        let button_bits = buf[BUTTONS_OFFSET];
        let buttons = ButtonSet::from_bits(button_bits)
            .ok_or(DecodeError::UnknownButtons { bits: button_bits })?;
        let pots = Potentiometers {
            volume: u16::from_le_bytes(read_bytes(buf, VOLUME_OFFSET)),
            slider: u16::from_le_bytes(read_bytes(buf, SLIDER_OFFSET)),
        };
        let packet = Self {
            encoders,
            timestamp_ms,
            buttons,
            pots,
        };
        packet.validate()?;
        Ok(packet)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        for value in [self.pots.volume, self.pots.slider] {
            if value > ADC_MAX {
                return Err(DecodeError::AdcOutOfRange { value });
            }
        }
        for (encoder, id) in self.encoders.iter().zip([EncoderId::One, EncoderId::Two]) {
            if !(POSITION_MIN..=POSITION_MAX).contains(&encoder.position) {
                return Err(DecodeError::PositionOutOfRange {
                    id,
                    position: encoder.position,
                });
            }
        }
        Ok(())
    }
}

fn write_bytes<const N: usize>(buf: &mut [u8; PACKET_SIZE], offset: usize, bytes: [u8; N]) {
    buf[offset..offset + N].copy_from_slice(&bytes);
}

fn read_bytes<const N: usize>(buf: &[u8; PACKET_SIZE], offset: usize) -> [u8; N] {
    let mut bytes = [0; N];
    bytes.copy_from_slice(&buf[offset..offset + N]);
    bytes
}
