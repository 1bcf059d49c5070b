// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use crate::{
    encoder::EncoderId,
    input::{u12_to_position, ButtonSet},
    packet::Packet,
};

pub use crate::packet::DecodeError;

/// Decoded state of a single encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderReading {
    pub position: i32,

    /// Velocity as measured by the device in counts/sec.
    pub velocity_raw: f64,
}

/// A decoded status packet.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub encoders: [EncoderReading; 2],

    /// Milliseconds since device boot.
    pub timestamp_ms: u32,

    pub buttons: ButtonSet,

    /// Normalized to [0, 1].
    pub volume: f64,

    /// Normalized to [0, 1].
    pub slider: f64,
}

impl StatusReport {
    #[must_use]
    pub const fn encoder(&self, id: EncoderId) -> EncoderReading {
        self.encoders[id.index()]
    }
}

impl From<&Packet> for StatusReport {
    fn from(packet: &Packet) -> Self {
        Self {
            encoders: packet.encoders.map(|encoder| EncoderReading {
                position: encoder.position,
                velocity_raw: encoder.velocity(),
            }),
            timestamp_ms: packet.timestamp_ms,
            buttons: packet.buttons,
            volume: u12_to_position(packet.pots.volume),
            slider: u12_to_position(packet.pots.slider),
        }
    }
}

/// Decode the bytes read from the bus.
///
/// Fails closed: the length is validated before any field is
/// interpreted, and implausible values are rejected.
pub fn decode_status(bytes: &[u8]) -> Result<StatusReport, DecodeError> {
    Packet::decode(bytes).map(|packet| StatusReport::from(&packet))
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::{
        input::Button,
        packet::{EncoderState, Potentiometers, PACKET_SIZE},
    };

    #[test]
    #[allow(clippy::float_cmp)]
    fn decode_example_packet() {
        let packet = Packet {
            encoders: [EncoderState::new(1234, 5.67), EncoderState::new(-50, -2.0)],
            timestamp_ms: 100_000,
            buttons: [Button::Sfx1, Button::Song2].into_iter().collect(),
            pots: Potentiometers {
                volume: 2048,
                slider: 4095,
            },
        };
        let report = decode_status(&packet.encode()).unwrap();
        let encoder1 = report.encoder(EncoderId::One);
        assert_eq!(1234, encoder1.position);
        assert_approx_eq!(f64, 5.67, encoder1.velocity_raw, epsilon = 1e-9);
        assert_eq!(-50, report.encoder(EncoderId::Two).position);
        assert_eq!(-2.0, report.encoder(EncoderId::Two).velocity_raw);
        assert_eq!(100_000, report.timestamp_ms);
        assert!(report.buttons.contains(Button::Sfx1));
        assert!(report.buttons.contains(Button::Song2));
        assert!(!report.buttons.contains(Button::Sfx2));
        assert_approx_eq!(f64, 2048.0 / 4095.0, report.volume);
        assert_eq!(1.0, report.slider);
    }

    #[test]
    fn short_read_is_rejected() {
        let bytes = [0; PACKET_SIZE - 1];
        assert_eq!(
            Err(DecodeError::InvalidLength {
                actual: PACKET_SIZE - 1
            }),
            decode_status(&bytes)
        );
    }
}
