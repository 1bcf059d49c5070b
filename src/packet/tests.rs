// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use float_cmp::assert_approx_eq;

use super::*;
use crate::input::Button;

fn sample_packet() -> Packet {
    Packet {
        encoders: [EncoderState::new(1523, 42.3), EncoderState::new(-234, -15.7)],
        timestamp_ms: 82374,
        buttons: [Button::Sfx1, Button::Song2].into_iter().collect(),
        pots: Potentiometers {
            volume: 2800,
            slider: 950,
        },
    }
}

#[test]
fn encode_layout() {
    let bytes = sample_packet().encode();
    assert_eq!(1523i32.to_le_bytes(), bytes[0..4]);
    assert_eq!(4230i32.to_le_bytes(), bytes[4..8]);
    assert_eq!((-234i32).to_le_bytes(), bytes[8..12]);
    assert_eq!((-1570i32).to_le_bytes(), bytes[12..16]);
    assert_eq!(82374u32.to_le_bytes(), bytes[16..20]);
    assert_eq!(0b0010_0001, bytes[20]);
    assert_eq!(2800u16.to_le_bytes(), bytes[21..23]);
    assert_eq!(950u16.to_le_bytes(), bytes[23..25]);
}

#[test]
fn decode_encoded_packet() {
    let packet = Packet::decode(&sample_packet().encode()).unwrap();
    assert_eq!(sample_packet(), packet);
    assert_eq!(1523, packet.encoder(EncoderId::One).position);
    assert_approx_eq!(f64, 42.3, packet.encoder(EncoderId::One).velocity(), epsilon = 0.01);
    assert_eq!(-234, packet.encoder(EncoderId::Two).position);
    assert_approx_eq!(f64, -15.7, packet.encoder(EncoderId::Two).velocity(), epsilon = 0.01);
    assert_eq!(82374, packet.timestamp_ms);
    assert_eq!(
        vec![Button::Sfx1, Button::Song2],
        packet.buttons.iter().collect::<Vec<_>>()
    );
    assert_eq!(2800, packet.pots.volume);
    assert_eq!(950, packet.pots.slider);
}

#[test]
fn raw_sample_shares_timestamp() {
    let packet = sample_packet();
    let sample = packet.raw_sample(EncoderId::Two);
    assert_eq!(-234, sample.position);
    assert_eq!(-1570, sample.velocity_fixed_point);
    assert_eq!(82374, sample.timestamp_ms);
}

#[test]
fn decode_rejects_wrong_length() {
    let bytes = sample_packet().encode();
    assert_eq!(
        Err(DecodeError::InvalidLength { actual: 24 }),
        Packet::decode(&bytes[..24])
    );
    let mut long = bytes.to_vec();
    long.push(0);
    assert_eq!(
        Err(DecodeError::InvalidLength { actual: 26 }),
        Packet::decode(&long)
    );
    assert_eq!(
        Err(DecodeError::InvalidLength { actual: 0 }),
        Packet::decode(&[])
    );
}

#[test]
fn decode_rejects_unknown_buttons() {
    let mut bytes = sample_packet().encode();
    bytes[20] = 0b1000_0001;
    assert_eq!(
        Err(DecodeError::UnknownButtons { bits: 0b1000_0001 }),
        Packet::decode(&bytes)
    );
}

#[test]
fn decode_rejects_implausible_values() {
    let mut packet = sample_packet();
    packet.pots.slider = 4096;
    assert_eq!(
        Err(DecodeError::AdcOutOfRange { value: 4096 }),
        Packet::decode(&packet.encode())
    );
    let mut packet = sample_packet();
    packet.encoders[1].position = POSITION_MIN - 1;
    assert_eq!(
        Err(DecodeError::PositionOutOfRange {
            id: EncoderId::Two,
            position: POSITION_MIN - 1
        }),
        Packet::decode(&packet.encode())
    );
}

#[test]
fn fixed_point_rounds_to_nearest() {
    assert_eq!(4230, velocity_to_fixed_point(42.3));
    assert_eq!(-1570, velocity_to_fixed_point(-15.7));
    assert_eq!(1, velocity_to_fixed_point(0.005));
    assert_eq!(0, velocity_to_fixed_point(0.004));
}

#[test]
fn fixed_point_saturates() {
    assert_eq!(i32::MAX, velocity_to_fixed_point(f64::INFINITY));
    assert_eq!(i32::MIN, velocity_to_fixed_point(-1e300));
    assert_eq!(0, velocity_to_fixed_point(f64::NAN));
}
