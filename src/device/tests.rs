// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    cell::Cell,
    sync::{Arc, Mutex},
};

use super::*;
use crate::{
    encoder::{CounterError, PhaseLevels, QuadratureDecoder},
    input::{AdcError, Button, ButtonSet},
};

#[derive(Debug, Default)]
struct FixedCounter(i32);

impl PulseCounter for FixedCounter {
    fn read_count(&mut self) -> Result<i32, CounterError> {
        Ok(self.0)
    }

    fn clear_count(&mut self) -> Result<(), CounterError> {
        self.0 = 0;
        Ok(())
    }
}

#[derive(Debug)]
struct FixedAdc(Option<u16>);

impl AnalogInput for FixedAdc {
    fn read_raw(&mut self) -> Result<u16, AdcError> {
        self.0
            .ok_or_else(|| AdcError::ReadFailed("conversion timeout".to_owned()))
    }
}

#[derive(Debug, Default)]
struct ManualClock(Cell<u32>);

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Default)]
struct RecordingSink {
    fail: bool,
    published: Vec<[u8; PACKET_SIZE]>,
}

impl PacketSink for RecordingSink {
    fn publish(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Busy);
        }
        self.published.push(*packet);
        Ok(())
    }
}

type TestPublisher = StatusPublisher<FixedCounter, FixedAdc, ManualClock, RecordingSink>;

fn new_publisher(buttons: Arc<ButtonLatch>) -> TestPublisher {
    StatusPublisher::new(
        [FixedCounter::default(), FixedCounter::default()],
        buttons,
        AnalogInputs {
            volume: FixedAdc(Some(2800)),
            slider: FixedAdc(Some(950)),
        },
        ManualClock::default(),
        RecordingSink::default(),
        Duration::from_millis(10),
    )
}

#[test]
#[allow(clippy::float_cmp)]
fn publish_encodes_snapshot() {
    let mut publisher = new_publisher(Default::default());
    publisher.channel_mut(EncoderId::One).counter_mut().0 = 3;
    publisher.channel_mut(EncoderId::Two).counter_mut().0 = -2;
    publisher.clock.0.set(1234);
    let packet = publisher.publish().unwrap();
    assert_eq!(3, packet.encoder(EncoderId::One).position);
    // 3 counts within the nominal 10 ms period
    assert_eq!(300.0, packet.encoder(EncoderId::One).velocity());
    assert_eq!(-2, packet.encoder(EncoderId::Two).position);
    assert_eq!(-200.0, packet.encoder(EncoderId::Two).velocity());
    assert_eq!(1234, packet.timestamp_ms);
    assert_eq!(2800, packet.pots.volume);
    assert_eq!(950, packet.pots.slider);
    assert_eq!(vec![packet.encode()], publisher.sink().published);
}

#[test]
#[allow(clippy::float_cmp)]
fn velocity_is_relative_to_previous_sample() {
    let mut publisher = new_publisher(Default::default());
    publisher.channel_mut(EncoderId::One).counter_mut().0 = 10;
    publisher.publish().unwrap();
    publisher.channel_mut(EncoderId::One).counter_mut().0 = 12;
    let packet = publisher.publish().unwrap();
    assert_eq!(200.0, packet.encoder(EncoderId::One).velocity());
    let packet = publisher.publish().unwrap();
    assert_eq!(0.0, packet.encoder(EncoderId::One).velocity());
}

#[test]
fn buttons_are_cleared_after_publish() {
    let buttons = Arc::new(ButtonLatch::default());
    let mut publisher = new_publisher(Arc::clone(&buttons));
    buttons.press(Button::Sfx1, 0);
    buttons.press(Button::Song2, 0);
    let packet = publisher.publish().unwrap();
    assert_eq!(0b0010_0001, packet.buttons.bits());
    let packet = publisher.publish().unwrap();
    assert_eq!(ButtonSet::EMPTY, packet.buttons);
}

#[test]
fn buttons_stay_latched_after_failed_publish() {
    let buttons = Arc::new(ButtonLatch::default());
    let mut publisher = new_publisher(Arc::clone(&buttons));
    buttons.press(Button::Sfx3, 0);
    publisher.sink.fail = true;
    assert!(publisher.publish().is_err());
    publisher.sink.fail = false;
    let packet = publisher.publish().unwrap();
    assert!(packet.buttons.contains(Button::Sfx3));
}

#[test]
fn failed_adc_read_reports_zero() {
    let mut publisher = new_publisher(Default::default());
    publisher.pots.volume = FixedAdc(None);
    publisher.pots.slider = FixedAdc(Some(u16::MAX));
    let packet = publisher.publish().unwrap();
    assert_eq!(0, packet.pots.volume);
    assert_eq!(ADC_MAX, packet.pots.slider);
}

#[test]
fn counting_continues_while_publishing_fails() {
    let decoder = Arc::new(Mutex::new(
        QuadratureDecoder::default().with_glitch_filter(Duration::ZERO),
    ));
    let mut publisher = StatusPublisher::new(
        [Arc::clone(&decoder), Arc::new(Mutex::new(QuadratureDecoder::default()))],
        Default::default(),
        AnalogInputs {
            volume: FixedAdc(Some(0)),
            slider: FixedAdc(Some(0)),
        },
        ManualClock::default(),
        RecordingSink {
            fail: true,
            ..Default::default()
        },
        Duration::from_millis(10),
    );
    publisher.reset_positions();
    decoder
        .lock()
        .unwrap()
        .observe(PhaseLevels::new(true, false), 0);
    assert!(publisher.publish().is_err());
    decoder
        .lock()
        .unwrap()
        .observe(PhaseLevels::new(true, true), 0);
    publisher.sink.fail = false;
    let packet = publisher.publish().unwrap();
    assert_eq!(2, packet.encoder(EncoderId::One).position);
}

#[cfg(feature = "device-task")]
#[tokio::test]
async fn status_task_stops_on_request() {
    use std::sync::atomic::AtomicBool;

    let stop = Arc::new(AtomicBool::new(false));
    let task = task::status_task(
        Duration::from_millis(1),
        new_publisher(Default::default()),
        Arc::clone(&stop),
    );
    let handle = tokio::spawn(async move {
        let publisher = task.await;
        publisher.sink().published.len()
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.store(true, std::sync::atomic::Ordering::Release);
    let published = handle.await.unwrap();
    assert!(published > 0);
}
