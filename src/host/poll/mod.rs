// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Periodic polling of a device.

use std::time::{Duration, Instant};

#[cfg(feature = "tokio")]
use std::sync::atomic::{AtomicBool, Ordering};

use float_cmp::approx_eq;

use super::{
    decode::{decode_status, DecodeError, StatusReport},
    rate::RateMapper,
    velocity::{SmoothedSample, VelocityEstimator},
};
use crate::{
    bus::{BusReader, ReadError},
    deck::{Deck, RateSink},
    encoder::EncoderId,
    packet::PACKET_SIZE,
};


pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(20);

/// A deck controlled by one of the encoders.
///
/// Owns all per-deck state.
#[derive(Debug)]
pub struct DeckChannel<S> {
    deck: Deck,
    encoder: EncoderId,
    estimator: VelocityEstimator,
    mapper: RateMapper,
    sink: S,
    last_applied_rate: Option<f64>,
}

impl<S> DeckChannel<S>
where
    S: RateSink,
{
    #[must_use]
    pub const fn new(
        deck: Deck,
        encoder: EncoderId,
        estimator: VelocityEstimator,
        mapper: RateMapper,
        sink: S,
    ) -> Self {
        Self {
            deck,
            encoder,
            estimator,
            mapper,
            sink,
            last_applied_rate: None,
        }
    }

    #[must_use]
    pub const fn deck(&self) -> Deck {
        self.deck
    }

    #[must_use]
    pub const fn encoder(&self) -> EncoderId {
        self.encoder
    }

    #[must_use]
    pub const fn mapper(&self) -> &RateMapper {
        &self.mapper
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Velocity is held between encoder ticks.
    #[must_use]
    pub const fn is_predictive(&self) -> bool {
        self.estimator.is_predictive()
    }

    fn process(&mut self, status: &StatusReport, now: Instant) -> DeckUpdate {
        let reading = status.encoder(self.encoder);
        let sample = self
            .estimator
            .smooth(reading.position, status.timestamp_ms, now);
        let rate = self.mapper.update(&sample);
        let applied = !self
            .last_applied_rate
            .is_some_and(|last_applied_rate| approx_eq!(f64, last_applied_rate, rate, ulps = 2));
        if applied {
            self.sink.set_playback_rate(rate);
            self.last_applied_rate = Some(rate);
        }
        DeckUpdate {
            deck: self.deck,
            sample,
            predicted: self.estimator.is_predictive(),
            rate,
            applied,
        }
    }
}

/// Outcome of a single deck within a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckUpdate {
    pub deck: Deck,
    pub sample: SmoothedSample,

    /// The velocity of `sample` has been predicted, i.e. it might be
    /// held from an earlier encoder tick.
    pub predicted: bool,

    pub rate: f64,

    /// `false` if the rate was unchanged and has not been written to the sink.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub status: StatusReport,
    pub decks: Vec<DeckUpdate>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Applied(CycleReport),

    /// The bus read failed. All rates are left unchanged.
    TransientFailure(ReadError),

    /// The packet has been rejected. All rates are left unchanged.
    Malformed(DecodeError),
}

impl CycleOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Read statistics of a poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub total_reads: u64,
    pub read_errors: u64,
    pub malformed_packets: u64,
}

impl ReadStats {
    /// Fraction of failed or rejected reads.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(&self) -> f64 {
        if self.total_reads == 0 {
            return 0.0;
        }
        (self.read_errors + self.malformed_packets) as f64 / self.total_reads as f64
    }
}

/// Reads packets from a device and controls the decks.
///
/// The only writer of the per-deck state.
#[derive(Debug)]
pub struct Poller<B, S> {
    bus: B,
    decks: Vec<DeckChannel<S>>,
    stats: ReadStats,
    last_timestamp_ms: Option<u32>,
    buf: [u8; PACKET_SIZE],
}

impl<B, S> Poller<B, S>
where
    B: BusReader,
    S: RateSink,
{
    #[must_use]
    pub fn new(bus: B, decks: impl IntoIterator<Item = DeckChannel<S>>) -> Self {
        Self {
            bus,
            decks: decks.into_iter().collect(),
            stats: Default::default(),
            last_timestamp_ms: None,
            buf: [0; PACKET_SIZE],
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &ReadStats {
        &self.stats
    }

    #[must_use]
    pub fn decks(&self) -> &[DeckChannel<S>] {
        &self.decks
    }

    #[must_use]
    pub fn deck(&self, deck: Deck) -> Option<&DeckChannel<S>> {
        self.decks.iter().find(|channel| channel.deck == deck)
    }

    /// Forget the velocity history of all decks.
    ///
    /// The playback rates are not affected.
    pub fn reset_estimators(&mut self) {
        for channel in &mut self.decks {
            channel.estimator.reset();
        }
        self.last_timestamp_ms = None;
    }

    /// Run a single cycle: read, decode, estimate, map, and apply.
    ///
    /// Failures only skip the cycle.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        self.poll_once_at(Instant::now()).await
    }

    /// Same as [`Self::poll_once()`] with the host time of the cycle.
    pub async fn poll_once_at(&mut self, now: Instant) -> CycleOutcome {
        self.stats.total_reads += 1;
        if let Err(err) = self.bus.read_packet(&mut self.buf).await {
            self.stats.read_errors += 1;
            return CycleOutcome::TransientFailure(err);
        }
        let status = match decode_status(&self.buf) {
            Ok(status) => status,
            Err(err) => {
                self.stats.malformed_packets += 1;
                return CycleOutcome::Malformed(err);
            }
        };
        if let Some(last_timestamp_ms) = self.last_timestamp_ms {
            // Differences beyond half the range are negative, i.e. a restart
            // and not a wrap around of the device clock.
            if status.timestamp_ms.wrapping_sub(last_timestamp_ms) > u32::MAX / 2 {
                log::info!(
                    "Device timestamp went backwards from {last_timestamp_ms} ms to {timestamp_ms} ms: Resetting velocity estimation",
                    timestamp_ms = status.timestamp_ms
                );
                self.reset_estimators();
            }
        }
        self.last_timestamp_ms = Some(status.timestamp_ms);
        let decks = self
            .decks
            .iter_mut()
            .map(|channel| channel.process(&status, now))
            .collect();
        CycleOutcome::Applied(CycleReport { status, decks })
    }
}

#[cfg(feature = "tokio")]
impl<B, S> Poller<B, S>
where
    B: BusReader,
    S: RateSink,
{
    /// Poll periodically until `stop` is set.
    ///
    /// The flag is checked once per cycle before reading, i.e. an
    /// in-flight read always completes.
    pub async fn run(&mut self, period: Duration, stop: &AtomicBool) {
        log::info!(
            "Polling every {millis} ms",
            millis = period.as_millis()
        );
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut failing = false;
        loop {
            interval.tick().await;
            if stop.load(Ordering::Acquire) {
                break;
            }
            let outcome = self.poll_once().await;
            match outcome {
                CycleOutcome::Applied(report) => {
                    if failing {
                        log::info!("Polling recovered");
                        failing = false;
                    }
                    log::trace!("{report:?}");
                }
                CycleOutcome::TransientFailure(err) => {
                    log_failure(&mut failing, format_args!("Failed to read packet: {err}"));
                }
                CycleOutcome::Malformed(err) => {
                    log_failure(&mut failing, format_args!("Rejected packet: {err}"));
                }
            }
        }
        log::info!(
            "Polling stopped: {stats:?}, error rate = {error_rate:.3}",
            stats = self.stats,
            error_rate = self.stats.error_rate()
        );
    }
}

/// Warn once when entering the failure state.
#[cfg(feature = "tokio")]
fn log_failure(failing: &mut bool, message: std::fmt::Arguments<'_>) {
    if *failing {
        log::debug!("{message}");
    } else {
        log::warn!("{message}");
        *failing = true;
    }
}
