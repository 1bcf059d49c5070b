// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Quadrature encoder channels.
//!
//! The counting itself happens autonomously in a [`PulseCounter`], e.g. a
//! hardware pulse counter unit or the software [`QuadratureDecoder`].
//! An [`EncoderChannel`] owns such a counter together with a software
//! offset and the bookkeeping needed for the periodic velocity sample.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use derive_more::Display;
use strum::{EnumCount, EnumIter, FromRepr};
use thiserror::Error;

pub mod quadrature;
pub use self::quadrature::{PhaseLevels, QuadratureDecoder};


/// Upper limit of the position counter.
pub const POSITION_MAX: i32 = 10_000;

/// Lower limit of the position counter.
pub const POSITION_MIN: i32 = -10_000;

/// Identifies one of the two encoder channels of a device.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[repr(u8)]
pub enum EncoderId {
    #[display("encoder 1")]
    One = 1,
    #[display("encoder 2")]
    Two = 2,
}

impl EncoderId {
    /// Zero-based index, e.g. for addressing per-encoder slots.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter peripheral unavailable: {0}")]
    Unavailable(String),
}

/// Edge counting peripheral of a single encoder.
///
/// Implementations count asynchronously, i.e. independent of how often
/// the count is read.
pub trait PulseCounter {
    /// Read the current count.
    fn read_count(&mut self) -> Result<i32, CounterError>;

    /// Reset the count to zero.
    fn clear_count(&mut self) -> Result<(), CounterError>;
}

impl<T> PulseCounter for &mut T
where
    T: PulseCounter + ?Sized,
{
    fn read_count(&mut self) -> Result<i32, CounterError> {
        (**self).read_count()
    }

    fn clear_count(&mut self) -> Result<(), CounterError> {
        (**self).clear_count()
    }
}

/// Counter that is shared with the context that feeds it, e.g. an
/// interrupt handler or a simulation.
impl<T> PulseCounter for Arc<Mutex<T>>
where
    T: PulseCounter,
{
    fn read_count(&mut self) -> Result<i32, CounterError> {
        self.lock()
            .map_err(|_| CounterError::Unavailable("counter lock poisoned".to_owned()))?
            .read_count()
    }

    fn clear_count(&mut self) -> Result<(), CounterError> {
        self.lock()
            .map_err(|_| CounterError::Unavailable("counter lock poisoned".to_owned()))?
            .clear_count()
    }
}

/// Owned handle of a single encoder channel.
#[derive(Debug)]
pub struct EncoderChannel<C> {
    id: EncoderId,
    counter: C,
    offset: i32,
    last_sample_position: i32,
}

impl<C> EncoderChannel<C>
where
    C: PulseCounter,
{
    #[must_use]
    pub const fn new(id: EncoderId, counter: C) -> Self {
        Self {
            id,
            counter,
            offset: 0,
            last_sample_position: 0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EncoderId {
        self.id
    }

    pub fn counter_mut(&mut self) -> &mut C {
        &mut self.counter
    }

    /// Current position, clamped to [`POSITION_MIN`]..=[`POSITION_MAX`].
    ///
    /// If the counter cannot be read the offset is returned instead.
    /// A failed read must never stall the caller.
    pub fn position(&mut self) -> i32 {
        match self.counter.read_count() {
            Ok(count) => count
                .saturating_add(self.offset)
                .clamp(POSITION_MIN, POSITION_MAX),
            Err(err) => {
                log::warn!("Failed to read {id} count: {err}", id = self.id);
                self.offset
            }
        }
    }

    /// Reset both the counter and the offset to zero.
    ///
    /// Intended to be invoked once at startup.
    pub fn reset_position(&mut self) {
        if let Err(err) = self.counter.clear_count() {
            log::warn!("Failed to clear {id} count: {err}", id = self.id);
        }
        self.offset = 0;
        self.last_sample_position = 0;
        log::info!("{id} position reset to 0", id = self.id);
    }

    /// Sample the current position and the velocity since the last sample.
    ///
    /// The velocity in counts/sec is derived from the nominal `sample_period`
    /// and not from the actual elapsed time.
    pub fn sample(&mut self, sample_period: Duration) -> (i32, f64) {
        let position = self.position();
        let delta = position - self.last_sample_position;
        self.last_sample_position = position;
        let period_secs = sample_period.as_secs_f64();
        let velocity = if period_secs > 0.0 {
            f64::from(delta) / period_secs
        } else {
            0.0
        };
        (position, velocity)
    }
}
