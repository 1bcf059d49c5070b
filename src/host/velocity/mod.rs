// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Velocity estimation from position samples.

use std::time::Instant;

pub mod predictive;
pub use self::predictive::{PredictiveVelocityTracker, TrackerState};

pub mod smoother;
pub use self::smoother::VelocitySmoother;

/// Position and estimated velocity of an encoder at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedSample {
    pub position: i32,

    /// Counts/sec
    pub velocity: f64,

    /// Milliseconds since device boot
    pub timestamp_ms: u32,
}

/// Velocity estimation strategy of an encoder.
///
/// Selected once from the configuration and fixed for a session.
#[derive(Debug, Clone)]
pub enum VelocityEstimator {
    /// Endpoint difference over a rolling window.
    Smoothed(VelocitySmoother),

    /// Hold the last velocity until a timeout for low-resolution encoders.
    Predictive(PredictiveVelocityTracker),
}

impl VelocityEstimator {
    /// Feed the next position sample and return the velocity estimate.
    ///
    /// `now` is the host time when the sample has been received. Only
    /// the predictive tracker needs it for its timeout.
    pub fn update(&mut self, position: i32, timestamp_ms: u32, now: Instant) -> f64 {
        match self {
            Self::Smoothed(smoother) => smoother.update(position, timestamp_ms),
            Self::Predictive(tracker) => tracker.update(position, timestamp_ms, now),
        }
    }

    /// Same as [`Self::update()`] but returns the whole sample.
    pub fn smooth(&mut self, position: i32, timestamp_ms: u32, now: Instant) -> SmoothedSample {
        let velocity = self.update(position, timestamp_ms, now);
        SmoothedSample {
            position,
            velocity,
            timestamp_ms,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        match self {
            Self::Smoothed(smoother) => smoother.reset(),
            Self::Predictive(tracker) => tracker.reset(),
        }
    }

    #[must_use]
    pub const fn is_predictive(&self) -> bool {
        matches!(self, Self::Predictive(_))
    }
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::Smoothed(Default::default())
    }
}

impl From<VelocitySmoother> for VelocityEstimator {
    fn from(from: VelocitySmoother) -> Self {
        Self::Smoothed(from)
    }
}

impl From<PredictiveVelocityTracker> for VelocityEstimator {
    fn from(from: PredictiveVelocityTracker) -> Self {
        Self::Predictive(from)
    }
}
