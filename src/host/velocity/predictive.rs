// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// Position unchanged, the velocity decays to zero after the timeout.
    #[default]
    Idle,

    /// Position changed recently.
    Moving,
}

/// Velocity tracking for encoders with few pulses per revolution.
///
/// The last velocity is held between two position changes until
/// a timeout expires. Otherwise plain differencing would report
/// zero velocity most of the time while turning slowly.
///
/// The velocity is derived from the device timestamps. The timeout
/// is measured in host time, i.e. the velocity also decays if the
/// device stops publishing and the same packet is read repeatedly.
#[derive(Debug, Clone)]
pub struct PredictiveVelocityTracker {
    timeout: Duration,
    state: TrackerState,
    predicted_velocity: f64,
    last_change: Option<LastChange>,
}

#[derive(Debug, Clone, Copy)]
struct LastChange {
    position: i32,
    timestamp_ms: u32,
    at: Instant,
}

impl PredictiveVelocityTracker {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: TrackerState::Idle,
            predicted_velocity: 0.0,
            last_change: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub const fn predicted_velocity(&self) -> f64 {
        self.predicted_velocity
    }

    /// Feed the next sample and return the predicted velocity in counts/sec.
    ///
    /// `now` is the host time when the sample has been received.
    /// The first sample only establishes the baseline.
    pub fn update(&mut self, position: i32, timestamp_ms: u32, now: Instant) -> f64 {
        let Some(last_change) = self.last_change else {
            self.last_change = Some(LastChange {
                position,
                timestamp_ms,
                at: now,
            });
            return self.predicted_velocity;
        };
        if position == last_change.position {
            if now.saturating_duration_since(last_change.at) > self.timeout {
                self.predicted_velocity = 0.0;
                self.state = TrackerState::Idle;
            }
            return self.predicted_velocity;
        }
        let elapsed_ms = timestamp_ms.wrapping_sub(last_change.timestamp_ms);
        if elapsed_ms == 0 {
            // Keep the baseline until time has passed
            return self.predicted_velocity;
        }
        let delta = f64::from(position) - f64::from(last_change.position);
        self.predicted_velocity = delta / (f64::from(elapsed_ms) / 1000.0);
        self.state = TrackerState::Moving;
        self.last_change = Some(LastChange {
            position,
            timestamp_ms,
            at: now,
        });
        self.predicted_velocity
    }

    pub fn reset(&mut self) {
        self.state = TrackerState::Idle;
        self.predicted_velocity = 0.0;
        self.last_change = None;
    }
}

impl Default for PredictiveVelocityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
