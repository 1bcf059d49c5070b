// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 10;

/// A window needs at least two samples for a difference.
pub const MIN_WINDOW: usize = 2;

/// Velocity from the endpoints of a rolling window of samples.
///
/// Spanning more time per estimate damps jitter at the cost of a
/// latency proportional to the window size.
#[derive(Debug, Clone)]
pub struct VelocitySmoother {
    window: usize,
    samples: VecDeque<(i32, u32)>,
}

impl VelocitySmoother {
    /// Create a new smoother.
    ///
    /// The window is raised to [`MIN_WINDOW`] if needed.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(MIN_WINDOW);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Append a sample and return the velocity in counts/sec.
    ///
    /// Duplicate timestamps are appended as is. Returns 0.0 if the
    /// window contains less than two samples or spans no time.
    pub fn update(&mut self, position: i32, timestamp_ms: u32) -> f64 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back((position, timestamp_ms));
        self.velocity()
    }

    #[must_use]
    pub fn velocity(&self) -> f64 {
        let (Some(&(oldest_position, oldest_ms)), Some(&(newest_position, newest_ms))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        if self.samples.len() < MIN_WINDOW {
            return 0.0;
        }
        let elapsed_ms = newest_ms.wrapping_sub(oldest_ms);
        if elapsed_ms == 0 {
            return 0.0;
        }
        let delta = f64::from(newest_position) - f64::from(oldest_position);
        delta / (f64::from(elapsed_ms) / 1000.0)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

impl Default for VelocitySmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
