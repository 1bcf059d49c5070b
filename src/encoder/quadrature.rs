// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Software quadrature decoding with glitch filtering.

use std::time::Duration;

use super::{CounterError, PulseCounter, POSITION_MAX, POSITION_MIN};

/// Shortest level change that is accepted as a real transition.
///
/// Mechanical contact bounce produces sub-microsecond spikes that are
/// shorter than any legitimate transition.
pub const DEFAULT_GLITCH_FILTER: Duration = Duration::from_nanos(1_000);

/// Logic levels of the two phase lines A and B.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseLevels {
    pub a: bool,
    pub b: bool,
}

impl PhaseLevels {
    #[must_use]
    pub const fn new(a: bool, b: bool) -> Self {
        Self { a, b }
    }

    /// Position within the Gray code cycle 00 -> 10 -> 11 -> 01.
    const fn gray_index(self) -> u8 {
        match (self.a, self.b) {
            (false, false) => 0,
            (true, false) => 1,
            (true, true) => 2,
            (false, true) => 3,
        }
    }
}

/// Counts quadrature transitions at 4x resolution.
///
/// A leading B counts up, B leading A counts down. The count saturates
/// at the configured limits instead of wrapping around.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    low_limit: i32,
    high_limit: i32,
    glitch_filter_nanos: u64,
    count: i32,
    stable: PhaseLevels,
    pending: Option<(PhaseLevels, u64)>,
    illegal_transitions: u64,
}

impl QuadratureDecoder {
    #[must_use]
    pub fn new(initial: PhaseLevels) -> Self {
        Self {
            low_limit: POSITION_MIN,
            high_limit: POSITION_MAX,
            glitch_filter_nanos: duration_nanos(DEFAULT_GLITCH_FILTER),
            count: 0,
            stable: initial,
            pending: None,
            illegal_transitions: 0,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, low_limit: i32, high_limit: i32) -> Self {
        debug_assert!(low_limit <= 0);
        debug_assert!(high_limit >= 0);
        self.low_limit = low_limit;
        self.high_limit = high_limit;
        self.count = self.count.clamp(low_limit, high_limit);
        self
    }

    /// Pass [`Duration::ZERO`] to disable the filter.
    #[must_use]
    pub fn with_glitch_filter(mut self, glitch_filter: Duration) -> Self {
        self.glitch_filter_nanos = duration_nanos(glitch_filter);
        self
    }

    #[must_use]
    pub const fn count(&self) -> i32 {
        self.count
    }

    /// Number of transitions that skipped a state, i.e. missed edges.
    #[must_use]
    pub const fn illegal_transitions(&self) -> u64 {
        self.illegal_transitions
    }

    /// Feed the phase levels as observed at `at_nanos`.
    ///
    /// Timestamps must be monotonic. A changed level only becomes effective
    /// after it has been held for at least the glitch filter duration,
    /// which is detected by a subsequent observation or [`Self::settle()`].
    pub fn observe(&mut self, levels: PhaseLevels, at_nanos: u64) {
        if self.glitch_filter_nanos == 0 {
            self.pending = None;
            self.commit(levels);
            return;
        }
        self.settle(at_nanos);
        if levels == self.stable {
            if self.pending.take().is_some() {
                log::trace!("Discarding glitch at {at_nanos} ns");
            }
            return;
        }
        match self.pending {
            Some((pending, _)) if pending == levels => (),
            _ => self.pending = Some((levels, at_nanos)),
        }
    }

    /// Accept a pending level change if it has been held long enough.
    pub fn settle(&mut self, now_nanos: u64) {
        let Some((pending, since_nanos)) = self.pending else {
            return;
        };
        debug_assert!(now_nanos >= since_nanos);
        if now_nanos.saturating_sub(since_nanos) >= self.glitch_filter_nanos {
            self.pending = None;
            self.commit(pending);
        }
    }

    fn commit(&mut self, next: PhaseLevels) {
        let step = next
            .gray_index()
            .wrapping_sub(self.stable.gray_index())
            & 0b11;
        self.stable = next;
        let delta = match step {
            0 => return,
            1 => 1,
            3 => -1,
            _ => {
                self.illegal_transitions += 1;
                log::debug!("Illegal quadrature transition to {next:?}");
                return;
            }
        };
        self.count = self
            .count
            .saturating_add(delta)
            .clamp(self.low_limit, self.high_limit);
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new(PhaseLevels::default())
    }
}

impl PulseCounter for QuadratureDecoder {
    fn read_count(&mut self) -> Result<i32, CounterError> {
        Ok(self.count)
    }

    fn clear_count(&mut self) -> Result<(), CounterError> {
        self.count = 0;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_nanos(duration: Duration) -> u64 {
    // Saturating conversion from u128 to u64
    duration.as_nanos().min(u128::from(u64::MAX)) as u64
}
