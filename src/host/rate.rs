// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Mapping of encoder movements onto playback rates.

use serde::{Deserialize, Serialize};

use super::velocity::SmoothedSample;
use crate::deck::{PLAYBACK_RATE_DEFAULT, PLAYBACK_RATE_PAUSED};

pub const DEFAULT_VELOCITY_SCALE: f64 = 100.0;

pub const DEFAULT_POSITION_CENTER: f64 = 1000.0;

pub const DEFAULT_POSITION_RANGE: f64 = 500.0;

pub const DEFAULT_NORMAL_SPEED: f64 = 0.5;

pub const DEFAULT_STOP_THRESHOLD: f64 = 0.5;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.9;

pub const DEFAULT_MIN_RATE: f64 = 0.0;

pub const DEFAULT_MAX_RATE: f64 = 3.0;

/// How encoder movements control the playback rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ControlMode {
    /// Normal speed at rest, turning speeds up or slows down.
    Velocity {
        /// Counts/sec that add 1.0 to the rate
        #[serde(default = "default_velocity_scale")]
        velocity_scale: f64,
    },

    /// The absolute position selects the rate.
    Position {
        /// Position of normal speed
        #[serde(default = "default_position_center")]
        center: f64,
        /// Distance from the center that adds 1.0 to the rate
        #[serde(default = "default_position_range")]
        range: f64,
    },

    /// The rate follows the rotation like a turntable platter.
    Turntable {
        /// Counts/sec of normal speed
        #[serde(default = "default_normal_speed")]
        normal_speed: f64,
        /// Counts/sec below which the platter is considered stopped
        #[serde(default = "default_stop_threshold")]
        stop_threshold: f64,
    },
}

const fn default_velocity_scale() -> f64 {
    DEFAULT_VELOCITY_SCALE
}

const fn default_position_center() -> f64 {
    DEFAULT_POSITION_CENTER
}

const fn default_position_range() -> f64 {
    DEFAULT_POSITION_RANGE
}

const fn default_normal_speed() -> f64 {
    DEFAULT_NORMAL_SPEED
}

const fn default_stop_threshold() -> f64 {
    DEFAULT_STOP_THRESHOLD
}

impl ControlMode {
    /// The unbounded rate requested by a sample.
    #[must_use]
    pub fn target_rate(&self, sample: &SmoothedSample) -> f64 {
        match *self {
            Self::Velocity { velocity_scale } => {
                PLAYBACK_RATE_DEFAULT + sample.velocity / velocity_scale
            }
            Self::Position { center, range } => {
                PLAYBACK_RATE_DEFAULT + (f64::from(sample.position) - center) / range
            }
            Self::Turntable {
                normal_speed,
                stop_threshold,
            } => {
                if sample.velocity.abs() < stop_threshold {
                    PLAYBACK_RATE_PAUSED
                } else {
                    sample.velocity / normal_speed
                }
            }
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::Velocity {
            velocity_scale: DEFAULT_VELOCITY_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateMapperConfig {
    pub mode: ControlMode,

    /// Weight of the target rate in (0, 1].
    ///
    /// Higher values are more responsive and less smooth.
    pub alpha: f64,

    pub min_rate: f64,

    pub max_rate: f64,

    /// Optional upper bound of the rate change per second.
    pub max_rate_delta_per_sec: Option<f64>,
}

impl Default for RateMapperConfig {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            alpha: DEFAULT_SMOOTHING_ALPHA,
            min_rate: DEFAULT_MIN_RATE,
            max_rate: DEFAULT_MAX_RATE,
            max_rate_delta_per_sec: None,
        }
    }
}

/// Control state of a single deck.
///
/// Bounds the target rate and smoothes the transitions between
/// consecutive rates.
#[derive(Debug, Clone)]
pub struct RateMapper {
    config: RateMapperConfig,
    current_rate: f64,
    last_timestamp_ms: Option<u32>,
}

impl RateMapper {
    #[must_use]
    pub const fn new(config: RateMapperConfig) -> Self {
        Self {
            config,
            current_rate: PLAYBACK_RATE_DEFAULT,
            last_timestamp_ms: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RateMapperConfig {
        &self.config
    }

    #[must_use]
    pub const fn current_rate(&self) -> f64 {
        self.current_rate
    }

    /// Update and return the current rate.
    ///
    /// An undefined target rate keeps the current rate. If the timestamp
    /// went backwards the elapsed time is zero, i.e. a slew limited rate
    /// is held for this update.
    pub fn update(&mut self, sample: &SmoothedSample) -> f64 {
        let elapsed_ms = self
            .last_timestamp_ms
            .replace(sample.timestamp_ms)
            .map(|last_timestamp_ms| {
                let elapsed_ms = sample.timestamp_ms.wrapping_sub(last_timestamp_ms);
                if elapsed_ms > u32::MAX / 2 { 0 } else { elapsed_ms }
            });
        let RateMapperConfig {
            mode,
            alpha,
            min_rate,
            max_rate,
            max_rate_delta_per_sec,
        } = self.config;
        let target_rate = mode.target_rate(sample);
        if target_rate.is_nan() {
            log::debug!("Ignoring undefined target rate for {sample:?}");
            return self.current_rate;
        }
        let target_rate = target_rate.max(min_rate).min(max_rate);
        let mut delta = alpha * (target_rate - self.current_rate);
        if let (Some(max_delta_per_sec), Some(elapsed_ms)) = (max_rate_delta_per_sec, elapsed_ms) {
            let max_delta = max_delta_per_sec * f64::from(elapsed_ms) / 1000.0;
            delta = delta.max(-max_delta).min(max_delta);
        }
        self.current_rate += delta;
        self.current_rate
    }
}

impl Default for RateMapper {
    fn default() -> Self {
        Self::new(Default::default())
    }
}
