// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Host configuration.
//!
//! Stored as YAML, loaded and validated once at startup.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use strum::EnumCount as _;
use thiserror::Error;

use crate::{
    deck::{Deck, RateSink},
    encoder::EncoderId,
    host::{
        poll::{DeckChannel, DEFAULT_POLL_PERIOD},
        rate::{
            ControlMode, RateMapper, RateMapperConfig, DEFAULT_MAX_RATE, DEFAULT_MIN_RATE,
            DEFAULT_SMOOTHING_ALPHA,
        },
        velocity::{
            predictive::DEFAULT_TIMEOUT, smoother::DEFAULT_WINDOW, PredictiveVelocityTracker,
            VelocityEstimator, VelocitySmoother,
        },
    },
};


/// Minimum ratio between the poll period and the packet period.
pub const MIN_POLL_TO_PACKET_RATIO: u64 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid bus address {address:#04x}")]
    InvalidAddress { address: u8 },

    #[error("packet period must not be zero")]
    ZeroPacketPeriod,

    #[error("poll period of {poll_period_ms} ms is less than twice the packet period of {packet_period_ms} ms")]
    PollPeriodTooShort {
        poll_period_ms: u64,
        packet_period_ms: u64,
    },

    #[error("{count} decks configured, at most 2 are supported")]
    TooManyDecks { count: usize },

    #[error("{deck} configured more than once")]
    DuplicateDeck { deck: Deck },

    #[error("{deck}: unknown encoder {encoder}")]
    UnknownEncoder { deck: Deck, encoder: u8 },

    #[error("{encoder} is bound to more than one deck")]
    DuplicateEncoder { encoder: EncoderId },

    #[error("{deck}: velocity window of {window} samples is less than 2")]
    WindowTooSmall { deck: Deck, window: usize },

    #[error("{deck}: invalid {name} = {value}")]
    InvalidParameter {
        deck: Deck,
        name: &'static str,
        value: f64,
    },

    #[error("{deck}: min rate {min_rate} exceeds max rate {max_rate}")]
    InvalidRateBounds {
        deck: Deck,
        min_rate: f64,
        max_rate: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub decks: Vec<DeckConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: Default::default(),
            decks: vec![DeckConfig::new(Deck::One, EncoderId::One)],
        }
    }
}

impl Config {
    /// Load and validate the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_yaml_str(&contents)?;
        log::info!("Loaded configuration with {} deck(s)", config.decks.len());
        for deck in &config.decks {
            log::debug!("{deck:?}");
        }
        Ok(config)
    }

    /// Parse and validate the configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Check all parameters.
    ///
    /// Fails on the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bus.validate()?;
        if self.decks.len() > EncoderId::COUNT {
            return Err(ConfigError::TooManyDecks {
                count: self.decks.len(),
            });
        }
        let mut decks = HashSet::new();
        let mut encoders = HashSet::new();
        for deck_config in &self.decks {
            deck_config.validate()?;
            if !decks.insert(deck_config.deck) {
                return Err(ConfigError::DuplicateDeck {
                    deck: deck_config.deck,
                });
            }
            let encoder = deck_config.encoder_id()?;
            if !encoders.insert(encoder) {
                return Err(ConfigError::DuplicateEncoder { encoder });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// 7-bit device address
    pub address: u8,

    /// Host polling period
    pub poll_period_ms: u64,

    /// Device publishing period
    pub packet_period_ms: u64,
}

impl Default for BusConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            address: 0x42,
            poll_period_ms: DEFAULT_POLL_PERIOD.as_millis() as u64,
            packet_period_ms: crate::device::DEFAULT_SAMPLE_PERIOD.as_millis() as u64,
        }
    }
}

impl BusConfig {
    #[must_use]
    pub const fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    #[must_use]
    pub const fn packet_period(&self) -> Duration {
        Duration::from_millis(self.packet_period_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            address,
            poll_period_ms,
            packet_period_ms,
        } = *self;
        if address > 0x7f {
            return Err(ConfigError::InvalidAddress { address });
        }
        if packet_period_ms == 0 {
            return Err(ConfigError::ZeroPacketPeriod);
        }
        if poll_period_ms < packet_period_ms.saturating_mul(MIN_POLL_TO_PACKET_RATIO) {
            return Err(ConfigError::PollPeriodTooShort {
                poll_period_ms,
                packet_period_ms,
            });
        }
        Ok(())
    }
}

/// Velocity estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum VelocityConfig {
    Smoothed {
        #[serde(default = "default_window")]
        window: usize,
    },
    Predictive {
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self::Smoothed {
            window: DEFAULT_WINDOW,
        }
    }
}

impl VelocityConfig {
    #[must_use]
    pub fn estimator(&self) -> VelocityEstimator {
        match *self {
            Self::Smoothed { window } => VelocitySmoother::new(window).into(),
            Self::Predictive { timeout_ms } => {
                PredictiveVelocityTracker::new(Duration::from_millis(timeout_ms)).into()
            }
        }
    }
}

const fn default_window() -> usize {
    DEFAULT_WINDOW
}

#[allow(clippy::cast_possible_truncation)]
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

const fn default_smoothing_alpha() -> f64 {
    DEFAULT_SMOOTHING_ALPHA
}

const fn default_min_rate() -> f64 {
    DEFAULT_MIN_RATE
}

const fn default_max_rate() -> f64 {
    DEFAULT_MAX_RATE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckConfig {
    pub deck: Deck,

    /// Encoder number, either 1 or 2
    pub encoder: u8,

    #[serde(default)]
    pub control_mode: ControlMode,

    #[serde(default)]
    pub velocity: VelocityConfig,

    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,

    #[serde(default = "default_min_rate")]
    pub min_rate: f64,

    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rate_delta_per_sec: Option<f64>,
}

impl DeckConfig {
    /// Default parameters for a deck.
    #[must_use]
    pub fn new(deck: Deck, encoder: EncoderId) -> Self {
        Self {
            deck,
            encoder: encoder as u8,
            control_mode: Default::default(),
            velocity: Default::default(),
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            min_rate: DEFAULT_MIN_RATE,
            max_rate: DEFAULT_MAX_RATE,
            max_rate_delta_per_sec: None,
        }
    }

    pub fn encoder_id(&self) -> Result<EncoderId, ConfigError> {
        EncoderId::from_repr(self.encoder).ok_or(ConfigError::UnknownEncoder {
            deck: self.deck,
            encoder: self.encoder,
        })
    }

    #[must_use]
    pub const fn rate_mapper_config(&self) -> RateMapperConfig {
        RateMapperConfig {
            mode: self.control_mode,
            alpha: self.smoothing_alpha,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            max_rate_delta_per_sec: self.max_rate_delta_per_sec,
        }
    }

    /// Create the runtime state of the deck.
    pub fn deck_channel<S>(&self, sink: S) -> Result<DeckChannel<S>, ConfigError>
    where
        S: RateSink,
    {
        Ok(DeckChannel::new(
            self.deck,
            self.encoder_id()?,
            self.velocity.estimator(),
            RateMapper::new(self.rate_mapper_config()),
            sink,
        ))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let deck = self.deck;
        let invalid = |name, value| ConfigError::InvalidParameter { deck, name, value };
        self.encoder_id()?;
        match self.velocity {
            VelocityConfig::Smoothed { window } => {
                if window < 2 {
                    return Err(ConfigError::WindowTooSmall { deck, window });
                }
            }
            VelocityConfig::Predictive { timeout_ms } => {
                if timeout_ms == 0 {
                    return Err(invalid("timeout_ms", 0.0));
                }
            }
        }
        match self.control_mode {
            ControlMode::Velocity { velocity_scale } => {
                if !is_positive(velocity_scale) {
                    return Err(invalid("velocity_scale", velocity_scale));
                }
            }
            ControlMode::Position { center, range } => {
                if !center.is_finite() {
                    return Err(invalid("center", center));
                }
                if !is_positive(range) {
                    return Err(invalid("range", range));
                }
            }
            ControlMode::Turntable {
                normal_speed,
                stop_threshold,
            } => {
                if !is_positive(normal_speed) {
                    return Err(invalid("normal_speed", normal_speed));
                }
                if !(stop_threshold.is_finite() && stop_threshold >= 0.0) {
                    return Err(invalid("stop_threshold", stop_threshold));
                }
            }
        }
        let alpha = self.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(invalid("smoothing_alpha", alpha));
        }
        if !self.min_rate.is_finite() {
            return Err(invalid("min_rate", self.min_rate));
        }
        if !self.max_rate.is_finite() {
            return Err(invalid("max_rate", self.max_rate));
        }
        if self.min_rate > self.max_rate {
            return Err(ConfigError::InvalidRateBounds {
                deck,
                min_rate: self.min_rate,
                max_rate: self.max_rate,
            });
        }
        if let Some(max_rate_delta_per_sec) = self.max_rate_delta_per_sec {
            if !is_positive(max_rate_delta_per_sec) {
                return Err(invalid("max_rate_delta_per_sec", max_rate_delta_per_sec));
            }
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
