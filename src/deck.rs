// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Virtual DJ decks controlled by the encoders.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

/// Normal playback speed.
pub const PLAYBACK_RATE_DEFAULT: f64 = 1.0;

pub const PLAYBACK_RATE_PAUSED: f64 = 0.0;

#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumCount,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Deck {
    #[display("deck 1")]
    One,
    #[display("deck 2")]
    Two,
}

/// External audio sink with a controllable playback rate.
///
/// This is the only coupling between the control pipeline and the
/// audio pipeline.
pub trait RateSink {
    /// Set the playback rate multiplier.
    ///
    /// A value of 1.0 means normal playback speed and 0.0 means halt.
    /// Negative values play backwards if the sink supports it.
    fn set_playback_rate(&mut self, rate: f64);
}

impl<T> RateSink for &mut T
where
    T: RateSink + ?Sized,
{
    fn set_playback_rate(&mut self, rate: f64) {
        (**self).set_playback_rate(rate);
    }
}

impl<T> RateSink for Box<T>
where
    T: RateSink + ?Sized,
{
    fn set_playback_rate(&mut self, rate: f64) {
        (**self).set_playback_rate(rate);
    }
}
