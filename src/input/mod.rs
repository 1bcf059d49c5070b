// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Discrete buttons and potentiometers.

use std::{
    sync::atomic::{AtomicU64, AtomicU8, Ordering},
    time::Duration,
};

use derive_more::Display;
use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator as _};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Minimum spacing between two accepted presses of the same button.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Full scale value of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

/// The named buttons in bit order.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr, EnumIter, EnumCount,
)]
#[repr(u8)]
pub enum Button {
    #[display("SFX 1")]
    Sfx1,
    #[display("SFX 2")]
    Sfx2,
    #[display("SFX 3")]
    Sfx3,
    #[display("SFX 4")]
    Sfx4,
    #[display("Song 1")]
    Song1,
    #[display("Song 2")]
    Song2,
}

impl Button {
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of buttons, encoded as a bitmap with one bit per [`Button`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub const EMPTY: Self = Self(0);

    pub const ALL_BITS: u8 = (1 << Button::COUNT) - 1;

    /// Returns `None` if any unknown bit is set.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL_BITS != 0 {
            return None;
        }
        Some(Self(bits))
    }

    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub fn remove(&mut self, button: Button) {
        self.0 &= !button.bit();
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::iter().filter(move |button| self.contains(*button))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<T: IntoIterator<Item = Button>>(iter: T) -> Self {
        let mut set = Self::EMPTY;
        for button in iter {
            set.insert(button);
        }
        set
    }
}

const NEVER_PRESSED: u64 = u64::MAX;

/// Latches button presses until they have been reported.
///
/// Presses are edge-triggered: a button held down across multiple
/// reports is only reported once. All methods take `&self` and could
/// be invoked from interrupt handlers while another task reports
/// and clears the latched presses.
#[derive(Debug)]
pub struct ButtonLatch {
    pressed: AtomicU8,
    last_press_micros: [AtomicU64; Button::COUNT],
    debounce_micros: u64,
}

impl ButtonLatch {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            pressed: AtomicU8::new(0),
            last_press_micros: std::array::from_fn(|_| AtomicU64::new(NEVER_PRESSED)),
            debounce_micros: u64::try_from(debounce.as_micros()).unwrap_or(u64::MAX),
        }
    }

    /// Register a falling edge of `button` at `now_micros`.
    ///
    /// Returns `false` if the press has been rejected as contact bounce.
    pub fn press(&self, button: Button, now_micros: u64) -> bool {
        let last_press = &self.last_press_micros[button as usize];
        let last_press_micros = last_press.load(Ordering::Relaxed);
        if last_press_micros != NEVER_PRESSED
            && now_micros.wrapping_sub(last_press_micros) <= self.debounce_micros
        {
            return false;
        }
        last_press.store(now_micros, Ordering::Relaxed);
        self.pressed.fetch_or(button.bit(), Ordering::AcqRel);
        true
    }

    /// Buttons pressed since they have last been cleared.
    #[must_use]
    pub fn pressed(&self) -> ButtonSet {
        ButtonSet(self.pressed.load(Ordering::Acquire))
    }

    /// Clear the given buttons.
    ///
    /// Only the reported buttons should be cleared. Presses that have
    /// been latched in the meantime are preserved.
    pub fn clear(&self, buttons: ButtonSet) {
        self.pressed.fetch_and(!buttons.bits(), Ordering::AcqRel);
    }
}

impl Default for ButtonLatch {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[derive(Debug, Error)]
pub enum AdcError {
    #[error("ADC read failed: {0}")]
    ReadFailed(String),
}

/// A 12-bit analog input, e.g. a potentiometer.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, AdcError>;
}

/// Map a raw 12-bit ADC value onto the interval [0, 1].
#[must_use]
pub fn u12_to_position(raw: u16) -> f64 {
    f64::from(raw.min(ADC_MAX)) / f64::from(ADC_MAX)
}
