// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Host side: from raw packets to playback rates.

pub mod decode;

pub mod poll;

pub mod rate;

#[cfg(feature = "poll-thread")]
pub mod thread;
#[cfg(feature = "poll-thread")]
pub use self::thread::PollThread;

pub mod velocity;
