// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

pub mod bus;
pub use self::bus::{BusReader, ReadError};

pub mod config;
pub use self::config::{Config, ConfigError};

pub mod deck;
pub use self::deck::{Deck, RateSink};

pub mod device;
pub use self::device::{Clock, PacketSink, PublishError, StatusPublisher};

pub mod encoder;
pub use self::encoder::{CounterError, EncoderChannel, EncoderId, PulseCounter};

pub mod host;
pub use self::host::{
    decode::{decode_status, DecodeError, EncoderReading, StatusReport},
    poll::{CycleOutcome, CycleReport, DeckChannel, Poller, ReadStats},
    rate::{ControlMode, RateMapper, RateMapperConfig},
    velocity::{SmoothedSample, VelocityEstimator},
};
#[cfg(feature = "poll-thread")]
pub use self::host::PollThread;

pub mod input;
pub use self::input::{AdcError, AnalogInput, Button, ButtonLatch, ButtonSet};

pub mod packet;
pub use self::packet::{Packet, Potentiometers, RawSample, PACKET_SIZE};
