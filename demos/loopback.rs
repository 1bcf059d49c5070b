// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

//! Simulated device and host connected by an in-memory bus.
//!
//! Turns the first encoder forward, holds it, and turns it backwards
//! while the playback rates are logged. Run with `RUST_LOG=info` and an
//! optional YAML configuration file as argument.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use spindeck::{
    bus::SharedBuffer,
    device::{task::status_task, AnalogInputs, BootClock},
    encoder::{PhaseLevels, QuadratureDecoder},
    host::PollThread,
    AdcError, AnalogInput, Button, ButtonLatch, Config, Deck, Poller, RateSink, StatusPublisher,
};

/// Quadrature phases in forward order.
const PHASES: [PhaseLevels; 4] = [
    PhaseLevels::new(false, false),
    PhaseLevels::new(true, false),
    PhaseLevels::new(true, true),
    PhaseLevels::new(false, true),
];

#[derive(Debug)]
struct FixedLevel(u16);

impl AnalogInput for FixedLevel {
    fn read_raw(&mut self) -> Result<u16, AdcError> {
        Ok(self.0)
    }
}

#[derive(Debug)]
struct LoggingSink {
    deck: Deck,
}

impl RateSink for LoggingSink {
    fn set_playback_rate(&mut self, rate: f64) {
        log::info!("{deck}: playback rate = {rate:.3}", deck = self.deck);
    }
}

/// Feeds quadrature edges into a decoder like the counting peripheral.
#[derive(Debug)]
struct Platter {
    decoder: Arc<Mutex<QuadratureDecoder>>,
    phase: usize,
    started: Instant,
}

impl Platter {
    #[allow(clippy::cast_possible_truncation)]
    fn now_nanos(&self) -> u64 {
        self.started.elapsed().as_nanos() as u64
    }

    fn turn(&mut self, steps: i32, step_interval: Duration) -> anyhow::Result<()> {
        for _ in 0..steps.unsigned_abs() {
            self.phase = if steps > 0 {
                (self.phase + 1) % PHASES.len()
            } else {
                (self.phase + PHASES.len() - 1) % PHASES.len()
            };
            let at_nanos = self.now_nanos();
            {
                let mut decoder = self
                    .decoder
                    .lock()
                    .map_err(|err| anyhow::anyhow!("{err}"))?;
                decoder.observe(PHASES[self.phase], at_nanos);
                decoder.settle(at_nanos + 1_000);
            }
            std::thread::sleep(step_interval);
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };

    let bus = SharedBuffer::new();
    let counters = [
        Arc::new(Mutex::new(QuadratureDecoder::default())),
        Arc::new(Mutex::new(QuadratureDecoder::default())),
    ];
    let buttons = Arc::new(ButtonLatch::default());
    let publisher = StatusPublisher::new(
        counters.each_ref().map(Arc::clone),
        Arc::clone(&buttons),
        AnalogInputs {
            volume: FixedLevel(2048),
            slider: FixedLevel(1024),
        },
        BootClock::new(),
        bus.clone(),
        config.bus.packet_period(),
    );

    let stop_device = Arc::new(AtomicBool::new(false));
    let device_thread = std::thread::spawn({
        let stop = Arc::clone(&stop_device);
        let period = config.bus.packet_period();
        move || -> anyhow::Result<()> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(status_task(period, publisher, stop));
            Ok(())
        }
    });

    let decks = config
        .decks
        .iter()
        .map(|deck_config| {
            deck_config.deck_channel(LoggingSink {
                deck: deck_config.deck,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let poll_thread = PollThread::spawn(Poller::new(bus, decks), config.bus.poll_period())?;

    let [decoder, _] = counters;
    let mut platter = Platter {
        decoder,
        phase: 0,
        started: Instant::now(),
    };
    log::info!("Turning forward");
    platter.turn(400, Duration::from_millis(2))?;
    buttons.press(Button::Sfx1, 0);
    log::info!("Holding");
    std::thread::sleep(Duration::from_secs(1));
    log::info!("Turning backwards");
    platter.turn(-200, Duration::from_millis(4))?;

    let poller = poll_thread.stop_and_join()?;
    let stats = poller.stats();
    log::info!(
        "Read {total_reads} packets with an error rate of {error_rate:.3}",
        total_reads = stats.total_reads,
        error_rate = stats.error_rate()
    );

    stop_device.store(true, Ordering::Release);
    device_thread
        .join()
        .map_err(|err| anyhow::anyhow!("Device thread panicked: {err:?}"))??;
    Ok(())
}
