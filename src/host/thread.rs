// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use super::poll::Poller;
use crate::{bus::BusReader, deck::RateSink};

/// Dedicated thread for polling a device.
///
/// Runs its own single-threaded Tokio runtime to avoid blocking
/// or being blocked by other tasks.
#[derive(Debug)]
pub struct PollThread<B, S> {
    stop: Arc<AtomicBool>,
    os_thread: std::thread::JoinHandle<anyhow::Result<Poller<B, S>>>,
}

impl<B, S> PollThread<B, S>
where
    B: BusReader + Send + 'static,
    S: RateSink + Send + 'static,
{
    pub fn spawn(mut poller: Poller<B, S>, period: Duration) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let os_thread = std::thread::Builder::new()
            .name("spindeck-poll".to_owned())
            .spawn({
                let stop = Arc::clone(&stop);
                move || -> anyhow::Result<Poller<B, S>> {
                    log::info!("Entering poll thread");
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_time()
                        .build()
                        .map_err(|err| {
                            log::error!("Failed to create Tokio runtime: {err}");
                            err
                        })?;
                    runtime.block_on(poller.run(period, &stop));
                    log::info!("Exiting poll thread");
                    Ok(poller)
                }
            })?;
        Ok(Self { stop, os_thread })
    }

    /// Request the poll loop to stop.
    ///
    /// An in-flight read is completed before the loop exits.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stop polling and wait for the thread to exit.
    ///
    /// Returns the poller with its final state.
    pub fn stop_and_join(self) -> anyhow::Result<Poller<B, S>> {
        self.stop();
        let Self { stop: _, os_thread } = self;
        os_thread
            .join()
            .map_err(|err| anyhow::anyhow!("Poll thread panicked: {err:?}"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::SharedBuffer,
        deck::Deck,
        device::PacketSink as _,
        encoder::EncoderId,
        host::poll::DeckChannel,
        packet::{EncoderState, Packet},
    };

    #[derive(Debug, Default)]
    struct LastRate(Option<f64>);

    impl RateSink for LastRate {
        fn set_playback_rate(&mut self, rate: f64) {
            self.0 = Some(rate);
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn poll_until_stopped() {
        let mut device = SharedBuffer::new();
        device
            .publish(
                &Packet {
                    encoders: [EncoderState::new(1000, 0.0), EncoderState::default()],
                    timestamp_ms: 1,
                    ..Default::default()
                }
                .encode(),
            )
            .unwrap();
        let poller = Poller::new(
            device.clone(),
            [DeckChannel::new(
                Deck::One,
                EncoderId::One,
                Default::default(),
                Default::default(),
                LastRate::default(),
            )],
        );
        let thread = PollThread::spawn(poller, Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let poller = thread.stop_and_join().unwrap();
        assert!(poller.stats().total_reads > 0);
        assert_eq!(0, poller.stats().read_errors);
        assert_eq!(Some(1.0), poller.decks()[0].sink().0);
    }
}
