// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use super::{Clock, PacketSink, StatusPublisher};
use crate::{encoder::PulseCounter, input::AnalogInput};

/// Periodically publish status packets until `stop` is set.
///
/// Publishing failures are logged and retried with the next tick.
/// Returns the publisher after stopping.
pub async fn status_task<C, A, K, S>(
    period: Duration,
    mut publisher: StatusPublisher<C, A, K, S>,
    stop: Arc<AtomicBool>,
) -> StatusPublisher<C, A, K, S>
where
    C: PulseCounter,
    A: AnalogInput,
    K: Clock,
    S: PacketSink,
{
    log::info!(
        "Publishing status every {millis} ms",
        millis = period.as_millis()
    );
    let mut interval = tokio::time::interval(period);
    // A late publish must not be followed by a burst of catch-up packets
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut failures = 0_u64;
    loop {
        interval.tick().await;
        if stop.load(Ordering::Acquire) {
            break;
        }
        match publisher.publish() {
            Ok(_) => {
                if failures > 0 {
                    log::info!("Publishing recovered after {failures} failure(s)");
                    failures = 0;
                }
            }
            Err(err) => {
                failures += 1;
                log::warn!("Failed to publish status: {err}");
            }
        }
    }
    log::info!("Status publishing stopped");
    publisher
}
