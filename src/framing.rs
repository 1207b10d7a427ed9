//! Blocking waits layered over the link core
//!
//! Each wait re-checks its condition whenever a packet arrives, and at least
//! once per poll interval, until the condition holds, the timeout runs out,
//! the break token is cancelled, or the producer has finished and the
//! condition can no longer change. A zero timeout checks exactly once.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::link::{LinkCore, LinkShared};

/// Timing for a blocking wait.
#[derive(Debug, Clone, Copy)]
pub struct WaitParams {
    pub timeout: Duration,
    pub poll: Duration,
}

/// Consume records until every requested class is inside a block.
///
/// Records before the block start are discarded. Asking for both samples and
/// events when the tracker sends only one of them runs out the timeout.
pub async fn wait_for_block_start(
    shared: &LinkShared,
    brk: &CancellationToken,
    params: WaitParams,
    samples: bool,
    events: bool,
) -> bool {
    let started = wait_until(shared, brk, params, |core| {
        core.advance_to_block_start(samples, events)
    })
    .await;
    debug!(
        "Wait for block start (samples: {}, events: {}) {}",
        samples,
        events,
        if started { "succeeded" } else { "gave up" }
    );
    started
}

/// Wait until records of a requested class are queued.
pub async fn wait_for_data(
    shared: &LinkShared,
    brk: &CancellationToken,
    params: WaitParams,
    samples: bool,
    events: bool,
) -> bool {
    wait_until(shared, brk, params, |core| core.data_count(samples, events) > 0).await
}

async fn wait_until<F>(
    shared: &LinkShared,
    brk: &CancellationToken,
    params: WaitParams,
    mut ready: F,
) -> bool
where
    F: FnMut(&mut LinkCore) -> bool,
{
    let deadline = Instant::now() + params.timeout;
    let poll = params.poll.max(Duration::from_micros(100));

    loop {
        if brk.is_cancelled() {
            debug!("Wait interrupted by terminal break");
            return false;
        }

        // Register for the next arrival before checking, so one landing in
        // between still wakes us.
        let arrival = shared.arrival();
        tokio::pin!(arrival);
        arrival.as_mut().enable();

        let ended = shared.input_ended();
        let done = ready(&mut *shared.lock());
        if done {
            return true;
        }
        if ended {
            trace!("Input ended before the wait condition held");
            return false;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let nap = poll.min(deadline - now);

        tokio::select! {
            _ = brk.cancelled() => {}
            _ = &mut arrival => {}
            _ = tokio::time::sleep(nap) => {}
        }
    }
}
