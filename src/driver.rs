//! Driver runs the single producer task of a link

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::link::LinkShared;
use crate::source::PacketSource;

/// Handle to a running driver task
pub struct DriverHandle {
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// The producer task; completes after the source ends or is cancelled
    pub task: JoinHandle<()>,
}

/// Driver spawns the producer task that feeds a link
///
/// The task owns the packet source and is the only writer into the link:
/// every packet is decoded and queued under the link lock, then waiters are
/// notified.
pub struct Driver;

impl Driver {
    /// Spawn the producer task for `source`.
    ///
    /// The task gives up after `max_errors` consecutive source failures.
    pub fn spawn<S>(source: S, link: Arc<LinkShared>, max_errors: u32) -> DriverHandle
    where
        S: PacketSource,
    {
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let task = tokio::spawn(async move {
            Self::packet_reader_task(source, link, cancel_task, max_errors.max(1)).await;
        });

        DriverHandle { cancel, task }
    }

    async fn packet_reader_task<S>(
        mut source: S,
        link: Arc<LinkShared>,
        cancel: CancellationToken,
        max_errors: u32,
    ) where
        S: PacketSource,
    {
        info!("Packet reader task started ({}Hz source)", source.nominal_rate());
        let mut packet_count = 0u64;
        let mut error_count = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("Packet reader cancelled");
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Packet reader cancelled during read");
                    break;
                }
                result = source.next_packet() => result,
            };

            match result {
                Ok(Some(packet)) => {
                    packet_count += 1;
                    error_count = 0;
                    let queued = link.ingest(&packet);
                    trace!("Packet {}: {} bytes, queued: {}", packet_count, packet.len(), queued);
                }
                Ok(None) => {
                    info!("Packet source ended after {} packets", packet_count);
                    break;
                }
                Err(e) => {
                    // Transient transport failures must not end the link
                    error_count += 1;
                    error!("Packet source error ({}/{}): {}", error_count, max_errors, e);

                    if error_count >= max_errors {
                        error!("Too many packet source errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    debug!("Retrying packet source in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        link.end_of_input();
        info!("Packet reader task ended (processed {} packets)", packet_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::test_utils::{packets, recording_session};
    use crate::{LinkError, Result};

    struct FlakySource {
        failures: u32,
        packets: Vec<Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl PacketSource for FlakySource {
        async fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(LinkError::source_failed("transport hiccup"));
            }
            Ok(self.packets.pop())
        }

        fn nominal_rate(&self) -> f64 {
            500.0
        }
    }

    fn link() -> Arc<LinkShared> {
        Arc::new(LinkShared::new(&LinkConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_transient_errors() {
        let _ = tracing_subscriber::fmt::try_init();
        let link = link();
        let source = FlakySource { failures: 3, packets: packets(&recording_session(2)) };
        let expected = source.packets.len();

        let handle = Driver::spawn(source, Arc::clone(&link), 10);
        handle.task.await.unwrap();

        assert!(link.input_ended());
        assert_eq!(link.lock().stats().decoded, expected as u64);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_errors() {
        let link = link();
        let source = FlakySource { failures: u32::MAX, packets: Vec::new() };

        let handle = Driver::spawn(source, Arc::clone(&link), 3);
        handle.task.await.unwrap();

        assert!(link.input_ended());
        assert_eq!(link.lock().stats().decoded, 0);
    }

    #[tokio::test]
    async fn cancellation_stops_the_task() {
        let link = link();
        let (_tx, source) = crate::sources::channel(4, 1000.0);

        let handle = Driver::spawn(source, Arc::clone(&link), 10);
        handle.cancel.cancel();
        handle.task.await.unwrap();
        assert!(link.input_ended());
    }
}
