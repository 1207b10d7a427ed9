//! Channel source fed by an external transport

use tokio::sync::mpsc;
use tracing::trace;

use crate::source::PacketSource;
use crate::{LinkError, Result};

/// Create a bounded packet channel.
///
/// The transport keeps the [`PacketSender`]; the [`ChannelSource`] goes to
/// the link driver. The link closes when every sender is dropped.
pub fn channel(capacity: usize, nominal_rate: f64) -> (PacketSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PacketSender { tx }, ChannelSource { rx, nominal_rate })
}

/// Transport-side handle.
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl PacketSender {
    /// Send a packet, waiting for room in the channel.
    pub async fn send(&self, packet: Vec<u8>) -> Result<()> {
        self.tx.send(packet).await.map_err(|_| LinkError::Closed)
    }

    /// Send without waiting. A full channel is a source failure: the
    /// transport is outpacing the link.
    pub fn try_send(&self, packet: Vec<u8>) -> Result<()> {
        self.tx.try_send(packet).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::source_failed("packet channel full"),
            mpsc::error::TrySendError::Closed(_) => LinkError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Driver-side end of a packet channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
    nominal_rate: f64,
}

#[async_trait::async_trait]
impl PacketSource for ChannelSource {
    async fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        let packet = self.rx.recv().await;
        if let Some(packet) = &packet {
            trace!("Received {} byte packet", packet.len());
        }
        Ok(packet)
    }

    fn nominal_rate(&self) -> f64 {
        self.nominal_rate
    }
}
