//! Packet source trait for link transports

use crate::Result;

/// Trait for the transport side of the link.
///
/// A source hands over one raw packet at a time and handles its own timing:
/// a network transport waits for datagrams, a replay paces itself or runs
/// flat out.
#[async_trait::async_trait]
pub trait PacketSource: Send + 'static {
    /// Get the next raw packet
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - A packet arrived
    /// - `Ok(None)` - The link closed (normal termination)
    /// - `Err(e)` - Transport failure, possibly transient
    async fn next_packet(&mut self) -> Result<Option<Vec<u8>>>;

    /// Nominal sample rate in Hz
    fn nominal_rate(&self) -> f64;
}
