//! Packet source implementations

pub mod channel;
pub mod replay;

pub use channel::{ChannelSource, PacketSender, channel};
pub use replay::ReplaySource;
