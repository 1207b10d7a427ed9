//! Type-safe consumption layer for real-time eye-tracker link telemetry.
//!
//! A tracker streams samples, eye-movement events, messages, button and input
//! changes and block framing records over a lossy, bandwidth-limited link.
//! Gazelink decodes that stream and keeps it usable under load.
//!
//! # Features
//!
//! - **Typed records**: one [`Record`] variant per record kind, with field
//!   presence carried by flags and absent values surfaced as `None`
//! - **Bounded queue**: oldest-first delivery within a byte budget, with
//!   losses reported as [`GapFlags`] on the next delivered record
//! - **Latest value**: newest sample or event polling and streams that never
//!   disturb the ordered path
//! - **Block framing**: link status queries and blocking waits with a
//!   cooperative terminal break
//! - **Kinematics**: online velocity and acceleration from the recent
//!   sample history with four window models
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gazelink::{GazeLink, LinkConfig, VelocityModel};
//! use gazelink::sources::ReplaySource;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> gazelink::Result<()> {
//!     # let packets: Vec<Vec<u8>> = Vec::new();
//!     let source = ReplaySource::new(packets, 500.0).paced();
//!     let link = GazeLink::open(source, LinkConfig::default())?;
//!
//!     if !link.wait_for_block_start(Duration::from_secs(1), true, false).await {
//!         return Ok(());
//!     }
//!     while link.wait_for_data(Duration::from_millis(100), true, false).await {
//!         while let Some(delivered) = link.next_sample() {
//!             if delivered.gaps.samples_dropped() {
//!                 println!("samples lost before {}", delivered.record.time());
//!             }
//!         }
//!         let speed = link.velocity(VelocityModel::NineSample);
//!         println!("left eye speed: {:?}", speed.left);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
pub mod wire;

// Link processing
pub mod framing;
pub mod kinematics;
pub mod link;

// Stream-based delivery
pub mod connection;
pub mod driver;
pub mod source;
pub mod sources;
pub mod stream;

// Core exports
pub use config::LinkConfig;
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::LinkConnection;
pub use kinematics::{KinematicEstimate, VelocityModel};
pub use link::{Delivered, LinkStats, LinkStatus};
pub use source::PacketSource;

/// Unified entry point for link connections.
///
/// # Examples
///
/// ## Transport-fed link
/// ```rust,no_run
/// use gazelink::{GazeLink, LinkConfig};
///
/// #[tokio::main]
/// async fn main() -> gazelink::Result<()> {
///     let (sender, link) = GazeLink::channel(LinkConfig::default(), 1024, 1000.0)?;
///     // Hand `sender` to the transport, read from `link`...
///     # drop((sender, link));
///     Ok(())
/// }
/// ```
pub struct GazeLink;

impl GazeLink {
    /// Open a link fed by `source`.
    ///
    /// Spawns the driver task, so this must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open<S: PacketSource>(source: S, config: LinkConfig) -> Result<LinkConnection> {
        LinkConnection::open(source, config)
    }

    /// Replay recorded packets as fast as the consumer reads them.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # #[tokio::main]
    /// # async fn main() -> gazelink::Result<()> {
    /// let packets: Vec<Vec<u8>> = Vec::new();
    /// let link = gazelink::GazeLink::replay(packets, 1000.0)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn replay(packets: Vec<Vec<u8>>, nominal_rate: f64) -> Result<LinkConnection> {
        Self::open(sources::ReplaySource::new(packets, nominal_rate), LinkConfig::default())
    }

    /// Open a link fed through a bounded channel by an external transport.
    pub fn channel(
        config: LinkConfig,
        capacity: usize,
        nominal_rate: f64,
    ) -> Result<(sources::PacketSender, LinkConnection)> {
        let (sender, source) = sources::channel(capacity, nominal_rate);
        Ok((sender, Self::open(source, config)?))
    }
}
