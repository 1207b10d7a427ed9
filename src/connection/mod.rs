//! Link connections
//!
//! [`LinkConnection`] is the consumer API: ordered delivery with gap flags,
//! latest-value polling and streams, link status queries, blocking waits with
//! a terminal break, and kinematics over the recent sample history.

pub mod link;

pub use link::LinkConnection;

#[cfg(test)]
mod tests;
