//! Stream combinators for latest-value delivery

mod rate_limit;

pub use rate_limit::{RateLimit, RateLimitExt};
