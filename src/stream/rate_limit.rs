//! Latest-wins rate limiting

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add rate limiting to any Stream
pub trait RateLimitExt: Stream {
    /// Yield at most once per `period`.
    ///
    /// Items arriving faster than that replace each other: each yield is the
    /// newest item seen since the previous one. Nothing is yielded while no
    /// new item has arrived.
    fn rate_limit(self, period: Duration) -> RateLimit<Self>
    where
        Self: Sized,
    {
        RateLimit::new(self, period)
    }
}

impl<T: Stream> RateLimitExt for T {}

pin_project! {
    /// Stream returned by [`RateLimitExt::rate_limit`]
    pub struct RateLimit<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> RateLimit<S> {
    /// Must be called within a tokio runtime.
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, exhausted: false }
    }
}

impl<S: Stream> Stream for RateLimit<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever is ready, keeping the newest
        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.exhausted { Poll::Ready(None) } else { Poll::Pending };
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}
