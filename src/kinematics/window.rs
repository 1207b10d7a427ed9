//! Sliding history of recent samples

use std::collections::VecDeque;
use tracing::trace;

use crate::types::{FloatSample, time_after};
use crate::types::link_flags::sample_content as sc;

/// A sample in the history, with whether data was lost just before it.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub sample: FloatSample,
    pub gap_before: bool,
}

/// Bounded ring of the most recent samples, oldest first.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
    gap_pending: bool,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity, gap_pending: false }
    }

    /// Append a sample, evicting the oldest when full.
    ///
    /// A sample that does not follow the previous one in time also counts as a
    /// gap: the history restarted or arrived out of order.
    pub fn push(&mut self, sample: FloatSample) {
        let mut gap_before = std::mem::take(&mut self.gap_pending);
        if let Some(previous) = self.entries.back() {
            if !follows(&previous.sample, &sample) {
                trace!("Sample at {} does not follow {}", sample.time, previous.sample.time);
                gap_before = true;
            }
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(WindowEntry { sample, gap_before });
    }

    /// Record that data was lost; the next pushed sample starts a new run.
    pub fn mark_gap(&mut self) {
        self.gap_pending = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.gap_pending = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `n` entries, oldest first, or `None` if fewer are held.
    pub fn recent(&self, n: usize) -> Option<impl ExactSizeIterator<Item = &WindowEntry> + Clone> {
        let len = self.entries.len();
        (n > 0 && n <= len).then(|| self.entries.range(len - n..))
    }

    pub fn latest(&self) -> Option<&FloatSample> {
        self.entries.back().map(|entry| &entry.sample)
    }
}

fn follows(previous: &FloatSample, next: &FloatSample) -> bool {
    time_after(next.time, previous.time)
        || (next.time == previous.time && next.has(sc::ADD_OFFSET) && !previous.has(sc::ADD_OFFSET))
}
