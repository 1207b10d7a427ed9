//! Bounded record queue with latest-value slots
//!
//! The ordered path holds records oldest first within a byte budget. Pushing
//! never blocks: when the budget is exceeded the oldest records are evicted
//! and the class of each loss is remembered until the next
//! [`pop_oldest`](RecordQueue::pop_oldest), which hands those [`GapFlags`] out
//! with the record it delivers.
//!
//! Independently of the ordered path, every push lands in a latest-value slot
//! (one for any record and one per class). Each slot is a `watch` channel, so
//! "has something new arrived" is the receiver's changed bit: it rises once
//! per arrival and drops when the value is read.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{trace, warn};

use crate::types::{GapFlags, Record, RecordClass};

/// A record delivered by the ordered path.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub record: Arc<Record>,
    /// Classes of records lost since the previous delivery.
    pub gaps: GapFlags,
}

#[derive(Debug)]
struct Queued {
    record: Arc<Record>,
    size: usize,
}

/// Single-cell channel holding the newest record, with a consumed bit.
#[derive(Debug)]
pub struct LatestSlot {
    tx: watch::Sender<Option<Arc<Record>>>,
    rx: watch::Receiver<Option<Arc<Record>>>,
}

impl LatestSlot {
    fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, rx }
    }

    fn store(&self, record: Arc<Record>) {
        self.tx.send_replace(Some(record));
    }

    fn clear(&mut self) {
        self.tx.send_replace(None);
        self.rx.mark_unchanged();
    }

    /// Whether a record arrived since the slot was last read.
    pub fn has_new(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Read the newest record, marking it seen.
    pub fn take(&mut self) -> Option<Arc<Record>> {
        self.rx.borrow_and_update().clone()
    }

    /// Independent receiver for streaming consumers.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Record>>> {
        self.tx.subscribe()
    }
}

#[derive(Debug)]
struct LatestSlots {
    any: LatestSlot,
    sample: LatestSlot,
    event: LatestSlot,
    control: LatestSlot,
}

impl LatestSlots {
    fn new() -> Self {
        Self {
            any: LatestSlot::new(),
            sample: LatestSlot::new(),
            event: LatestSlot::new(),
            control: LatestSlot::new(),
        }
    }

    fn get_mut(&mut self, class: Option<RecordClass>) -> &mut LatestSlot {
        match class {
            None => &mut self.any,
            Some(RecordClass::Sample) => &mut self.sample,
            Some(RecordClass::Event) => &mut self.event,
            Some(RecordClass::Control) => &mut self.control,
        }
    }

    fn get(&self, class: Option<RecordClass>) -> &LatestSlot {
        match class {
            None => &self.any,
            Some(RecordClass::Sample) => &self.sample,
            Some(RecordClass::Event) => &self.event,
            Some(RecordClass::Control) => &self.control,
        }
    }
}

/// Ordered record queue with a byte capacity.
#[derive(Debug)]
pub struct RecordQueue {
    entries: VecDeque<Queued>,
    capacity: usize,
    used: usize,
    counts: [usize; 3],
    pending_gaps: GapFlags,
    overflowing: bool,
    latest: LatestSlots,
}

impl RecordQueue {
    /// Create a queue holding at most `capacity` bytes of encoded records.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            used: 0,
            counts: [0; 3],
            pending_gaps: GapFlags::NONE,
            overflowing: false,
            latest: LatestSlots::new(),
        }
    }

    /// Append a record of `size` bytes, evicting the oldest as needed.
    ///
    /// Returns the records evicted (or the record itself, when it alone is
    /// larger than the whole queue), oldest first.
    pub fn push(&mut self, record: Arc<Record>, size: usize) -> Vec<Arc<Record>> {
        self.latest.any.store(Arc::clone(&record));
        self.latest.get(Some(record.class())).store(Arc::clone(&record));

        let mut evicted = Vec::new();
        if size > self.capacity {
            warn!(
                "{:?} record of {} bytes exceeds queue capacity {}",
                record.kind(),
                size,
                self.capacity
            );
            self.pending_gaps |= record.class().gap_flag();
            evicted.push(record);
            return evicted;
        }

        while self.used + size > self.capacity {
            let Some(oldest) = self.remove_front() else { break };
            self.pending_gaps |= oldest.record.class().gap_flag();
            evicted.push(oldest.record);
        }
        if !evicted.is_empty() {
            if !self.overflowing {
                warn!(
                    "Record queue full ({} of {} bytes), evicting oldest records",
                    self.used, self.capacity
                );
            }
            self.overflowing = true;
        }

        trace!("Queued {:?} at {} ({} bytes)", record.kind(), record.time(), size);
        self.used += size;
        self.counts[class_index(record.class())] += 1;
        self.entries.push_back(Queued { record, size });
        evicted
    }

    /// Remove the oldest record with the losses that preceded it.
    pub fn pop_oldest(&mut self) -> Option<Delivered> {
        let queued = self.remove_front()?;
        self.overflowing = false;
        let gaps = std::mem::take(&mut self.pending_gaps);
        Some(Delivered { record: queued.record, gaps })
    }

    fn remove_front(&mut self) -> Option<Queued> {
        let queued = self.entries.pop_front()?;
        self.used -= queued.size;
        self.counts[class_index(queued.record.class())] -= 1;
        Some(queued)
    }

    /// Whether a record arrived (of `class`, or of any class for `None`)
    /// since that slot was last read.
    pub fn has_new_latest(&self, class: Option<RecordClass>) -> bool {
        self.latest.get(class).has_new()
    }

    /// Newest record (of `class`, or of any class), leaving the ordered queue
    /// untouched.
    pub fn peek_latest(&mut self, class: Option<RecordClass>) -> Option<Arc<Record>> {
        self.latest.get_mut(class).take()
    }

    pub fn subscribe_latest(
        &self,
        class: Option<RecordClass>,
    ) -> watch::Receiver<Option<Arc<Record>>> {
        self.latest.get(class).subscribe()
    }

    /// Queued records of the selected classes. Control records count as
    /// events.
    pub fn count(&self, samples: bool, events: bool) -> usize {
        let mut total = 0;
        if samples {
            total += self.counts[class_index(RecordClass::Sample)];
        }
        if events {
            total += self.counts[class_index(RecordClass::Event)]
                + self.counts[class_index(RecordClass::Control)];
        }
        total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes in use.
    pub fn size(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free(&self) -> usize {
        self.capacity - self.used
    }

    /// Gap flags waiting for the next delivery.
    pub fn pending_gaps(&self) -> GapFlags {
        self.pending_gaps
    }

    /// Drop every queued record and empty the latest slots.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
        self.counts = [0; 3];
        self.pending_gaps = GapFlags::NONE;
        self.overflowing = false;
        for slot in [
            &mut self.latest.any,
            &mut self.latest.sample,
            &mut self.latest.event,
            &mut self.latest.control,
        ] {
            slot.clear();
        }
    }
}

fn class_index(class: RecordClass) -> usize {
    match class {
        RecordClass::Sample => 0,
        RecordClass::Event => 1,
        RecordClass::Control => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{binocular_sample, block_start, message};
    use crate::types::ControlKind;

    fn push(queue: &mut RecordQueue, record: Record) -> Vec<Arc<Record>> {
        queue.push(Arc::new(record), 10)
    }

    #[test]
    fn ordered_delivery_without_gaps() {
        let mut queue = RecordQueue::new(100);
        push(&mut queue, binocular_sample(1, 0.0, 0.0));
        push(&mut queue, message(2, "hello"));

        let first = queue.pop_oldest().unwrap();
        assert_eq!(first.record.time(), 1);
        assert!(first.gaps.is_empty());
        assert_eq!(queue.pop_oldest().unwrap().record.time(), 2);
        assert!(queue.pop_oldest().is_none());
    }

    #[test]
    fn overflow_flags_next_delivery() {
        let mut queue = RecordQueue::new(30);
        push(&mut queue, block_start(ControlKind::StartSamples, 0));
        push(&mut queue, message(1, "a"));
        push(&mut queue, binocular_sample(2, 0.0, 0.0));
        let evicted = push(&mut queue, binocular_sample(3, 0.0, 0.0));

        assert_eq!(evicted.len(), 1);
        assert!(matches!(*evicted[0], Record::Control(_)));
        assert_eq!(queue.len(), 3);

        let delivered = queue.pop_oldest().unwrap();
        assert_eq!(delivered.record.time(), 1);
        assert_eq!(delivered.gaps, GapFlags::CONTROL);
        assert!(queue.pop_oldest().unwrap().gaps.is_empty());
    }

    #[test]
    fn oversized_record_is_dropped_but_latest() {
        let mut queue = RecordQueue::new(5);
        let evicted = push(&mut queue, binocular_sample(1, 0.0, 0.0));
        assert_eq!(evicted.len(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.pending_gaps(), GapFlags::SAMPLE);
        assert_eq!(queue.peek_latest(None).unwrap().time(), 1);
    }

    #[test]
    fn latest_is_an_edge() {
        let mut queue = RecordQueue::new(100);
        assert!(!queue.has_new_latest(None));
        assert!(queue.peek_latest(None).is_none());

        push(&mut queue, binocular_sample(1, 0.0, 0.0));
        push(&mut queue, message(2, "m"));
        assert!(queue.has_new_latest(None));
        assert!(queue.has_new_latest(Some(RecordClass::Sample)));

        assert_eq!(queue.peek_latest(None).unwrap().time(), 2);
        assert!(!queue.has_new_latest(None));
        // Still readable, and the ordered path is untouched.
        assert_eq!(queue.peek_latest(None).unwrap().time(), 2);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.peek_latest(Some(RecordClass::Sample)).unwrap().time(), 1);
        assert!(!queue.has_new_latest(Some(RecordClass::Sample)));
        assert!(queue.has_new_latest(Some(RecordClass::Event)));
    }

    #[test]
    fn counts_by_class() {
        let mut queue = RecordQueue::new(1000);
        push(&mut queue, block_start(ControlKind::StartSamples, 0));
        push(&mut queue, binocular_sample(1, 0.0, 0.0));
        push(&mut queue, binocular_sample(2, 0.0, 0.0));
        push(&mut queue, message(3, "m"));

        assert_eq!(queue.count(true, false), 2);
        assert_eq!(queue.count(false, true), 2);
        assert_eq!(queue.count(true, true), 4);
        assert_eq!(queue.count(false, false), 0);
        assert_eq!(queue.size(), 40);
        assert_eq!(queue.free(), 960);

        queue.clear();
        assert_eq!(queue.count(true, true), 0);
        assert!(queue.peek_latest(None).is_none());
        assert!(!queue.has_new_latest(None));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn occupancy_stays_bounded(
                capacity in 10usize..200,
                sizes in prop::collection::vec(1usize..40, 1..100)
            ) {
                let mut queue = RecordQueue::new(capacity);
                for (i, size) in sizes.iter().enumerate() {
                    queue.push(Arc::new(binocular_sample(i as u32, 0.0, 0.0)), *size);
                    prop_assert!(queue.size() <= capacity);
                }
                let last = queue.peek_latest(None).unwrap();
                prop_assert_eq!(last.time(), sizes.len() as u32 - 1);
            }

            #[test]
            fn gaps_appear_exactly_when_records_were_lost(
                bursts in prop::collection::vec(0usize..6, 1..20)
            ) {
                let mut queue = RecordQueue::new(40);
                let mut time = 0u32;
                for burst in bursts {
                    let mut lost = 0;
                    for _ in 0..burst {
                        lost += queue.push(Arc::new(binocular_sample(time, 0.0, 0.0)), 10).len();
                        time += 1;
                    }
                    if let Some(delivered) = queue.pop_oldest() {
                        prop_assert_eq!(delivered.gaps.samples_dropped(), lost > 0);
                        prop_assert!(!delivered.gaps.events_dropped());
                    }
                }
            }
        }
    }
}
