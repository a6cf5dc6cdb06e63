//! Fixed-capacity event FIFO with tombstone removal.
//!
//! 256 slots addressed by a wrapping `u8`. `head == tail` means empty, so at
//! most [`QUEUE_CAPACITY`] entries (live or tombstoned) are in flight.
//!
//! The queue is single-producer / single-consumer. [`EventQueue::split`]
//! hands out exactly one [`Producer`] and one [`Consumer`]:
//! - the producer writes the slot at `tail`, then publishes the new tail with
//!   a `Release` store;
//! - the consumer reads `tail` with `Acquire` before touching any slot, and
//!   owns `head` and the tombstone flags.
//!
//! Removing an arbitrary entry only tombstones it. Removing (or popping) the
//! head advances `head` past any tombstones, so `head` never rests on a
//! removed slot unless the queue is empty.
//!
//! Outside the crate the consumer is reached through [`Consumer::peek`],
//! [`Consumer::pop_front`], [`Consumer::remove`] and [`Consumer::iter`].
//! Every slot access checks its index against `[head, tail)`.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::event::{Coord, Event};

/// Physical slot count. Indices wrap modulo this value.
pub const QUEUE_SLOTS: usize = 256;

/// Entries that can be in flight at once.
pub const QUEUE_CAPACITY: usize = QUEUE_SLOTS - 1;

/// Position of an entry in the ring.
pub type QueueIndex = u8;

#[derive(Copy, Clone)]
struct Slot {
    event: Event,
    removed: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        event: Event::release(Coord { line: 0, column: 0 }, 0),
        removed: true,
    };
}

pub struct EventQueue {
    slots: [UnsafeCell<Slot>; QUEUE_SLOTS],
    head: AtomicU8,
    tail: AtomicU8,
}

// Slots in [head, tail) belong to the consumer, the slot at tail to the
// producer. The split handles keep both sides from aliasing a slot.
unsafe impl Sync for EventQueue {}

impl EventQueue {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: UnsafeCell<Slot> = UnsafeCell::new(Slot::EMPTY);
        Self {
            slots: [EMPTY; QUEUE_SLOTS],
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
        }
    }

    /// Split into the producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let queue: &Self = self;
        (Producer { queue }, Consumer { queue })
    }

    /// Number of occupied slots, tombstones included.
    fn in_flight(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Appending half of the queue. Owned by the sampler.
pub struct Producer<'a> {
    queue: &'a EventQueue,
}

impl Producer<'_> {
    /// Append an event.
    ///
    /// # Panics
    /// When [`QUEUE_CAPACITY`] entries are already in flight. Dropping the
    /// event instead would desynchronise press/release pairing.
    pub fn push_back(&mut self, event: Event) {
        let tail = self.queue.tail.load(Ordering::Relaxed);
        let next = tail.wrapping_add(1);
        assert!(
            next != self.queue.head.load(Ordering::Acquire),
            "event queue overflow"
        );
        // SAFETY: the slot at `tail` is outside [head, tail) and only the
        // single producer writes it until the tail store below publishes it.
        unsafe {
            *self.queue.slots[tail as usize].get() = Slot {
                event,
                removed: false,
            };
        }
        self.queue.tail.store(next, Ordering::Release);
    }

    /// Free entries left before [`Producer::push_back`] would panic.
    pub fn free(&self) -> usize {
        QUEUE_CAPACITY - self.queue.in_flight()
    }

    pub fn is_full(&self) -> bool {
        self.free() == 0
    }
}

/// Reading half of the queue. Owned by the resolver.
pub struct Consumer<'a> {
    queue: &'a EventQueue,
}

impl<'a> Consumer<'a> {
    /// Index of the earliest live entry, or [`Consumer::end`] when empty.
    #[inline]
    pub(crate) fn begin(&self) -> QueueIndex {
        self.queue.head.load(Ordering::Relaxed)
    }

    /// One past the last published entry.
    #[inline]
    pub(crate) fn end(&self) -> QueueIndex {
        self.queue.tail.load(Ordering::Acquire)
    }

    /// The live entry after `index`, or `end` if there is none.
    ///
    /// An `index` already retired behind the head continues at the head:
    /// everything between them was tombstoned.
    pub(crate) fn next(&self, index: QueueIndex, end: QueueIndex) -> QueueIndex {
        if !self.in_range(index) {
            return self.begin();
        }
        let mut index = index;
        loop {
            index = index.wrapping_add(1);
            if index == end || !self.is_removed(index) {
                return index;
            }
        }
    }

    /// Copy of the entry at `index`.
    ///
    /// # Panics
    /// When `index` is outside `[begin, end)`.
    pub(crate) fn get(&self, index: QueueIndex) -> Event {
        self.check(index);
        // SAFETY: entries in [head, tail) were published by the producer
        // (Acquire on tail) and are not written again until popped.
        unsafe { (*self.queue.slots[index as usize].get()).event }
    }

    pub(crate) fn is_removed(&self, index: QueueIndex) -> bool {
        self.check(index);
        // SAFETY: published slot, tombstone flags are only written by the
        // consumer.
        unsafe { (*self.queue.slots[index as usize].get()).removed }
    }

    /// Tombstone the entry at `index`. Removing the head advances it.
    ///
    /// # Panics
    /// When `index` is outside `[begin, end)`.
    pub fn remove(&mut self, index: QueueIndex) {
        self.check(index);
        // SAFETY: consumer-owned flag of a published slot.
        unsafe {
            (*self.queue.slots[index as usize].get()).removed = true;
        }
        let head = self.begin();
        if index == head {
            let end = self.end();
            self.queue
                .head
                .store(self.next(head, end), Ordering::Release);
        }
    }

    /// Earliest live entry and its index.
    pub fn peek(&self) -> Option<(QueueIndex, Event)> {
        let head = self.begin();
        if head == self.end() {
            None
        } else {
            Some((head, self.get(head)))
        }
    }

    /// Retire the earliest live entry. A no-op on an empty queue.
    pub fn pop_front(&mut self) -> Option<Event> {
        let (head, event) = self.peek()?;
        self.remove(head);
        Some(event)
    }

    /// First live entry after `from` (exclusive) at `pos`.
    pub(crate) fn find_next_at(&self, pos: Coord, from: QueueIndex, end: QueueIndex) -> Option<QueueIndex> {
        let mut index = self.next(from, end);
        while index != end {
            if self.get(index).pos == pos {
                return Some(index);
            }
            index = self.next(index, end);
        }
        None
    }

    /// Live entries in FIFO order, against a snapshot of the tail.
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            consumer: self,
            index: self.begin(),
            end: self.end(),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.begin() == self.end()
    }

    fn in_range(&self, index: QueueIndex) -> bool {
        let head = self.begin();
        index.wrapping_sub(head) < self.end().wrapping_sub(head)
    }

    /// Slots outside `[head, tail)` may be under the producer's pen.
    #[inline]
    fn check(&self, index: QueueIndex) {
        assert!(
            self.in_range(index),
            "queue index {index} outside the live range"
        );
    }
}

pub struct Iter<'c, 'a> {
    consumer: &'c Consumer<'a>,
    index: QueueIndex,
    end: QueueIndex,
}

impl Iterator for Iter<'_, '_> {
    type Item = (QueueIndex, Event);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == self.end {
            return None;
        }
        let item = (self.index, self.consumer.get(self.index));
        self.index = self.consumer.next(self.index, self.end);
        Some(item)
    }
}
