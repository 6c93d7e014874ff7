//! Lossy single-producer single-consumer ring buffer for trace events.
//!
//! Pre-allocates a power-of-two slot array and coordinates it with two
//! monotonically increasing cursors: the producer's `tail` (slots below it are
//! published) and the consumer's `head` (slots below it are released for
//! reuse). Cursor publication uses release/acquire so that all payload writes
//! the producer made to a slot happen-before the consumer's reads, and slot
//! reuse is symmetrically protected by `head`.
//!
//! The buffer never blocks the producer: [`Producer::claim`] returns `None`
//! when full and the event is dropped. Order is preserved among events that
//! are published.
//!
//! Slots hold [`TraceEvent`] by value (everything in it is `Copy`), so
//! releasing a slot does not need to clear references; the producer simply
//! overwrites the whole slot on the next claim.

use crate::types::{ExecutionType, OrderId, OrderType, Side};
use crossbeam_utils::CachePadded;
use rust_decimal::Decimal;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Discriminant of a trace event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceEventKind {
    #[default]
    Call,
    OrderIn,
    ExecReport,
    BookAdd,
    Snapshot,
}

/// One slot's payload: value-only fields, filled by the producer and read by
/// the drain. Unused fields for a given kind stay at their defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TraceEvent {
    pub kind: TraceEventKind,
    /// Call-stack depth at emission (indentation only).
    pub depth: u32,
    /// Id of the top-level order currently being processed, if any.
    pub context_order_id: Option<OrderId>,
    /// Traced-function identity for `Call`; on `OrderIn` it carries the
    /// submit function so the drain can emit the merged CALL line.
    pub function_uuid: Option<&'static str>,
    pub order_id: Option<OrderId>,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub execution_type: Option<ExecutionType>,
    pub price: Option<Decimal>,
    pub quantity: u64,
    pub order_size: u64,
    pub last_quantity: u64,
    pub cumulative_quantity: u64,
    pub remaining_quantity: u64,
}

struct Shared {
    slots: Box<[UnsafeCell<TraceEvent>]>,
    mask: u64,
    /// Published cursor: slots below `tail` are readable by the consumer.
    /// Producer-written. Padded so the producer-owned and consumer-owned
    /// cursors never share a cache line.
    tail: CachePadded<AtomicU64>,
    /// Release cursor: slots below `head` are writable by the producer.
    /// Consumer-written.
    head: CachePadded<AtomicU64>,
}

// SAFETY: slot payloads are accessed by the producer only between claim and
// publish, and by the consumer only between poll and release. Those windows
// are disjoint because the producer never claims past `head + capacity`
// (acquire-read of `head`) and the consumer never polls past `tail`
// (acquire-read of `tail`); the matching release-stores order the payload
// accesses on both sides.
unsafe impl Sync for Shared {}

/// Producer handle: engine-thread only.
pub struct Producer {
    shared: Arc<Shared>,
    write_cursor: u64,
    cached_head: u64,
}

/// Consumer handle: drain-thread only.
pub struct Consumer {
    shared: Arc<Shared>,
    head: u64,
    cached_tail: u64,
}

/// Creates a ring with `capacity` slots (rounded up to a power of two).
pub fn with_capacity(capacity: usize) -> (Producer, Consumer) {
    let capacity = capacity.next_power_of_two().max(2);
    let slots: Box<[UnsafeCell<TraceEvent>]> = (0..capacity)
        .map(|_| UnsafeCell::new(TraceEvent::default()))
        .collect();
    let shared = Arc::new(Shared {
        slots,
        mask: capacity as u64 - 1,
        tail: CachePadded::new(AtomicU64::new(0)),
        head: CachePadded::new(AtomicU64::new(0)),
    });
    (
        Producer {
            shared: Arc::clone(&shared),
            write_cursor: 0,
            cached_head: 0,
        },
        Consumer {
            shared,
            head: 0,
            cached_tail: 0,
        },
    )
}

impl Producer {
    /// Claims an exclusive writable slot, or returns `None` when the ring is
    /// full (the event is dropped; this call never blocks). The claimed slot
    /// is invisible to the consumer until [`Producer::publish`].
    pub fn claim(&mut self) -> Option<&mut TraceEvent> {
        let wc = self.write_cursor;
        let capacity = self.shared.slots.len() as u64;
        if wc - self.cached_head >= capacity {
            self.cached_head = self.shared.head.load(Ordering::Acquire);
            if wc - self.cached_head >= capacity {
                return None;
            }
        }
        self.write_cursor = wc + 1;
        let idx = (wc & self.shared.mask) as usize;
        // SAFETY: `wc < cached_head + capacity`, so the consumer has released
        // this slot, and it is not published until `publish` runs.
        Some(unsafe { &mut *self.shared.slots[idx].get() })
    }

    /// Makes every slot claimed since the last publish visible to the
    /// consumer, in claim order, with a single release store.
    pub fn publish(&self) {
        self.shared.tail.store(self.write_cursor, Ordering::Release);
    }
}

impl Consumer {
    /// Next published slot, or `None` when the ring is empty. The slot stays
    /// owned by the consumer until [`Consumer::release`].
    pub fn poll(&mut self) -> Option<&TraceEvent> {
        if self.head >= self.cached_tail {
            self.cached_tail = self.shared.tail.load(Ordering::Acquire);
            if self.head >= self.cached_tail {
                return None;
            }
        }
        let idx = (self.head & self.shared.mask) as usize;
        // SAFETY: `head < cached_tail`, so this slot is published and the
        // producer will not reclaim it until `head` advances past it.
        Some(unsafe { &*self.shared.slots[idx].get() })
    }

    /// Hands the most recently polled slot back to the producer.
    ///
    /// Panics if called without a matching successful [`Consumer::poll`];
    /// releasing an unpolled slot would let the producer overwrite data the
    /// consumer has not read.
    pub fn release(&mut self) {
        assert!(
            self.head < self.cached_tail,
            "release without a matching poll"
        );
        self.head += 1;
        self.shared.head.store(self.head, Ordering::Release);
    }

    /// True when every published event has been released. Safe to call while
    /// the producer is active.
    pub fn is_empty(&self) -> bool {
        self.shared.head.load(Ordering::Acquire) >= self.shared.tail.load(Ordering::Acquire)
    }
}
