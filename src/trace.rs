//! Trace emission: configuration, per-engine call context, and the
//! producer-side hooks invoked from the matching core.
//!
//! Emission sites are fixed (see [`crate::matching`] and
//! [`crate::engine::MatchingEngine::submit`]): a merged ORDER_IN + CALL at
//! depth-0 submission entry, a CALL at the entry of every other traced
//! operation except the sites that emit richer events (EXEC_REPORT,
//! BOOK_ADD), and a SNAPSHOT marker every `snapshot_interval` orders at
//! depth-0 submission exit. Every emission publishes before returning, so no
//! event stays invisible once control is back at depth 0.
//!
//! The tracer is owned by its engine: call depth and the current top-level
//! order id live in a per-engine [`TraceContext`], not in globals, so a
//! second engine instance gets its own context.

use crate::execution::ExecutionReport;
use crate::ring::{self, Producer, TraceEvent, TraceEventKind};
use crate::types::Order;
use std::io;
use std::path::PathBuf;

/// Where the drain writes formatted trace output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceOutput {
    /// Write the trace log to [`TraceConfig::logfile`].
    #[default]
    File,
    /// Discard all trace output (events still flow through the ring).
    None,
}

/// Configuration for the tracing pipeline. Read-only after initialization.
#[derive(Clone, Debug)]
pub struct TraceConfig {
    pub output: TraceOutput,
    /// Trace sink path when `output` is [`TraceOutput::File`].
    pub logfile: PathBuf,
    /// Price levels per side rendered in a SNAPSHOT line.
    pub snapshot_levels: usize,
    /// Emit a SNAPSHOT every N orders (minimum 1).
    pub snapshot_interval: u64,
    /// When false, matching runs without claiming any trace events.
    pub emit: bool,
    /// Ring slots; rounded up to a power of two.
    pub ring_capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            output: TraceOutput::File,
            logfile: PathBuf::from("instrumentation.log"),
            snapshot_levels: 5,
            snapshot_interval: 1,
            emit: true,
            ring_capacity: 1 << 20,
        }
    }
}

/// Compile-time identity of a traced operation, written to the trace-log
/// header and carried on CALL events.
#[derive(Clone, Copy, Debug)]
pub struct FunctionMetadata {
    pub name: &'static str,
    pub uuid: &'static str,
    pub description: &'static str,
}

/// Static identities for every traced operation.
pub mod functions {
    use super::FunctionMetadata;

    pub const SUBMIT_ORDER: FunctionMetadata = FunctionMetadata {
        name: "submit_order",
        uuid: "t3PbVqe0RkWvYH5mJc2dQw",
        description: "Entry point for one order: runs matching against the opposite side, \
                      then rests a limit residual on the book or cancels a market residual.",
    };
    pub const MATCH_BUY_ORDER: FunctionMetadata = FunctionMetadata {
        name: "match_buy_order",
        uuid: "aU8xKwzJTZ6fN4sD1rGvLg",
        description: "Walks the sell side best-price-first, filling the incoming buy at each \
                      resting order's price until filled, priced out, or out of liquidity.",
    };
    pub const MATCH_SELL_ORDER: FunctionMetadata = FunctionMetadata {
        name: "match_sell_order",
        uuid: "Zy4qTmH9QhG2jW7cXe5bPA",
        description: "Walks the buy side best-price-first, filling the incoming sell at each \
                      resting order's price until filled, priced out, or out of liquidity.",
    };
    pub const EXECUTE_FILL: FunctionMetadata = FunctionMetadata {
        name: "execute_fill",
        uuid: "Mk6dRw1sSJCuEp8vTqZ3nA",
        description: "Applies one fill atomically to both orders at the resting order's price \
                      and generates the [incoming, resting] execution-report pair.",
    };
    pub const RECORD_EXECUTION_REPORT: FunctionMetadata = FunctionMetadata {
        name: "record_execution_report",
        uuid: "Bv9wQn5kQFKtYc3hLm7jRg",
        description: "Appends an execution report to the engine's generation-ordered report log.",
    };
    pub const BOOK_INSERT: FunctionMetadata = FunctionMetadata {
        name: "insert",
        uuid: "Hf2sLp8mT0mXd6uWqB4yZw",
        description: "Adds a resting limit order to the FIFO queue at its price level, \
                      creating the level if absent.",
    };
    pub const BEST_BUY: FunctionMetadata = FunctionMetadata {
        name: "best_buy",
        uuid: "Cw7kZj3vRYi1gN9tEa6xSQ",
        description: "Peeks the head order at the highest bid price.",
    };
    pub const BEST_SELL: FunctionMetadata = FunctionMetadata {
        name: "best_sell",
        uuid: "Ds0fUm4hQLePb2rKv8cJtA",
        description: "Peeks the head order at the lowest ask price.",
    };
    pub const BOOK_REMOVE: FunctionMetadata = FunctionMetadata {
        name: "remove",
        uuid: "Ng5tXc7bSEqAw1zHy3oVmQ",
        description: "Removes a fully filled order from the head of its price level and \
                      prunes the level when it empties.",
    };

    pub const ENGINE_FUNCTIONS: [FunctionMetadata; 5] = [
        SUBMIT_ORDER,
        MATCH_BUY_ORDER,
        MATCH_SELL_ORDER,
        EXECUTE_FILL,
        RECORD_EXECUTION_REPORT,
    ];
    pub const BOOK_FUNCTIONS: [FunctionMetadata; 4] =
        [BOOK_INSERT, BEST_BUY, BEST_SELL, BOOK_REMOVE];
}

/// Per-engine call-flow state: depth for indentation, the top-level order
/// being processed, and the counter driving SNAPSHOT cadence.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceContext {
    depth: u32,
    current_order_id: Option<crate::types::OrderId>,
    order_counter: u64,
}

/// Producer-side trace hook owned by a [`crate::MatchingEngine`].
///
/// With no producer attached (disabled tracing, or `emit = false`) every hook
/// is a cheap no-op apart from depth bookkeeping.
pub struct Tracer {
    producer: Option<Producer>,
    ctx: TraceContext,
    snapshot_interval: u64,
}

impl Tracer {
    /// Tracer that never claims a slot; for engines running without the
    /// instrumentation pipeline.
    pub fn disabled() -> Self {
        Self::new(None, 1)
    }

    pub(crate) fn new(producer: Option<Producer>, snapshot_interval: u64) -> Self {
        Self {
            producer,
            ctx: TraceContext::default(),
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Current call depth; exposed for assertions in tests.
    pub fn depth(&self) -> u32 {
        self.ctx.depth
    }

    pub(crate) fn enter(&mut self) {
        self.ctx.depth += 1;
    }

    pub(crate) fn exit(&mut self) {
        self.ctx.depth = self.ctx.depth.saturating_sub(1);
    }

    /// Depth-0 submission entry: records the current order id and emits the
    /// merged ORDER_IN + CALL event for the submit operation.
    pub(crate) fn order_in(&mut self, order: &Order) {
        self.ctx.current_order_id = Some(order.order_id);
        let depth = self.ctx.depth;
        let context_order_id = self.ctx.current_order_id;
        let Some(producer) = self.producer.as_mut() else {
            return;
        };
        if let Some(slot) = producer.claim() {
            *slot = TraceEvent {
                kind: TraceEventKind::OrderIn,
                depth,
                context_order_id,
                function_uuid: Some(functions::SUBMIT_ORDER.uuid),
                order_id: Some(order.order_id),
                side: Some(order.side),
                order_type: Some(order.order_type),
                price: order.price,
                quantity: order.quantity,
                ..TraceEvent::default()
            };
        }
        producer.publish();
    }

    /// CALL at the entry of a traced operation.
    pub(crate) fn call(&mut self, uuid: &'static str) {
        let depth = self.ctx.depth;
        let context_order_id = self.ctx.current_order_id;
        let Some(producer) = self.producer.as_mut() else {
            return;
        };
        if let Some(slot) = producer.claim() {
            *slot = TraceEvent {
                kind: TraceEventKind::Call,
                depth,
                context_order_id,
                function_uuid: Some(uuid),
                ..TraceEvent::default()
            };
        }
        producer.publish();
    }

    /// EXEC_REPORT, emitted right after the report joins the engine's list.
    pub(crate) fn exec_report(&mut self, report: &ExecutionReport) {
        let depth = self.ctx.depth;
        let context_order_id = self.ctx.current_order_id;
        let Some(producer) = self.producer.as_mut() else {
            return;
        };
        if let Some(slot) = producer.claim() {
            *slot = TraceEvent {
                kind: TraceEventKind::ExecReport,
                depth,
                context_order_id,
                order_id: Some(report.order_id),
                side: Some(report.side),
                execution_type: Some(report.execution_type),
                price: report.price,
                order_size: report.order_size,
                last_quantity: report.last_quantity,
                cumulative_quantity: report.cumulative_quantity,
                ..TraceEvent::default()
            };
        }
        producer.publish();
    }

    /// BOOK_ADD, emitted when a residual limit order rests on the book.
    pub(crate) fn book_add(&mut self, order: &Order) {
        let depth = self.ctx.depth;
        let context_order_id = self.ctx.current_order_id;
        let Some(producer) = self.producer.as_mut() else {
            return;
        };
        if let Some(slot) = producer.claim() {
            *slot = TraceEvent {
                kind: TraceEventKind::BookAdd,
                depth,
                context_order_id,
                order_id: Some(order.order_id),
                side: Some(order.side),
                price: order.price,
                remaining_quantity: order.remaining_quantity,
                cumulative_quantity: order.cumulative_quantity,
                ..TraceEvent::default()
            };
        }
        producer.publish();
    }

    /// Depth-0 submission exit: advances the order counter, emits a SNAPSHOT
    /// marker on the configured cadence, and clears the current-order context.
    pub(crate) fn exit_order(&mut self) {
        self.ctx.depth = self.ctx.depth.saturating_sub(1);
        if let Some(producer) = self.producer.as_mut() {
            self.ctx.order_counter += 1;
            if self.ctx.order_counter % self.snapshot_interval == 0 {
                if let Some(slot) = producer.claim() {
                    *slot = TraceEvent {
                        kind: TraceEventKind::Snapshot,
                        depth: self.ctx.depth,
                        context_order_id: self.ctx.current_order_id,
                        ..TraceEvent::default()
                    };
                }
                producer.publish();
            }
        }
        self.ctx.current_order_id = None;
    }
}

/// Builds the tracing pipeline from `config`: the ring, the engine-side
/// [`Tracer`], and the background [`crate::drain::DrainWorker`] that owns the
/// sink. With `emit = false` the producer is dropped and matching never
/// touches the ring.
pub fn init(config: &TraceConfig) -> io::Result<(Tracer, crate::drain::DrainWorker)> {
    let (producer, consumer) = ring::with_capacity(config.ring_capacity);
    let tracer = Tracer::new(config.emit.then_some(producer), config.snapshot_interval);
    let drain = crate::drain::DrainWorker::spawn(consumer, config)?;
    Ok((tracer, drain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, Side};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn order() -> Order {
        Order::limit(OrderId(Uuid::from_u128(7)), Side::Buy, Decimal::from(100), 10)
    }

    #[test]
    fn disabled_tracer_claims_nothing_but_tracks_depth() {
        let mut tracer = Tracer::disabled();
        tracer.order_in(&order());
        tracer.enter();
        assert_eq!(tracer.depth(), 1);
        tracer.call(functions::MATCH_BUY_ORDER.uuid);
        tracer.exit_order();
        assert_eq!(tracer.depth(), 0);
    }

    #[test]
    fn order_in_carries_merged_submit_call() {
        let (producer, mut consumer) = ring::with_capacity(16);
        let mut tracer = Tracer::new(Some(producer), 1);
        tracer.order_in(&order());

        let event = consumer.poll().copied().unwrap();
        consumer.release();
        assert_eq!(event.kind, TraceEventKind::OrderIn);
        assert_eq!(event.function_uuid, Some(functions::SUBMIT_ORDER.uuid));
        assert_eq!(event.context_order_id, event.order_id);
        assert_eq!(event.quantity, 10);
        assert!(consumer.poll().is_none());
    }

    #[test]
    fn snapshot_respects_interval() {
        let (producer, mut consumer) = ring::with_capacity(64);
        let mut tracer = Tracer::new(Some(producer), 3);
        for _ in 0..6 {
            tracer.enter();
            tracer.exit_order();
        }
        let mut snapshots = 0;
        while let Some(event) = consumer.poll().copied() {
            consumer.release();
            assert_eq!(event.kind, TraceEventKind::Snapshot);
            snapshots += 1;
        }
        assert_eq!(snapshots, 2, "6 orders at interval 3");
    }

    #[test]
    fn all_function_uuids_are_distinct_base64() {
        let all = functions::ENGINE_FUNCTIONS
            .iter()
            .chain(functions::BOOK_FUNCTIONS.iter())
            .collect::<Vec<_>>();
        for f in &all {
            assert_eq!(f.uuid.len(), 22, "{} uuid length", f.name);
        }
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.uuid, b.uuid, "{} vs {}", a.name, b.name);
            }
        }
    }
}
