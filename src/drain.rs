//! Drain worker: the trace consumer thread, its virtual book, and the
//! line-oriented trace formatter.
//!
//! The worker polls the ring, updates a drain-local replica of the order book
//! from BOOK_ADD and EXEC_REPORT events, formats one line per event into a
//! batch buffer, and flushes to the sink at a ~64 KiB high-water mark.
//! Reconstructing the book here keeps snapshot work entirely off the engine
//! thread; correctness rests on publication order (a BOOK_ADD always precedes
//! any EXEC_REPORT for that order in the ring).

use crate::ring::{Consumer, TraceEvent, TraceEventKind};
use crate::trace::{functions, FunctionMetadata, TraceConfig, TraceOutput};
use crate::types::{OrderId, Side};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const FLUSH_HIGH_WATER: usize = 64 * 1024;
const SINK_BUFFER: usize = 1 << 20;
const PARK_INTERVAL: Duration = Duration::from_micros(100);
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// ───────────────────────────── virtual book ─────────────────────────────

#[derive(Clone, Copy, Debug)]
struct TrackedOrder {
    side: Side,
    price: Decimal,
    remaining_quantity: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct LevelInfo {
    total_quantity: u64,
    order_count: u32,
}

/// Drain-side replica of the order book, aggregated per price level.
///
/// Fed exclusively from trace events, so it tracks the real book modulo
/// dropped events; with a lossless stream the level totals match the engine's
/// book exactly.
#[derive(Debug, Default)]
pub struct VirtualBook {
    orders: HashMap<OrderId, TrackedOrder>,
    buy_levels: BTreeMap<Decimal, LevelInfo>,
    sell_levels: BTreeMap<Decimal, LevelInfo>,
}

impl VirtualBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Only BOOK_ADD and EXEC_REPORT mutate state.
    pub fn apply(&mut self, event: &TraceEvent) {
        match event.kind {
            TraceEventKind::BookAdd => self.apply_book_add(event),
            TraceEventKind::ExecReport => self.apply_exec_report(event),
            _ => {}
        }
    }

    fn apply_book_add(&mut self, event: &TraceEvent) {
        let (Some(order_id), Some(side), Some(price)) =
            (event.order_id, event.side, event.price)
        else {
            return;
        };
        self.orders.insert(
            order_id,
            TrackedOrder {
                side,
                price,
                remaining_quantity: event.remaining_quantity,
            },
        );
        let info = self.levels_mut(side).entry(price).or_default();
        info.total_quantity += event.remaining_quantity;
        info.order_count += 1;
    }

    fn apply_exec_report(&mut self, event: &TraceEvent) {
        // Reports for incoming orders and cancellations reference ids that
        // were never booked; those leave the replica untouched.
        let Some(order_id) = event.order_id else {
            return;
        };
        let Some(mut tracked) = self.orders.get(&order_id).copied() else {
            return;
        };
        let filled = event.last_quantity;
        let levels = match tracked.side {
            Side::Buy => &mut self.buy_levels,
            Side::Sell => &mut self.sell_levels,
        };
        if let Some(info) = levels.get_mut(&tracked.price) {
            info.total_quantity = info.total_quantity.saturating_sub(filled);
        }
        tracked.remaining_quantity = tracked.remaining_quantity.saturating_sub(filled);
        if tracked.remaining_quantity == 0 {
            self.orders.remove(&order_id);
            if let Some(info) = levels.get_mut(&tracked.price) {
                info.order_count = info.order_count.saturating_sub(1);
                if info.order_count == 0 {
                    levels.remove(&tracked.price);
                }
            }
        } else {
            self.orders.insert(order_id, tracked);
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, LevelInfo> {
        match side {
            Side::Buy => &mut self.buy_levels,
            Side::Sell => &mut self.sell_levels,
        }
    }

    /// Aggregate `(total_quantity, order_count)` at a level, if tracked.
    pub fn level(&self, side: Side, price: Decimal) -> Option<(u64, u32)> {
        let levels = match side {
            Side::Buy => &self.buy_levels,
            Side::Sell => &self.sell_levels,
        };
        levels
            .get(&price)
            .map(|info| (info.total_quantity, info.order_count))
    }

    /// Number of orders currently tracked as resting.
    pub fn tracked_orders(&self) -> usize {
        self.orders.len()
    }

    fn format_levels(&self, side: Side, max_levels: usize, out: &mut String) {
        let levels: Box<dyn Iterator<Item = (&Decimal, &LevelInfo)>> = match side {
            Side::Buy => Box::new(self.buy_levels.iter().rev()),
            Side::Sell => Box::new(self.sell_levels.iter()),
        };
        for (i, (price, info)) in levels.take(max_levels).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}:{}({})", price, info.total_quantity, info.order_count);
        }
    }
}

// ───────────────────────────── formatting ─────────────────────────────

fn push_indent(out: &mut String, depth: u32) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn push_context(out: &mut String, event: &TraceEvent) {
    match event.context_order_id {
        Some(id) => {
            let _ = write!(out, "{}", id);
        }
        None => out.push_str("N/A"),
    }
    out.push_str(" | ");
    push_indent(out, event.depth);
}

fn push_opt<T: std::fmt::Display>(out: &mut String, value: Option<T>) {
    if let Some(v) = value {
        let _ = write!(out, "{}", v);
    }
}

/// Formats one event as its trace-log line(s), without a trailing newline.
/// ORDER_IN renders two lines (the order and the merged submit CALL).
/// SNAPSHOT renders the top `snapshot_levels` of each side of `book`.
pub fn format_event(
    event: &TraceEvent,
    book: &VirtualBook,
    snapshot_levels: usize,
    out: &mut String,
) {
    match event.kind {
        TraceEventKind::OrderIn => {
            push_context(out, event);
            out.push_str("ORDER_IN | ");
            push_opt(out, event.order_id);
            out.push_str(" | ");
            push_opt(out, event.side);
            out.push_str(" | ");
            push_opt(out, event.order_type);
            let _ = write!(out, " | qty={} | price=", event.quantity);
            push_opt(out, event.price);
            if let Some(uuid) = event.function_uuid {
                out.push('\n');
                push_context(out, event);
                let _ = write!(out, "CALL | {}", uuid);
            }
        }
        TraceEventKind::Call => {
            push_context(out, event);
            out.push_str("CALL | ");
            push_opt(out, event.function_uuid);
        }
        TraceEventKind::ExecReport => {
            push_context(out, event);
            out.push_str("  EXEC_REPORT | ");
            push_opt(out, event.order_id);
            out.push_str(" | ");
            push_opt(out, event.side);
            out.push_str(" | ");
            push_opt(out, event.execution_type);
            let _ = write!(
                out,
                " | qty={} | lastQty={} | cumQty={} | price=",
                event.order_size, event.last_quantity, event.cumulative_quantity
            );
            push_opt(out, event.price);
        }
        TraceEventKind::BookAdd => {
            push_context(out, event);
            out.push_str("  BOOK_ADD | ");
            push_opt(out, event.order_id);
            out.push_str(" | ");
            push_opt(out, event.side);
            out.push_str(" | price=");
            push_opt(out, event.price);
            let _ = write!(
                out,
                " | remainingQty={} | cumQty={}",
                event.remaining_quantity, event.cumulative_quantity
            );
        }
        TraceEventKind::Snapshot => {
            push_context(out, event);
            out.push_str("SNAPSHOT | Buy: [");
            book.format_levels(Side::Buy, snapshot_levels, out);
            out.push_str("] Sell: [");
            book.format_levels(Side::Sell, snapshot_levels, out);
            out.push(']');
        }
    }
}

// ───────────────────────────── sink ─────────────────────────────

/// Write sink that downgrades itself to a null sink after the first failure,
/// with a single diagnostic; matching must never notice trace I/O problems.
struct TraceSink {
    inner: Box<dyn Write + Send>,
    degraded: bool,
}

impl TraceSink {
    fn file(path: &std::path::Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Box::new(BufWriter::with_capacity(SINK_BUFFER, file)),
            degraded: false,
        })
    }

    fn null() -> Self {
        Self {
            inner: Box::new(io::sink()),
            degraded: false,
        }
    }

    fn write_str(&mut self, s: &str) {
        if let Err(error) = self.inner.write_all(s.as_bytes()) {
            self.degrade(&error);
        }
    }

    fn flush(&mut self) {
        if let Err(error) = self.inner.flush() {
            self.degrade(&error);
        }
    }

    fn degrade(&mut self, error: &io::Error) {
        if !self.degraded {
            tracing::warn!(%error, "trace sink write failed; discarding further trace output");
        }
        self.inner = Box::new(io::sink());
        self.degraded = true;
    }
}

fn write_header(sink: &mut TraceSink) {
    let mut out = String::new();
    out.push_str("=== Function Metadata ===\n\n");
    let groups: [(&str, &[FunctionMetadata]); 2] = [
        ("MatchingEngine", &functions::ENGINE_FUNCTIONS),
        ("OrderBook", &functions::BOOK_FUNCTIONS),
    ];
    for (component, group) in groups {
        let _ = writeln!(out, "Component: {}", component);
        out.push('\n');
        for f in group {
            let _ = writeln!(out, "  Function: {}", f.name);
            let _ = writeln!(out, "  UUID: {}", f.uuid);
            let _ = writeln!(out, "  Description: {}", f.description);
            out.push('\n');
        }
    }
    out.push_str("=== Execution Trace ===\n\n");
    sink.write_str(&out);
}

// ───────────────────────────── worker ─────────────────────────────

struct DrainState {
    consumer: Consumer,
    book: VirtualBook,
    sink: TraceSink,
    buf: String,
    snapshot_levels: usize,
}

impl DrainState {
    fn process(&mut self, event: TraceEvent) {
        self.book.apply(&event);
        format_event(&event, &self.book, self.snapshot_levels, &mut self.buf);
        self.buf.push('\n');
        if self.buf.len() >= FLUSH_HIGH_WATER {
            self.flush_buf();
        }
    }

    fn flush_buf(&mut self) {
        if !self.buf.is_empty() {
            self.sink.write_str(&self.buf);
            self.buf.clear();
        }
    }

    fn drain_remaining(&mut self) {
        while let Some(event) = self.consumer.poll().copied() {
            self.consumer.release();
            self.process(event);
        }
        self.flush_buf();
        self.sink.flush();
    }
}

/// Background consumer of the trace ring; the only writer to the trace sink.
///
/// [`DrainWorker::shutdown`] (also run on drop) signals the thread, joins it
/// with a bounded timeout, and performs a final best-effort drain from the
/// calling thread before flushing and closing the sink.
pub struct DrainWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<DrainState>>,
}

impl DrainWorker {
    /// Opens the sink, writes the function-metadata header, and starts the
    /// drain thread.
    pub fn spawn(consumer: Consumer, config: &TraceConfig) -> io::Result<Self> {
        let mut sink = match config.output {
            TraceOutput::File => TraceSink::file(&config.logfile)?,
            TraceOutput::None => TraceSink::null(),
        };
        write_header(&mut sink);

        let state = DrainState {
            consumer,
            book: VirtualBook::new(),
            sink,
            buf: String::with_capacity(FLUSH_HIGH_WATER),
            snapshot_levels: config.snapshot_levels,
        };
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("trace-drain".into())
            .spawn(move || run(state, thread_running))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stops the worker: drains the ring, flushes, and closes the sink.
    pub fn shutdown(mut self) {
        self.shutdown_impl();
    }

    fn shutdown_impl(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        handle.thread().unpark();

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !handle.is_finished() {
            tracing::warn!(
                timeout = ?JOIN_TIMEOUT,
                "trace drain thread did not stop in time; trace output may be truncated"
            );
            return;
        }
        match handle.join() {
            // Safety net: catch anything published between the worker's last
            // poll and the producer going quiet.
            Ok(mut state) => state.drain_remaining(),
            Err(_) => tracing::warn!("trace drain thread panicked; trace output may be truncated"),
        }
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        self.shutdown_impl();
    }
}

fn run(mut state: DrainState, running: Arc<AtomicBool>) -> DrainState {
    loop {
        match state.consumer.poll().copied() {
            Some(event) => {
                state.consumer.release();
                state.process(event);
            }
            None => {
                state.flush_buf();
                if !running.load(Ordering::Acquire) && state.consumer.is_empty() {
                    break;
                }
                thread::park_timeout(PARK_INTERVAL);
            }
        }
    }
    state.drain_remaining();
    state
}
