//! Single-entry matching engine.
//!
//! [`MatchingEngine::submit`] processes one order to completion: match, then
//! rest a limit residual or cancel a market residual. Strictly
//! single-threaded; the engine mutates the book and the report log on the
//! calling thread only, and the only cross-thread traffic is the trace ring
//! inside the engine's [`Tracer`].

use crate::error::OrderRejected;
use crate::execution::ExecutionReport;
use crate::matching::{match_buy_order, match_sell_order, record_execution_report};
use crate::order_book::OrderBook;
use crate::trace::Tracer;
use crate::types::{Order, OrderType, Side};
use rust_decimal::Decimal;

/// Single-instrument matching engine with an ordered, lossless execution
/// report log and an optional trace producer.
pub struct MatchingEngine {
    book: OrderBook,
    execution_reports: Vec<ExecutionReport>,
    next_arrival_sequence: u64,
    trace: Tracer,
}

impl MatchingEngine {
    /// Engine without tracing.
    pub fn new() -> Self {
        Self::with_tracer(Tracer::disabled())
    }

    /// Engine emitting trace events through `trace` (see [`crate::trace::init`]).
    pub fn with_tracer(trace: Tracer) -> Self {
        Self {
            book: OrderBook::new(),
            execution_reports: Vec::new(),
            next_arrival_sequence: 1,
            trace,
        }
    }

    /// Processes a single order to completion.
    ///
    /// Rejected orders (non-positive quantity, limit without a price) produce
    /// no execution report and leave the book untouched. A price supplied on
    /// a market order is ignored.
    pub fn submit(&mut self, mut order: Order) -> Result<(), OrderRejected> {
        if order.quantity == 0 {
            return Err(OrderRejected::NonPositiveQuantity);
        }
        match order.order_type {
            OrderType::Limit if order.price.is_none() => {
                return Err(OrderRejected::LimitWithoutPrice)
            }
            OrderType::Market => order.price = None,
            OrderType::Limit => {}
        }
        order.arrival_sequence = self.next_arrival_sequence;
        self.next_arrival_sequence += 1;

        self.trace.order_in(&order);
        self.trace.enter();

        match order.side {
            Side::Buy => match_buy_order(
                &mut self.book,
                &mut order,
                &mut self.execution_reports,
                &mut self.trace,
            ),
            Side::Sell => match_sell_order(
                &mut self.book,
                &mut order,
                &mut self.execution_reports,
                &mut self.trace,
            ),
        }

        if order.remaining_quantity > 0 {
            if order.order_type == OrderType::Limit {
                self.trace.book_add(&order);
                self.book.insert(order);
            } else {
                let report = ExecutionReport::cancel(&order);
                record_execution_report(&mut self.execution_reports, &mut self.trace, report);
            }
        }

        self.trace.exit_order();
        Ok(())
    }

    /// Execution reports in generation order.
    pub fn execution_reports(&self) -> &[ExecutionReport] {
        &self.execution_reports
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Best bid price, if any.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.book.best_bid()
    }

    /// Best ask price, if any.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.book.best_ask()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
