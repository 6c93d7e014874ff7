//! Price-time priority matching.
//!
//! The match loop walks the opposite side of the book best-price-first,
//! filling at each resting order's price (maker price). Within a price level
//! the head of the FIFO matches first. Trace CALL events for the book
//! operations are emitted here, at the call sites, so the book itself stays
//! free of instrumentation state.

use crate::execution::ExecutionReport;
use crate::order_book::OrderBook;
use crate::trace::{functions, Tracer};
use crate::types::{Order, OrderType, Side};
use rust_decimal::Decimal;

/// Matches an incoming buy against resting sells. For a limit buy, stops once
/// the best ask exceeds the limit price; a market buy walks the book until
/// filled or the sell side is exhausted.
pub(crate) fn match_buy_order(
    book: &mut OrderBook,
    incoming: &mut Order,
    reports: &mut Vec<ExecutionReport>,
    trace: &mut Tracer,
) {
    trace.call(functions::MATCH_BUY_ORDER.uuid);
    trace.enter();
    while incoming.remaining_quantity > 0 {
        trace.call(functions::BEST_SELL.uuid);
        let Some((resting_price, resting)) = book.best_mut(Side::Sell) else {
            break;
        };
        if incoming.order_type == OrderType::Limit {
            match incoming.price {
                Some(limit) if resting_price > limit => break,
                _ => {}
            }
        }
        let resting_filled = execute_fill(incoming, resting, resting_price, reports, trace);
        if resting_filled {
            trace.call(functions::BOOK_REMOVE.uuid);
            book.remove(Side::Sell, resting_price);
        }
    }
    trace.exit();
}

/// Matches an incoming sell against resting buys. For a limit sell, stops
/// once the best bid falls below the limit price.
pub(crate) fn match_sell_order(
    book: &mut OrderBook,
    incoming: &mut Order,
    reports: &mut Vec<ExecutionReport>,
    trace: &mut Tracer,
) {
    trace.call(functions::MATCH_SELL_ORDER.uuid);
    trace.enter();
    while incoming.remaining_quantity > 0 {
        trace.call(functions::BEST_BUY.uuid);
        let Some((resting_price, resting)) = book.best_mut(Side::Buy) else {
            break;
        };
        if incoming.order_type == OrderType::Limit {
            match incoming.price {
                Some(limit) if resting_price < limit => break,
                _ => {}
            }
        }
        let resting_filled = execute_fill(incoming, resting, resting_price, reports, trace);
        if resting_filled {
            trace.call(functions::BOOK_REMOVE.uuid);
            book.remove(Side::Buy, resting_price);
        }
    }
    trace.exit();
}

/// Executes one fill at `price` for the minimum of both remaining quantities,
/// updating both orders before either report is generated, then records the
/// reports in `[incoming, resting]` order. Returns whether the resting order
/// is now fully filled (and must be removed from the book).
fn execute_fill(
    incoming: &mut Order,
    resting: &mut Order,
    price: Decimal,
    reports: &mut Vec<ExecutionReport>,
    trace: &mut Tracer,
) -> bool {
    trace.call(functions::EXECUTE_FILL.uuid);
    trace.enter();

    let fill_quantity = incoming.remaining_quantity.min(resting.remaining_quantity);
    incoming.fill(fill_quantity);
    resting.fill(fill_quantity);

    let incoming_report = ExecutionReport::fill(incoming, price, fill_quantity);
    let resting_report = ExecutionReport::fill(resting, price, fill_quantity);
    record_execution_report(reports, trace, incoming_report);
    record_execution_report(reports, trace, resting_report);

    let resting_filled = resting.is_fully_filled();
    trace.exit();
    resting_filled
}

/// Appends a report to the engine's generation-ordered log and emits the
/// matching EXEC_REPORT trace event.
pub(crate) fn record_execution_report(
    reports: &mut Vec<ExecutionReport>,
    trace: &mut Tracer,
    report: ExecutionReport,
) {
    trace.exec_report(&report);
    reports.push(report);
}
