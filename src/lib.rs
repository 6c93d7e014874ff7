//! # Lucid Matching Engine
//!
//! Price-time priority matching for a single instrument, with a
//! non-intrusive execution-tracing pipeline: the engine thread publishes
//! structured events into a lossy SPSC ring buffer, and a background drain
//! thread reconstructs a virtual book and writes the trace log.
//!
//! ## Entry points
//!
//! [`MatchingEngine::submit`] processes one order to completion. Attach the
//! tracing pipeline with [`trace::init`]:
//!
//! ```rust
//! use lucid_matching_engine::{MatchingEngine, Order, OrderId, Side};
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! let mut engine = MatchingEngine::new();
//! engine
//!     .submit(Order::limit(OrderId(Uuid::from_u128(1)), Side::Buy, Decimal::from(100), 10))
//!     .unwrap();
//! engine
//!     .submit(Order::limit(OrderId(Uuid::from_u128(2)), Side::Sell, Decimal::from(100), 10))
//!     .unwrap();
//! assert_eq!(engine.execution_reports().len(), 2);
//! assert!(engine.best_bid().is_none());
//! ```
//!
//! ## Threads
//!
//! Exactly two: the engine thread (sole ring producer, no I/O) and the drain
//! thread (sole consumer, sole trace-sink writer). Matching never blocks on
//! instrumentation; when the ring is full, events are dropped.

pub mod csv_io;
pub mod drain;
pub mod engine;
pub mod error;
pub mod execution;
mod matching;
pub mod order_book;
pub mod order_gen;
pub mod ring;
pub mod trace;
pub mod types;

pub use drain::{DrainWorker, VirtualBook};
pub use engine::MatchingEngine;
pub use error::{CsvError, OrderParseError, OrderRejected};
pub use execution::ExecutionReport;
pub use order_book::OrderBook;
pub use trace::{TraceConfig, TraceOutput, Tracer};
pub use types::{ExecutionType, Order, OrderId, OrderType, Side};
