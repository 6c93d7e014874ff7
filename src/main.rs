//! Driver: replay an order CSV through the matching engine with tracing
//! attached, write the execution-report CSV, and print a summary.

use clap::{Parser, ValueEnum};
use lucid_matching_engine::{csv_io, trace, MatchingEngine, Side, TraceConfig, TraceOutput};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TraceOutputArg {
    /// Write the trace log to the path given by --trace-log.
    File,
    /// Discard all trace output.
    None,
}

impl From<TraceOutputArg> for TraceOutput {
    fn from(arg: TraceOutputArg) -> Self {
        match arg {
            TraceOutputArg::File => TraceOutput::File,
            TraceOutputArg::None => TraceOutput::None,
        }
    }
}

/// Replay an order CSV through the matching engine.
#[derive(Debug, Parser)]
#[command(name = "lucid-matching-engine", version, about)]
struct Args {
    /// Order CSV to replay (orderId,side,orderType,quantity,price).
    #[arg(default_value = "orders.csv")]
    input: PathBuf,

    /// Execution-report CSV to write.
    #[arg(default_value = "executions.csv")]
    output: PathBuf,

    /// Trace output mode.
    #[arg(long, value_enum, default_value = "file")]
    trace_output: TraceOutputArg,

    /// Trace log path (used with --trace-output file).
    #[arg(long, default_value = "instrumentation.log")]
    trace_log: PathBuf,

    /// Price levels per side in SNAPSHOT lines.
    #[arg(long, default_value_t = 5)]
    snapshot_levels: usize,

    /// Emit a SNAPSHOT every N orders.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    snapshot_interval: u64,

    /// Run matching without claiming any trace events.
    #[arg(long)]
    no_emit: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let orders = csv_io::read_orders(&args.input)?;
    info!(input = %args.input.display(), count = orders.len(), "read orders");

    let config = TraceConfig {
        output: args.trace_output.into(),
        logfile: args.trace_log.clone(),
        snapshot_levels: args.snapshot_levels,
        snapshot_interval: args.snapshot_interval,
        emit: !args.no_emit,
        ..TraceConfig::default()
    };
    let (tracer, drain) = trace::init(&config)?;

    let mut engine = MatchingEngine::with_tracer(tracer);
    let mut rejected = 0usize;
    for order in orders {
        if let Err(reason) = engine.submit(order) {
            warn!(%reason, "order rejected");
            rejected += 1;
        }
    }

    // The engine is done emitting; drain the ring and close the trace sink.
    drain.shutdown();

    csv_io::write_execution_reports(&args.output, engine.execution_reports())?;
    info!(
        output = %args.output.display(),
        reports = engine.execution_reports().len(),
        rejected,
        "wrote execution reports"
    );

    let book = engine.book();
    info!(
        buy_levels = book.depth(Side::Buy),
        buy_orders = book.order_count(Side::Buy),
        sell_levels = book.depth(Side::Sell),
        sell_orders = book.order_count(Side::Sell),
        best_bid = ?engine.best_bid(),
        best_ask = ?engine.best_ask(),
        "final book"
    );
    Ok(())
}
