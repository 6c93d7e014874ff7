//! CSV boundary: order ingest and execution-report export.
//!
//! Input format (header row required):
//! `orderId,side,orderType,quantity,price` — `orderId` is URL-safe Base64 of
//! 16 bytes, `price` is empty for market orders. Ingest is fault-tolerant:
//! malformed lines are logged and skipped so one bad order cannot block a
//! batch.
//!
//! Output format: `orderId,side,executionType,orderSize,lastQuantity,`
//! `cumulativeQuantity,price`, one report per line in generation order,
//! empty price for cancels.

use crate::error::{CsvError, OrderParseError};
use crate::execution::ExecutionReport;
use crate::types::{Order, OrderId, OrderType, Side};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRecord {
    order_id: OrderId,
    side: Side,
    order_type: OrderType,
    quantity: u64,
    #[serde(default, deserialize_with = "crate::execution::de_option_decimal")]
    price: Option<Decimal>,
}

fn order_from_record(record: OrderRecord) -> Result<Order, OrderParseError> {
    if record.quantity == 0 {
        return Err(OrderParseError::NonPositiveQuantity);
    }
    match record.order_type {
        OrderType::Limit => {
            let price = record.price.ok_or(OrderParseError::MissingPrice)?;
            Ok(Order::limit(record.order_id, record.side, price, record.quantity))
        }
        // A market order with a price field present: the price is ignored.
        OrderType::Market => Ok(Order::market(record.order_id, record.side, record.quantity)),
    }
}

/// Reads orders from `path`, preserving line order (submission sequence).
/// Lines that fail to parse or validate are skipped with a warning.
pub fn read_orders(path: &Path) -> Result<Vec<Order>, CsvError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut orders = Vec::new();
    for (index, result) in reader.deserialize::<OrderRecord>().enumerate() {
        // Header is line 1, first record line 2.
        let line = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                warn!(line, %error, "skipping malformed order line");
                continue;
            }
        };
        match order_from_record(record) {
            Ok(order) => orders.push(order),
            Err(error) => warn!(line, %error, "skipping invalid order"),
        }
    }
    Ok(orders)
}

/// Writes execution reports to `path` in generation order.
pub fn write_execution_reports(path: &Path, reports: &[ExecutionReport]) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_path(path)?;
    for report in reports {
        writer.serialize(report)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads execution reports back from `path` (audit tooling and round-trip
/// tests).
pub fn read_execution_reports(path: &Path) -> Result<Vec<ExecutionReport>, CsvError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut reports = Vec::new();
    for result in reader.deserialize::<ExecutionReport>() {
        reports.push(result?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionType;
    use std::io::Write as _;
    use uuid::Uuid;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("lucid-csv-{}-{}", std::process::id(), name));
        path
    }

    fn oid(n: u128) -> OrderId {
        OrderId(Uuid::from_u128(n))
    }

    #[test]
    fn reads_orders_and_skips_bad_lines() {
        let path = temp_path("orders.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "orderId,side,orderType,quantity,price").unwrap();
        writeln!(file, "{},BUY,LIMIT,10,100.50", oid(1)).unwrap();
        writeln!(file, "{},SELL,MARKET,5,", oid(2)).unwrap();
        // Bad: unknown side.
        writeln!(file, "{},HOLD,LIMIT,5,100", oid(3)).unwrap();
        // Bad: limit without price.
        writeln!(file, "{},BUY,LIMIT,5,", oid(4)).unwrap();
        // Bad: zero quantity.
        writeln!(file, "{},BUY,LIMIT,0,100", oid(5)).unwrap();
        // Bad: order id is not 16 bytes of base64.
        writeln!(file, "short,BUY,LIMIT,5,100").unwrap();
        drop(file);

        let orders = read_orders(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, oid(1));
        assert_eq!(orders[0].price, Some(Decimal::new(10050, 2)));
        assert_eq!(orders[1].order_type, OrderType::Market);
        assert_eq!(orders[1].price, None);
    }

    #[test]
    fn market_order_price_field_is_ignored() {
        let path = temp_path("market-price.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "orderId,side,orderType,quantity,price").unwrap();
        writeln!(file, "{},BUY,MARKET,5,99.99", oid(1)).unwrap();
        drop(file);

        let orders = read_orders(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, None);
    }

    #[test]
    fn reports_round_trip_through_csv() {
        let reports = vec![
            ExecutionReport {
                order_id: oid(1),
                side: Side::Buy,
                execution_type: ExecutionType::PartialFill,
                order_size: 10,
                last_quantity: 4,
                cumulative_quantity: 4,
                price: Some(Decimal::new(10050, 2)),
            },
            ExecutionReport {
                order_id: oid(2),
                side: Side::Sell,
                execution_type: ExecutionType::Cancel,
                order_size: 5,
                last_quantity: 3,
                cumulative_quantity: 2,
                price: None,
            },
        ];

        let path = temp_path("reports.csv");
        write_execution_reports(&path, &reports).unwrap();
        let parsed = read_execution_reports(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(parsed, reports);
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("orderId,side,executionType,orderSize,lastQuantity,cumulativeQuantity,price")
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with(&format!("{},BUY,PARTIAL_FILL,10,4,4,100.50", oid(1))));
        let second = lines.next().unwrap();
        assert!(second.ends_with(","), "cancel price column must be empty: {second}");
    }
}
