//! Execution reports (per-side records of fills and cancellations).
//!
//! An [`ExecutionReport`] is emitted for each side of every fill and for the
//! cancellation of an unfilled market-order residual. Reports are immutable
//! after creation and kept in generation order.

use crate::types::{ExecutionType, Order, OrderId, Side};
use rust_decimal::Decimal;

/// Deserializes an optional exact decimal from its string form; an empty or
/// missing field is `None`. Parsing through `FromStr` keeps the scale
/// (`"100.50"` stays `100.50`, not `100.5`).
pub(crate) fn de_option_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One order lifecycle event: a fill on one side of a match, or a cancel.
///
/// Field order matches the report CSV columns
/// (`orderId,side,executionType,orderSize,lastQuantity,cumulativeQuantity,price`).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub side: Side,
    pub execution_type: ExecutionType,
    /// The order's original quantity.
    pub order_size: u64,
    /// This event's fill size; for a cancel, the residual unfilled size.
    pub last_quantity: u64,
    /// The order's total filled at the moment the report was generated.
    pub cumulative_quantity: u64,
    /// Execution price; `None` only for cancels.
    #[serde(default, deserialize_with = "de_option_decimal")]
    pub price: Option<Decimal>,
}

impl ExecutionReport {
    /// Report for one side of a fill. Call after [`Order::fill`] has been
    /// applied, so the full/partial distinction reflects the updated order.
    pub fn fill(order: &Order, price: Decimal, last_quantity: u64) -> Self {
        let execution_type = if order.is_fully_filled() {
            ExecutionType::FullFill
        } else {
            ExecutionType::PartialFill
        };
        Self {
            order_id: order.order_id,
            side: order.side,
            execution_type,
            order_size: order.quantity,
            last_quantity,
            cumulative_quantity: order.cumulative_quantity,
            price: Some(price),
        }
    }

    /// Cancellation report for a market order with residual quantity.
    pub fn cancel(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            side: order.side,
            execution_type: ExecutionType::Cancel,
            order_size: order.quantity,
            last_quantity: order.remaining_quantity,
            cumulative_quantity: order.cumulative_quantity,
            price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn fill_report_full_vs_partial() {
        let mut order = Order::limit(OrderId(Uuid::from_u128(1)), Side::Buy, Decimal::from(100), 10);
        order.fill(4);
        let partial = ExecutionReport::fill(&order, Decimal::from(100), 4);
        assert_eq!(partial.execution_type, ExecutionType::PartialFill);
        assert_eq!(partial.last_quantity, 4);
        assert_eq!(partial.cumulative_quantity, 4);
        assert_eq!(partial.order_size, 10);

        order.fill(6);
        let full = ExecutionReport::fill(&order, Decimal::from(100), 6);
        assert_eq!(full.execution_type, ExecutionType::FullFill);
        assert_eq!(full.cumulative_quantity, 10);
    }

    #[test]
    fn cancel_report_carries_residual_and_no_price() {
        let mut order = Order::market(OrderId(Uuid::from_u128(2)), Side::Buy, 5);
        order.fill(2);
        let cancel = ExecutionReport::cancel(&order);
        assert_eq!(cancel.execution_type, ExecutionType::Cancel);
        assert_eq!(cancel.last_quantity, 3);
        assert_eq!(cancel.cumulative_quantity, 2);
        assert_eq!(cancel.price, None);
    }
}
