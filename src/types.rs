//! Core types for the matching engine (order message and lifecycle).
//!
//! [`Order`], [`Side`], [`OrderType`], and [`ExecutionType`] define the order
//! message and its lifecycle states. [`OrderId`] is a 128-bit identifier whose
//! boundary form is URL-safe Base64 of the raw 16 bytes (22 chars, no padding).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Unique order identifier: 128 bits, rendered as URL-safe Base64 at the CSV
/// and trace boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderId(pub Uuid);

/// Error for order-id strings that are not URL-safe Base64 of exactly 16 bytes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("order id must be url-safe base64 of 16 bytes: {0:?}")]
pub struct InvalidOrderId(pub String);

impl OrderId {
    /// Decodes the boundary form: URL-safe Base64, no padding, 16 raw bytes.
    pub fn from_base64(s: &str) -> Result<Self, InvalidOrderId> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| InvalidOrderId(s.to_string()))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| InvalidOrderId(s.to_string()))?;
        Ok(Self(Uuid::from_bytes(bytes)))
    }

    /// Encodes the boundary form (22 characters).
    pub fn to_base64(self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl serde::Serialize for OrderId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> serde::Deserialize<'de> for OrderId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        OrderId::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        })
    }
}

/// Order type: limit (with price) or market (take best available).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
        })
    }
}

/// Execution-report type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    PartialFill,
    FullFill,
    Cancel,
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionType::PartialFill => "PARTIAL_FILL",
            ExecutionType::FullFill => "FULL_FILL",
            ExecutionType::Cancel => "CANCEL",
        })
    }
}

/// Order message.
///
/// For limit orders, `price` must be `Some(...)`. For market orders, `price`
/// is `None` (a price supplied at the boundary is ignored).
///
/// `arrival_sequence` is the time-priority tiebreaker, assigned by the engine
/// at submission. A wall-clock stamp captured at construction would also work
/// as long as it stays strictly monotonic under rapid submission; a dedicated
/// counter has no such caveat, so the engine uses one.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    /// Original size; immutable after construction.
    pub quantity: u64,
    pub remaining_quantity: u64,
    pub cumulative_quantity: u64,
    pub arrival_sequence: u64,
}

impl Order {
    /// Builds a limit order with the full quantity unfilled.
    pub fn limit(order_id: OrderId, side: Side, price: Decimal, quantity: u64) -> Self {
        Self {
            order_id,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity,
            remaining_quantity: quantity,
            cumulative_quantity: 0,
            arrival_sequence: 0,
        }
    }

    /// Builds a market order with the full quantity unfilled.
    pub fn market(order_id: OrderId, side: Side, quantity: u64) -> Self {
        Self {
            order_id,
            side,
            order_type: OrderType::Market,
            price: None,
            quantity,
            remaining_quantity: quantity,
            cumulative_quantity: 0,
            arrival_sequence: 0,
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    pub fn is_market(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_fully_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Applies a fill: moves `fill_quantity` from remaining to cumulative.
    ///
    /// Panics if the fill is zero or exceeds the remaining quantity; a fill
    /// that large means the match loop is broken and the engine must not
    /// continue.
    pub fn fill(&mut self, fill_quantity: u64) {
        assert!(fill_quantity > 0, "fill quantity must be positive");
        assert!(
            fill_quantity <= self.remaining_quantity,
            "fill {} exceeds remaining {} on order {}",
            fill_quantity,
            self.remaining_quantity,
            self.order_id
        );
        self.remaining_quantity -= fill_quantity;
        self.cumulative_quantity += fill_quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_base64_round_trip() {
        let id = OrderId(Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef));
        let encoded = id.to_base64();
        assert_eq!(encoded.len(), 22);
        assert_eq!(OrderId::from_base64(&encoded), Ok(id));
    }

    #[test]
    fn order_id_rejects_wrong_length() {
        assert!(OrderId::from_base64("AAAA").is_err());
        assert!(OrderId::from_base64("not base64 at all!").is_err());
    }

    #[test]
    fn fill_conserves_quantity() {
        let mut order = Order::limit(OrderId(Uuid::from_u128(1)), Side::Buy, Decimal::from(100), 10);
        order.fill(4);
        assert_eq!(order.remaining_quantity, 6);
        assert_eq!(order.cumulative_quantity, 4);
        assert_eq!(order.quantity, order.remaining_quantity + order.cumulative_quantity);
        order.fill(6);
        assert!(order.is_fully_filled());
    }

    #[test]
    #[should_panic(expected = "exceeds remaining")]
    fn fill_beyond_remaining_panics() {
        let mut order = Order::market(OrderId(Uuid::from_u128(2)), Side::Sell, 5);
        order.fill(6);
    }

    #[test]
    fn display_forms_match_wire_format() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(OrderType::Market.to_string(), "MARKET");
        assert_eq!(ExecutionType::PartialFill.to_string(), "PARTIAL_FILL");
        assert_eq!(ExecutionType::Cancel.to_string(), "CANCEL");
    }
}
