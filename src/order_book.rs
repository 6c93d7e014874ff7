//! Single-instrument order book: bids and asks, price-time priority.
//!
//! Each side is a price-indexed map of FIFO queues. Best bid is the highest
//! price, best ask the lowest. The book owns resting orders: an order is
//! handed to [`OrderBook::insert`] only after matching completes for its
//! submission, and leaves through [`OrderBook::remove`] when fully filled.

use crate::types::{Order, OrderType, Side};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

type BookSide = BTreeMap<Decimal, VecDeque<Order>>;

/// Price-time priority book. Levels with no orders are pruned, so iteration
/// never traverses empty queues.
#[derive(Debug, Default)]
pub struct OrderBook {
    buy_side: BookSide,
    sell_side: BookSide,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.buy_side,
            Side::Sell => &self.sell_side,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.buy_side,
            Side::Sell => &mut self.sell_side,
        }
    }

    /// Appends a resting order to the FIFO queue at its price, creating the
    /// level if absent.
    ///
    /// Panics on a market order, an order without a price, or an order with
    /// nothing left to fill; any of those in the book is a broken engine
    /// invariant.
    pub fn insert(&mut self, order: Order) {
        assert!(
            order.order_type == OrderType::Limit,
            "only limit orders rest on the book"
        );
        assert!(
            order.remaining_quantity > 0,
            "resting order must have remaining quantity"
        );
        let price = match order.price {
            Some(p) => p,
            None => panic!("limit order without a price cannot rest"),
        };
        self.side_mut(order.side)
            .entry(price)
            .or_default()
            .push_back(order);
    }

    /// Head of the best-priced queue on `side` with its price level, or `None`
    /// if the side is empty. Best is highest price for buys, lowest for sells.
    pub fn best(&self, side: Side) -> Option<(Decimal, &Order)> {
        let entry = match side {
            Side::Buy => self.buy_side.iter().next_back(),
            Side::Sell => self.sell_side.iter().next(),
        };
        entry.and_then(|(price, queue)| queue.front().map(|order| (*price, order)))
    }

    /// Mutable view of the best resting order, used by the match loop to
    /// apply fills in place.
    pub fn best_mut(&mut self, side: Side) -> Option<(Decimal, &mut Order)> {
        let entry = match side {
            Side::Buy => self.buy_side.iter_mut().next_back(),
            Side::Sell => self.sell_side.iter_mut().next(),
        };
        entry.and_then(|(price, queue)| queue.front_mut().map(|order| (*price, order)))
    }

    /// Removes and returns the head of the queue at `price`, deleting the
    /// level if it becomes empty. The match loop only ever calls this for the
    /// current head after it is fully filled, so removal is O(1) beyond the
    /// level lookup.
    pub fn remove(&mut self, side: Side, price: Decimal) -> Option<Order> {
        let book_side = self.side_mut(side);
        let queue = book_side.get_mut(&price)?;
        let order = queue.pop_front();
        if queue.is_empty() {
            book_side.remove(&price);
        }
        order
    }

    pub fn is_empty(&self, side: Side) -> bool {
        self.side(side).is_empty()
    }

    /// Best bid price (None if empty).
    pub fn best_bid(&self) -> Option<Decimal> {
        self.buy_side.keys().next_back().copied()
    }

    /// Best ask price (None if empty).
    pub fn best_ask(&self) -> Option<Decimal> {
        self.sell_side.keys().next().copied()
    }

    /// Number of populated price levels on `side`.
    pub fn depth(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Number of resting orders on `side`.
    pub fn order_count(&self, side: Side) -> usize {
        self.side(side).values().map(VecDeque::len).sum()
    }

    /// Price levels on `side`, best first.
    pub fn levels(&self, side: Side) -> Box<dyn Iterator<Item = (Decimal, &VecDeque<Order>)> + '_> {
        match side {
            Side::Buy => Box::new(self.buy_side.iter().rev().map(|(p, q)| (*p, q))),
            Side::Sell => Box::new(self.sell_side.iter().map(|(p, q)| (*p, q))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderId;
    use uuid::Uuid;

    fn limit(id: u128, side: Side, qty: u64, price: i64) -> Order {
        Order::limit(OrderId(Uuid::from_u128(id)), side, Decimal::from(price), qty)
    }

    #[test]
    fn best_buy_is_highest_best_sell_is_lowest() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 10, 99));
        book.insert(limit(2, Side::Buy, 10, 101));
        book.insert(limit(3, Side::Sell, 10, 105));
        book.insert(limit(4, Side::Sell, 10, 103));

        let (bid, _) = book.best(Side::Buy).unwrap();
        let (ask, _) = book.best(Side::Sell).unwrap();
        assert_eq!(bid, Decimal::from(101));
        assert_eq!(ask, Decimal::from(103));
        assert_eq!(book.best_bid(), Some(Decimal::from(101)));
        assert_eq!(book.best_ask(), Some(Decimal::from(103)));
    }

    #[test]
    fn same_price_level_is_fifo() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 5, 100));
        book.insert(limit(2, Side::Sell, 7, 100));

        let (_, head) = book.best(Side::Sell).unwrap();
        assert_eq!(head.order_id, OrderId(Uuid::from_u128(1)));

        book.remove(Side::Sell, Decimal::from(100));
        let (_, head) = book.best(Side::Sell).unwrap();
        assert_eq!(head.order_id, OrderId(Uuid::from_u128(2)));
    }

    #[test]
    fn remove_prunes_empty_level() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 5, 100));
        assert_eq!(book.depth(Side::Buy), 1);

        let removed = book.remove(Side::Buy, Decimal::from(100)).unwrap();
        assert_eq!(removed.order_id, OrderId(Uuid::from_u128(1)));
        assert!(book.is_empty(Side::Buy));
        assert_eq!(book.depth(Side::Buy), 0);
        assert!(book.remove(Side::Buy, Decimal::from(100)).is_none());
    }

    #[test]
    fn order_count_sums_across_levels() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 5, 100));
        book.insert(limit(2, Side::Sell, 5, 100));
        book.insert(limit(3, Side::Sell, 5, 101));
        assert_eq!(book.order_count(Side::Sell), 3);
        assert_eq!(book.depth(Side::Sell), 2);
    }

    #[test]
    fn levels_iterate_best_first() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 5, 99));
        book.insert(limit(2, Side::Buy, 5, 101));
        let prices: Vec<Decimal> = book.levels(Side::Buy).map(|(p, _)| p).collect();
        assert_eq!(prices, vec![Decimal::from(101), Decimal::from(99)]);
    }

    #[test]
    #[should_panic(expected = "only limit orders")]
    fn market_order_cannot_rest() {
        let mut book = OrderBook::new();
        book.insert(Order::market(OrderId(Uuid::from_u128(9)), Side::Buy, 5));
    }
}
