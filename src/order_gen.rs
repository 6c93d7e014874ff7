//! Deterministic synthetic order streams for replay tests, demos, and
//! benchmarks. Same seed ⇒ same sequence of orders, including order ids
//! (drawn from the seeded RNG, not from a random UUID source).

use crate::types::{Order, OrderId, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Configuration for the synthetic order generator. All ranges are inclusive.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// RNG seed. Same seed ⇒ same order stream.
    pub seed: u64,
    /// Number of orders produced by [`Generator::all_orders`].
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Probability of Limit (0.0..=1.0). Market otherwise.
    pub limit_ratio: f64,
    /// Price range for limit orders, in whole price units.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range, whole units.
    pub quantity_min: u64,
    pub quantity_max: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_orders: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.9,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
        }
    }
}

/// Deterministic order stream. Create with [`Generator::new`]; call
/// [`Generator::next_order`] or collect with [`Generator::all_orders`].
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
}

impl Generator {
    /// Builds a generator with the given config. Same config (including seed)
    /// ⇒ same stream.
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { rng, config }
    }

    /// Generates the next order. Advances internal RNG state.
    pub fn next_order(&mut self) -> Order {
        let order_id = OrderId(Uuid::from_bytes(self.rng.gen()));
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let is_limit = self.rng.gen::<f64>() < self.config.limit_ratio;
        let quantity = self
            .rng
            .gen_range(self.config.quantity_min..=self.config.quantity_max);
        if is_limit {
            let price = self
                .rng
                .gen_range(self.config.price_min..=self.config.price_max);
            Order::limit(order_id, side, Decimal::from(price), quantity)
        } else {
            Order::market(order_id, side, quantity)
        }
    }

    /// Returns a vector of exactly `n` orders, advancing the generator state.
    pub fn take_orders(&mut self, n: usize) -> Vec<Order> {
        (0..n).map(|_| self.next_order()).collect()
    }

    /// Returns the full stream as defined by `config.num_orders`.
    pub fn all_orders(&mut self) -> Vec<Order> {
        self.take_orders(self.config.num_orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderType;

    #[test]
    fn same_seed_same_stream() {
        let config = GeneratorConfig {
            seed: 42,
            num_orders: 10,
            ..Default::default()
        };
        let orders1 = Generator::new(config.clone()).all_orders();
        let orders2 = Generator::new(config).all_orders();
        assert_eq!(orders1.len(), 10);
        for (a, b) in orders1.iter().zip(orders2.iter()) {
            assert_eq!(a.order_id, b.order_id);
            assert_eq!(a.side, b.side);
            assert_eq!(a.order_type, b.order_type);
            assert_eq!(a.quantity, b.quantity);
            assert_eq!(a.price, b.price);
        }
    }

    #[test]
    fn different_seed_different_stream() {
        let o1 = Generator::new(GeneratorConfig {
            seed: 1,
            num_orders: 5,
            ..Default::default()
        })
        .all_orders();
        let o2 = Generator::new(GeneratorConfig {
            seed: 2,
            num_orders: 5,
            ..Default::default()
        })
        .all_orders();
        let identical = o1
            .iter()
            .zip(o2.iter())
            .all(|(a, b)| a.order_id == b.order_id);
        assert!(!identical, "different seeds should produce different ids");
    }

    #[test]
    fn generated_orders_are_well_formed() {
        let orders = Generator::new(GeneratorConfig {
            seed: 7,
            num_orders: 200,
            ..Default::default()
        })
        .all_orders();
        for order in &orders {
            assert!(order.quantity >= 1);
            assert_eq!(order.remaining_quantity, order.quantity);
            assert_eq!(order.cumulative_quantity, 0);
            match order.order_type {
                OrderType::Limit => assert!(order.price.is_some()),
                OrderType::Market => assert!(order.price.is_none()),
            }
        }
    }
}
