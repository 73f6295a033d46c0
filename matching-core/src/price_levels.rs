use crate::types::{Order, OrderId};
use std::collections::{BTreeMap, VecDeque};

/// Bit-pattern key for an `f64` price. Order book prices are required to
/// be positive and finite, and for that domain IEEE-754 bit patterns of
/// same-signed doubles sort the same way the doubles themselves do, so a
/// plain `BTreeMap` keyed on this gives exact bit-equality lookups
/// (as the spec requires) with the ordering a balanced tree needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceKey(u64);

impl PriceKey {
    pub fn new(price: f64) -> Self {
        debug_assert!(price.is_finite() && price > 0.0, "price must be positive and finite");
        PriceKey(price.to_bits())
    }

    pub fn price(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// All resting orders at one exact price, FIFO, with a cached sum of
/// unfilled quantity so book-level reads never have to walk the queue.
pub struct PriceLevel {
    pub price: f64,
    orders: VecDeque<Order>,
    total_qty: u32,
}

impl PriceLevel {
    fn new(price: f64) -> Self {
        PriceLevel {
            price,
            orders: VecDeque::new(),
            total_qty: 0,
        }
    }

    pub fn total_qty(&self) -> u32 {
        self.total_qty
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    fn push_back(&mut self, order: Order) {
        self.total_qty += order.remaining();
        self.orders.push_back(order);
    }

    /// Removes and returns the resting order at the head of the FIFO,
    /// decrementing the cached total by whatever quantity it still had.
    fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_qty -= order.remaining();
        Some(order)
    }

    /// Decrements the cached total after an in-place fill of the order
    /// currently at the head (caller has already called `apply_fill`).
    fn record_fill(&mut self, qty: u32) {
        self.total_qty -= qty;
    }

    /// Splices a specific order id out of the queue, wherever it sits.
    /// Returns the removed order, if present.
    fn remove(&mut self, id: OrderId) -> Option<Order> {
        let idx = self.orders.iter().position(|o| o.id == id)?;
        let order = self.orders.remove(idx)?;
        self.total_qty -= order.remaining();
        Some(order)
    }
}

/// Ordered collection of price levels for one side of one symbol.
///
/// Traversal orientation (best-first direction) is fixed at construction:
/// bids walk from highest to lowest price, asks from lowest to highest.
/// Backed by a `BTreeMap`, giving O(log P) insert/find/remove and O(1)
/// (amortized) best-level access via `first_key_value`/`last_key_value`.
pub struct PriceLevelIndex {
    is_bid: bool,
    levels: BTreeMap<PriceKey, PriceLevel>,
}

impl PriceLevelIndex {
    pub fn new(is_bid: bool) -> Self {
        PriceLevelIndex {
            is_bid,
            levels: BTreeMap::new(),
        }
    }

    /// Returns the level at `price`, creating an empty one if absent.
    pub fn insert(&mut self, price: f64) -> &mut PriceLevel {
        self.levels
            .entry(PriceKey::new(price))
            .or_insert_with(|| PriceLevel::new(price))
    }

    pub fn find(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.get(&PriceKey::new(price))
    }

    pub fn find_mut(&mut self, price: f64) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&PriceKey::new(price))
    }

    /// Structurally drops the level at `price`. This is a true
    /// `BTreeMap::remove`, never a blanket reset of the whole index —
    /// the source's defect (clearing the entire side after one level
    /// empties) is exactly what this type structurally cannot do, since
    /// removal is keyed to a single node.
    pub fn remove(&mut self, price: f64) {
        self.levels.remove(&PriceKey::new(price));
    }

    /// Drops `price` only if its queue is empty; a no-op otherwise.
    pub fn remove_if_empty(&mut self, price: f64) {
        let key = PriceKey::new(price);
        if self.levels.get(&key).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&key);
        }
    }

    pub fn best(&self) -> Option<&PriceLevel> {
        if self.is_bid {
            self.levels.last_key_value().map(|(_, l)| l)
        } else {
            self.levels.first_key_value().map(|(_, l)| l)
        }
    }

    pub fn best_mut(&mut self) -> Option<&mut PriceLevel> {
        if self.is_bid {
            self.levels.last_entry().map(|e| e.into_mut())
        } else {
            self.levels.first_entry().map(|e| e.into_mut())
        }
    }

    pub fn best_price(&self) -> f64 {
        self.best().map(|l| l.price).unwrap_or(0.0)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn push(&mut self, order: Order) {
        self.insert(order.price).push_back(order);
    }

    /// Pops the order at the head of the best level, removing the level
    /// itself if that empties its queue. Returns `None` if the side is
    /// empty.
    pub fn pop_best_front(&mut self) -> Option<Order> {
        let price = self.best()?.price;
        let level = self.find_mut(price)?;
        let order = level.pop_front();
        self.remove_if_empty(price);
        order
    }

    pub fn record_fill_at_best(&mut self, qty: u32) {
        if let Some(level) = self.best_mut() {
            level.record_fill(qty);
        }
    }

    /// Mutable reference to the order at the head of the best level, for
    /// the matching loop to fill in place.
    pub fn best_front_mut(&mut self) -> Option<&mut Order> {
        self.best_mut().and_then(|l| l.front_mut())
    }

    /// If the order at the head of the best level has been fully
    /// consumed (filled), splices it out and drops the level if that
    /// empties it. No-op if the head order still has remaining quantity
    /// or the side has no levels.
    pub fn pop_front_if_done(&mut self) {
        let price = match self.best() {
            Some(l) => l.price,
            None => return,
        };
        if let Some(level) = self.find_mut(price) {
            if level.front().is_some_and(Order::is_done) {
                level.pop_front();
            }
        }
        self.remove_if_empty(price);
    }

    /// Locates and splices out an order by id, searching every level.
    /// Returns `true` if found. O(P) over levels plus O(n) within the
    /// hit level — acceptable since the contract only requires the
    /// *level* index to be O(log P); per-level scans are bounded by
    /// resting depth at one price.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let mut hit_price = None;
        for (key, level) in self.levels.iter_mut() {
            if level.remove(id).is_some() {
                hit_price = Some(key.price());
                break;
            }
        }
        match hit_price {
            Some(price) => {
                self.remove_if_empty(price);
                true
            }
            None => false,
        }
    }

    /// Up to `max` levels in best-first traversal order, as
    /// `(price, total_qty)` pairs, for market-data snapshots.
    pub fn snapshot(&self, max: usize) -> Vec<(f64, u32)> {
        let iter: Box<dyn Iterator<Item = (&PriceKey, &PriceLevel)>> = if self.is_bid {
            Box::new(self.levels.iter().rev())
        } else {
            Box::new(self.levels.iter())
        };
        iter.take(max).map(|(_, l)| (l.price, l.total_qty)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderStatus, OrderType, Side};

    fn order(id: u64, side: Side, price: f64, qty: u32, ts: u64) -> Order {
        Order {
            id: OrderId(id),
            symbol: "AAPL".into(),
            side,
            order_type: OrderType::Limit,
            price,
            original_qty: qty,
            filled_qty: 0,
            status: OrderStatus::New,
            created_at_us: ts,
        }
    }

    #[test]
    fn best_price_orientation() {
        let mut bids = PriceLevelIndex::new(true);
        bids.push(order(1, Side::Buy, 100.0, 10, 1));
        bids.push(order(2, Side::Buy, 102.0, 10, 2));
        bids.push(order(3, Side::Buy, 98.0, 10, 3));
        assert_eq!(bids.best_price(), 102.0);

        let mut asks = PriceLevelIndex::new(false);
        asks.push(order(4, Side::Sell, 105.0, 10, 4));
        asks.push(order(5, Side::Sell, 101.0, 10, 5));
        assert_eq!(asks.best_price(), 101.0);
    }

    #[test]
    fn fifo_within_level() {
        let mut bids = PriceLevelIndex::new(true);
        bids.push(order(1, Side::Buy, 100.0, 10, 1));
        bids.push(order(2, Side::Buy, 100.0, 20, 2));
        let level = bids.best().unwrap();
        let ids: Vec<u64> = level.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(level.total_qty(), 30);
    }

    #[test]
    fn level_removed_when_emptied_structurally() {
        let mut bids = PriceLevelIndex::new(true);
        bids.push(order(1, Side::Buy, 100.0, 10, 1));
        bids.push(order(2, Side::Buy, 99.0, 10, 2));
        assert_eq!(bids.level_count(), 2);

        bids.pop_best_front();
        assert_eq!(bids.level_count(), 1, "only the emptied level is dropped");
        assert_eq!(bids.best_price(), 99.0, "the other level must survive");
    }

    #[test]
    fn cancel_splices_and_cleans_up() {
        let mut bids = PriceLevelIndex::new(true);
        bids.push(order(1, Side::Buy, 100.0, 10, 1));
        bids.push(order(2, Side::Buy, 100.0, 20, 2));
        bids.push(order(3, Side::Buy, 99.0, 30, 3));

        assert!(bids.cancel(OrderId(2)));
        assert!(!bids.cancel(OrderId(2)), "second cancel is a no-op");

        let level = bids.find(100.0).unwrap();
        assert_eq!(level.len(), 1);
        assert_eq!(level.total_qty(), 10);

        assert!(bids.cancel(OrderId(1)));
        assert!(bids.find(100.0).is_none(), "emptied level must be gone");
        assert_eq!(bids.level_count(), 1);
    }

    #[test]
    fn snapshot_is_best_first() {
        let mut bids = PriceLevelIndex::new(true);
        bids.push(order(1, Side::Buy, 100.0, 10, 1));
        bids.push(order(2, Side::Buy, 102.0, 5, 2));
        bids.push(order(3, Side::Buy, 98.0, 7, 3));

        let snap = bids.snapshot(10);
        assert_eq!(snap, vec![(102.0, 5), (100.0, 10), (98.0, 7)]);
    }
}
