use serde::{Deserialize, Serialize};

/// Monotonically increasing identifier, scoped per book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

/// A single order. Market orders never rest in a book (`price` is
/// meaningless for them and is left at whatever the caller passed).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: f64,
    pub original_qty: u32,
    pub filled_qty: u32,
    pub status: OrderStatus,
    pub created_at_us: u64,
}

impl Order {
    pub fn remaining(&self) -> u32 {
        self.original_qty - self.filled_qty
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    /// Applies a fill, updating filled quantity and status in place.
    pub fn apply_fill(&mut self, qty: u32) {
        debug_assert!(self.filled_qty + qty <= self.original_qty);
        self.filled_qty += qty;
        self.status = if self.filled_qty == self.original_qty {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}

/// One side of a single fill: emitted once per order involved in a trade,
/// so a crossing submission yields reports in pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub counterparty_id: OrderId,
    pub price: f64,
    pub quantity: u32,
    pub status: OrderStatus,
    pub timestamp_us: u64,
}

pub type MatchResult = Vec<ExecutionReport>;
