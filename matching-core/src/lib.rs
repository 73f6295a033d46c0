//! Multi-symbol limit order book with price-time priority matching.
//!
//! Core pieces:
//! - [`price_levels::PriceLevelIndex`]: ordered price levels for one side
//!   of one symbol, O(log P) insert/find/remove, O(1) best-price access.
//! - [`book::OrderBook`]: one symbol's bid/ask indices plus cached best
//!   prices and last-trade state.
//! - [`engine::MatchingEngine`]: routes submissions to the right book and
//!   drives the crossing loop under that book's gate.

pub mod book;
pub mod engine;
pub mod error;
pub mod price_levels;
pub mod types;

pub use book::OrderBook;
pub use engine::MatchingEngine;
pub use error::MatchingError;
pub use price_levels::{PriceKey, PriceLevel, PriceLevelIndex};
pub use types::{ExecutionReport, MatchResult, Order, OrderId, OrderStatus, OrderType, Side};
