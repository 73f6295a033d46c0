use crate::book::OrderBook;
use crate::error::MatchingError;
use crate::types::{ExecutionReport, MatchResult, Order, OrderId, OrderStatus, OrderType, Side};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_micros() as u64
}

/// Routes order submissions and cancellations to the per-symbol book,
/// driving the crossing algorithm under that book's exclusive gate.
///
/// Books are looked up through a `DashMap`, so resolving a symbol never
/// blocks on another symbol's in-flight match; the `Mutex` inside each
/// entry is what actually serializes submissions within one book.
pub struct MatchingEngine {
    books: DashMap<String, Arc<Mutex<OrderBook>>>,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        MatchingEngine {
            books: DashMap::new(),
        }
    }

    pub fn add_symbol(&self, symbol: impl Into<String>) {
        let symbol = symbol.into();
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(OrderBook::new(symbol))));
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.iter().map(|e| e.key().clone()).collect()
    }

    fn book(&self, symbol: &str) -> Result<Arc<Mutex<OrderBook>>, MatchingError> {
        self.books
            .get(symbol)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| MatchingError::UnknownSymbol(symbol.to_string()))
    }

    /// Runs a closure against the locked book for `symbol`, for read-only
    /// access (market data, CLI status queries) that doesn't go through
    /// the full submit/cancel path.
    pub fn with_book<R>(&self, symbol: &str, f: impl FnOnce(&OrderBook) -> R) -> Option<R> {
        let arc = self.books.get(symbol).map(|e| Arc::clone(e.value()))?;
        let guard = arc.lock().expect("book mutex poisoned");
        Some(f(&guard))
    }

    /// Submits a new order, driving the crossing loop to completion.
    ///
    /// See spec §4.3 for the full contract. In short: a limit order
    /// matches against the opposite side while prices cross, any
    /// remainder rests in the book; a market order never rests — any
    /// unfilled remainder after the loop is discarded.
    ///
    /// Returns the id assigned to the new order alongside the reports
    /// generated by any immediate fills — a submitter that rests with no
    /// fills gets no report for it (matching the wire contract's "0
    /// reports" scenarios), but still needs the id to cancel later, so
    /// it travels back out of band from the reports themselves.
    pub fn submit(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        price: f64,
        qty: u32,
    ) -> Result<(OrderId, MatchResult), MatchingError> {
        let book_arc = self.book(symbol)?;
        let mut book = book_arc.lock().expect("book mutex poisoned");
        let ts = now_us();

        let id = book.next_order_id();
        let mut incoming = Order {
            id,
            symbol: symbol.to_string(),
            side,
            order_type,
            price,
            original_qty: qty,
            filled_qty: 0,
            status: OrderStatus::New,
            created_at_us: ts,
        };

        let mut reports = Vec::new();
        self.run_crossing_loop(&mut book, &mut incoming, &mut reports, ts);

        match order_type {
            OrderType::Market => {
                // A market order must never rest; any unfilled remainder
                // is simply discarded.
            }
            OrderType::Limit => {
                if incoming.remaining() > 0 {
                    match side {
                        Side::Buy => book.bids.push(incoming),
                        Side::Sell => book.asks.push(incoming),
                    }
                }
            }
        }

        book.refresh_best_cache();
        Ok((id, reports))
    }

    /// Walks the opposing side's best level head-to-tail while the
    /// incoming order still has quantity and the best opposing price is
    /// acceptable, filling each resting order up to the smaller of the
    /// two remaining quantities and emitting a report pair per fill.
    fn run_crossing_loop(
        &self,
        book: &mut OrderBook,
        incoming: &mut Order,
        reports: &mut Vec<ExecutionReport>,
        ts: u64,
    ) {
        loop {
            if incoming.remaining() == 0 {
                break;
            }

            let opposing_best_price = match incoming.side {
                Side::Buy => book.asks.best_price(),
                Side::Sell => book.bids.best_price(),
            };
            let has_opposing = match incoming.side {
                Side::Buy => book.asks.best().is_some(),
                Side::Sell => book.bids.best().is_some(),
            };
            if !has_opposing {
                break;
            }

            let crosses = match (incoming.order_type, incoming.side) {
                (OrderType::Market, _) => true,
                (OrderType::Limit, Side::Buy) => opposing_best_price <= incoming.price,
                (OrderType::Limit, Side::Sell) => opposing_best_price >= incoming.price,
            };
            if !crosses {
                break;
            }

            let opposing = match incoming.side {
                Side::Buy => &mut book.asks,
                Side::Sell => &mut book.bids,
            };

            let resting = opposing.best_front_mut().expect("checked non-empty above");
            let fill = incoming.remaining().min(resting.remaining());

            resting.apply_fill(fill);
            let resting_id = resting.id;
            let resting_status = resting.status;

            incoming.apply_fill(fill);
            opposing.record_fill_at_best(fill);

            let trade_price = opposing_best_price;

            reports.push(ExecutionReport {
                order_id: incoming.id,
                counterparty_id: resting_id,
                price: trade_price,
                quantity: fill,
                status: incoming.status,
                timestamp_us: ts,
            });
            reports.push(ExecutionReport {
                order_id: resting_id,
                counterparty_id: incoming.id,
                price: trade_price,
                quantity: fill,
                status: resting_status,
                timestamp_us: ts,
            });

            book.record_trade(trade_price, fill);

            debug!(
                symbol = %book.symbol,
                aggressor_id = incoming.id.0,
                resting_id = resting_id.0,
                price = trade_price,
                quantity = fill,
                "fill"
            );

            let opposing = match incoming.side {
                Side::Buy => &mut book.asks,
                Side::Sell => &mut book.bids,
            };
            opposing.pop_front_if_done();

            if resting_status != OrderStatus::Filled {
                // Head of queue not fully filled: the incoming side must
                // be exhausted, so the loop will end on the next
                // iteration's remaining() check. Breaking here early is
                // equivalent and avoids one more best-price lookup.
                break;
            }
        }
    }

    /// Resolves the book, takes its gate, and delegates to the book's
    /// cancel. Idempotent after the first successful call.
    pub fn cancel(&self, symbol: &str, order_id: OrderId) -> Result<bool, MatchingError> {
        let book_arc = self.book(symbol)?;
        let mut book = book_arc.lock().expect("book mutex poisoned");
        Ok(book.cancel(order_id))
    }
}
