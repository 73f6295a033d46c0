//! Session table and fan-out for market data.
//!
//! The simulation driver runs on a plain OS thread and calls `publish`
//! synchronously once per tick; sessions live on the tokio runtime and
//! write asynchronously. An unbounded `mpsc` per session bridges the two
//! without making the driver wait on network I/O.

use crate::wire::OutboundMessage;
use dashmap::DashMap;
use simulation::{BookSnapshot, MarketDataSink};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub struct BroadcastHub {
    sessions: DashMap<u64, mpsc::UnboundedSender<String>>,
    next_id: AtomicU64,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        BroadcastHub {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Adds a session to the table and hands back its id plus the
    /// receiving end of its outbound queue.
    pub fn register(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(id, tx);
        (id, rx)
    }

    pub fn deregister(&self, id: u64) {
        self.sessions.remove(&id);
    }

    /// Number of currently-registered sessions, for the accept loop's
    /// too-many-clients check.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Queues a line for one session. Silently dropped if the session has
    /// already disconnected — its entry will be removed when its read
    /// loop notices the same thing.
    pub fn send_to(&self, id: u64, line: String) {
        if let Some(tx) = self.sessions.get(&id) {
            let _ = tx.send(line);
        }
    }
}

impl MarketDataSink for BroadcastHub {
    /// Best-effort fan-out: a full or closed session channel is skipped
    /// rather than allowed to stall the tick for every other session.
    fn publish(&self, snapshot: BookSnapshot) {
        let line = OutboundMessage::MarketData {
            ticker: snapshot.symbol,
            bid: snapshot.best_bid,
            ask: snapshot.best_ask,
            last: snapshot.last,
            bid_size: 0,
            ask_size: 0,
            last_size: snapshot.last_size,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            volume: 0,
            timestamp: snapshot.timestamp_us,
        }
        .to_line();

        for entry in self.sessions.iter() {
            let _ = entry.value().send(line.clone());
        }
    }
}
