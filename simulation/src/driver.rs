//! Cooperative simulation loop: ticks the agent pool, then snapshots
//! every book and hands the result to whatever wants to broadcast it.

use crate::agent::AgentPool;
use matching_core::MatchingEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

/// Point-in-time market data for one symbol, captured under that
/// symbol's book gate.
#[derive(Clone, Debug, PartialEq)]
pub struct BookSnapshot {
    pub symbol: String,
    pub best_bid: f64,
    pub best_ask: f64,
    pub last: f64,
    pub last_size: u32,
    pub timestamp_us: u64,
}

/// Receives market-data snapshots as the simulation produces them. The
/// driver doesn't know or care how updates reach clients — implemented
/// by the broadcast hub in the server crate.
pub trait MarketDataSink {
    fn publish(&self, snapshot: BookSnapshot);
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_micros() as u64
}

/// Drives the agent pool on a fixed wall-clock cadence, independent of
/// the GBM's own `dt` (a 100ms tick corresponds to roughly 1.7e-8 years
/// of trading time, but the two are otherwise unrelated: sleep drift
/// never perturbs the random walk itself).
pub struct SimulationDriver {
    engine: Arc<MatchingEngine>,
    pool: AgentPool,
    tick_interval: Duration,
    sink: Arc<dyn MarketDataSink + Send + Sync>,
    running: Arc<AtomicBool>,
}

impl SimulationDriver {
    pub fn new(
        engine: Arc<MatchingEngine>,
        pool: AgentPool,
        tick_interval: Duration,
        sink: Arc<dyn MarketDataSink + Send + Sync>,
    ) -> Self {
        SimulationDriver {
            engine,
            pool,
            tick_interval,
            sink,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A clone-able handle that, when flipped to `false`, makes the next
    /// loop iteration boundary the last one.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Advances every agent once, then snapshots and publishes the state
    /// of every book. Exposed separately from `run` so tests and the
    /// server's startup path can drive single ticks deterministically.
    pub fn tick_once(&mut self) {
        self.pool.tick_all(&self.engine);

        for symbol in self.engine.symbols() {
            let snapshot = self.engine.with_book(&symbol, |book| {
                let (last, last_size) = book.last_trade();
                BookSnapshot {
                    symbol: symbol.clone(),
                    best_bid: book.best_bid(),
                    best_ask: book.best_ask(),
                    last,
                    last_size,
                    timestamp_us: now_us(),
                }
            });
            if let Some(snapshot) = snapshot {
                self.sink.publish(snapshot);
            }
        }
    }

    /// Runs until `shutdown_handle()` is flipped to `false`, observed
    /// between iterations (no preemption mid-tick).
    pub fn run(&mut self) {
        info!(interval_ms = self.tick_interval.as_millis(), "simulation driver starting");
        while self.running.load(Ordering::Relaxed) {
            self.tick_once();
            std::thread::sleep(self.tick_interval);
        }
        info!("simulation driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MarketMakerAgent;
    use std::sync::Mutex;

    struct CollectingSink {
        snapshots: Mutex<Vec<BookSnapshot>>,
    }

    impl MarketDataSink for CollectingSink {
        fn publish(&self, snapshot: BookSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }

    #[test]
    fn tick_once_publishes_one_snapshot_per_symbol() {
        let engine = Arc::new(MatchingEngine::new());
        engine.add_symbol("AAPL");
        engine.add_symbol("MSFT");

        let mut pool = AgentPool::new();
        pool.add(MarketMakerAgent::new(
            "AAPL", 150.0, 0.05, 0.20, 1.7e-8, 1, 20.0, 5.0, 100, 2,
        ));
        pool.add(MarketMakerAgent::new(
            "MSFT", 380.0, 0.05, 0.20, 1.7e-8, 2, 20.0, 5.0, 100, 2,
        ));

        let sink = Arc::new(CollectingSink {
            snapshots: Mutex::new(Vec::new()),
        });
        let mut driver = SimulationDriver::new(
            Arc::clone(&engine),
            pool,
            Duration::from_millis(100),
            sink.clone(),
        );

        driver.tick_once();

        let snapshots = sink.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        let symbols: Vec<&str> = snapshots.iter().map(|s| s.symbol.as_str()).collect();
        assert!(symbols.contains(&"AAPL"));
        assert!(symbols.contains(&"MSFT"));
        for s in snapshots.iter() {
            assert!(s.best_bid > 0.0);
            assert!(s.best_ask > s.best_bid);
        }
    }

    #[test]
    fn shutdown_handle_stops_the_run_loop() {
        let engine = Arc::new(MatchingEngine::new());
        engine.add_symbol("AAPL");
        let mut pool = AgentPool::new();
        pool.add(MarketMakerAgent::new(
            "AAPL", 150.0, 0.05, 0.20, 1.7e-8, 1, 20.0, 5.0, 100, 1,
        ));
        let sink = Arc::new(CollectingSink {
            snapshots: Mutex::new(Vec::new()),
        });
        let mut driver =
            SimulationDriver::new(engine, pool, Duration::from_millis(1), sink);
        let handle = driver.shutdown_handle();
        handle.store(false, Ordering::Relaxed);

        driver.run(); // must return immediately, not hang
    }
}
