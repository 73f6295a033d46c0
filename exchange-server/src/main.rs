//! Multi-symbol matching engine with an attached stochastic liquidity
//! simulator, exposed over a line-delimited JSON TCP protocol.

mod broadcast;
mod config;
mod error;
mod session;
mod wire;

use broadcast::BroadcastHub;
use clap::Parser;
use config::ServerConfig;
use error::ServerError;
use matching_core::MatchingEngine;
use simulation::{AgentPool, MarketMakerAgent, SimulationDriver};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Symbol, opening price, and per-market-maker seed offset for the
/// engine's initial universe.
const INITIAL_SYMBOLS: &[(&str, f64, u64)] = &[
    ("AAPL", 150.0, 1),
    ("MSFT", 380.0, 2),
    ("GOOGL", 140.0, 3),
    ("AMZN", 180.0, 4),
    ("TSLA", 250.0, 5),
];

const MAKER_MU: f64 = 0.05;
const MAKER_SIGMA: f64 = 0.20;
const MAKER_SPREAD_BPS: f64 = 20.0;
const MAKER_LEVEL_SPACING_BPS: f64 = 5.0;
const MAKER_ORDER_SIZE: u32 = 100;
const MAKER_LEVELS: usize = 5;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();

    let engine = Arc::new(MatchingEngine::new());
    let mut pool = AgentPool::new();
    for &(symbol, s0, seed_offset) in INITIAL_SYMBOLS {
        engine.add_symbol(symbol);
        pool.add(MarketMakerAgent::new(
            symbol,
            s0,
            MAKER_MU,
            MAKER_SIGMA,
            trading_dt(config.tick_ms),
            config.seed.wrapping_add(seed_offset),
            MAKER_SPREAD_BPS,
            MAKER_LEVEL_SPACING_BPS,
            MAKER_ORDER_SIZE,
            MAKER_LEVELS,
        ));
    }

    let hub = Arc::new(BroadcastHub::new());

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            let err = ServerError::Bind(err);
            error!(port = config.port, %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(port = config.port, "exchange server listening");

    let mut driver = SimulationDriver::new(
        Arc::clone(&engine),
        pool,
        Duration::from_millis(config.tick_ms),
        hub.clone(),
    );
    let shutdown = driver.shutdown_handle();
    let sim_thread = std::thread::spawn(move || driver.run());

    let accept_engine = Arc::clone(&engine);
    let accept_hub = Arc::clone(&hub);
    let max_sessions = config.max_sessions;
    let accept_loop = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    if accept_hub.session_count() >= max_sessions {
                        warn!(%peer, max_sessions, "too many clients, closing connection");
                        drop(stream);
                        continue;
                    }
                    info!(%peer, "session accepted");
                    let engine = Arc::clone(&accept_engine);
                    let hub = Arc::clone(&accept_hub);
                    tokio::spawn(session::handle_connection(stream, engine, hub));
                }
                Err(err) => {
                    error!(%err, "accept failed");
                }
            }
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    accept_loop.abort();
    shutdown.store(false, std::sync::atomic::Ordering::Relaxed);
    let _ = sim_thread.join();
    info!("exchange server stopped");
}

/// Waits for either Ctrl-C or, on Unix, a `SIGTERM` — the two shutdown
/// signals spec §6 calls out for a clean (exit-0) stop.
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Wall-clock ticks are decoupled from the GBM's own `dt`: a 100ms tick
/// corresponds to roughly this fraction of a 252-day trading year.
fn trading_dt(tick_ms: u64) -> f64 {
    const TRADING_SECONDS_PER_YEAR: f64 = 252.0 * 6.5 * 3600.0;
    (tick_ms as f64 / 1000.0) / TRADING_SECONDS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trading_dt_is_positive_and_small() {
        let dt = trading_dt(100);
        assert!(dt > 0.0);
        assert!(dt < 1e-5);
    }
}
