use clap::Parser;

/// Command-line configuration for the exchange server.
#[derive(Parser, Debug, Clone)]
#[command(name = "exchange-server")]
#[command(about = "Multi-symbol matching engine with a simulated liquidity feed")]
pub struct ServerConfig {
    /// TCP port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Simulation driver tick interval, in milliseconds.
    #[arg(long = "tick-ms", default_value_t = 100)]
    pub tick_ms: u64,

    /// Seed for the market maker agents' shared GBM trajectories.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum number of concurrently-connected sessions. A connection
    /// accepted past this bound is closed immediately; existing sessions
    /// are unaffected.
    #[arg(long = "max-sessions", default_value_t = 1024)]
    pub max_sessions: usize,
}
