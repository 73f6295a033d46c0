//! Stochastic liquidity simulator: a GBM price process feeding
//! market-maker agents that quote a layered ladder against the matching
//! engine, driven by a periodic simulation loop.

pub mod agent;
pub mod driver;
pub mod gbm;
pub mod rng;

pub use agent::{AgentPool, MarketMakerAgent};
pub use driver::{BookSnapshot, MarketDataSink, SimulationDriver};
pub use gbm::GbmProcess;
pub use rng::Rng;
