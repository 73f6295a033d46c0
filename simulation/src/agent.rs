//! Synthetic market maker: quotes a symmetric N-level ladder around a
//! GBM-driven fair price and reconciles its outstanding quotes each tick.

use crate::gbm::GbmProcess;
use matching_core::{MatchingEngine, OrderStatus, OrderType, OrderId, Side};
use tracing::debug;

pub struct MarketMakerAgent {
    symbol: String,
    gbm: GbmProcess,
    spread_bps: f64,
    level_spacing_bps: f64,
    order_size: u32,
    levels: usize,
    bid_ids: Vec<Option<OrderId>>,
    ask_ids: Vec<Option<OrderId>>,
}

impl MarketMakerAgent {
    pub fn new(
        symbol: impl Into<String>,
        s0: f64,
        mu: f64,
        sigma: f64,
        dt: f64,
        seed: u64,
        spread_bps: f64,
        level_spacing_bps: f64,
        order_size: u32,
        levels: usize,
    ) -> Self {
        MarketMakerAgent {
            symbol: symbol.into(),
            gbm: GbmProcess::new(s0, mu, sigma, dt, seed),
            spread_bps,
            level_spacing_bps,
            order_size,
            levels,
            bid_ids: vec![None; levels],
            ask_ids: vec![None; levels],
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Advances the GBM once, cancels every quote the agent currently
    /// has resting, then lays down a fresh symmetric ladder around the
    /// new fair price.
    pub fn tick(&mut self, engine: &MatchingEngine) {
        let fair_price = self.gbm.next();

        for id in self.bid_ids.iter_mut().chain(self.ask_ids.iter_mut()) {
            if let Some(order_id) = id.take() {
                let _ = engine.cancel(&self.symbol, order_id);
            }
        }

        let half_spread = fair_price * (self.spread_bps / 10_000.0) / 2.0;
        let step = fair_price * (self.level_spacing_bps / 10_000.0);

        for k in 0..self.levels {
            let offset = k as f64 * step;

            let bid_price = fair_price - half_spread - offset;
            if bid_price > 0.0 {
                self.bid_ids[k] = self.quote(engine, Side::Buy, bid_price);
            }

            let ask_price = fair_price + half_spread + offset;
            self.ask_ids[k] = self.quote(engine, Side::Sell, ask_price);
        }

        debug!(symbol = %self.symbol, fair_price, "market maker tick");
    }

    fn quote(&self, engine: &MatchingEngine, side: Side, price: f64) -> Option<OrderId> {
        let (id, reports) = engine
            .submit(&self.symbol, side, OrderType::Limit, price, self.order_size)
            .ok()?;

        let fully_consumed = reports
            .iter()
            .any(|r| r.order_id == id && r.status == OrderStatus::Filled);
        if fully_consumed {
            None
        } else {
            Some(id)
        }
    }
}

/// Owns a growable list of agents and ticks them sequentially — no
/// internal parallelism, matching the spec's per-tick ordering.
#[derive(Default)]
pub struct AgentPool {
    agents: Vec<MarketMakerAgent>,
}

impl AgentPool {
    pub fn new() -> Self {
        AgentPool { agents: Vec::new() }
    }

    pub fn add(&mut self, agent: MarketMakerAgent) {
        self.agents.push(agent);
    }

    pub fn tick_all(&mut self, engine: &MatchingEngine) {
        for agent in &mut self.agents {
            agent.tick(engine);
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
