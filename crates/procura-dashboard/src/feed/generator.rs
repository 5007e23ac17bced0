//! Synthetic market price feed.
//!
//! The price takes a bounded random walk: every tick adds a draw from
//! `[-max_step, max_step]` and clamps the result to `[floor, ceiling]`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use procura_core::{DemandPoint, FeedMessage, Supplier};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::reference;
use crate::broadcast::BroadcastChannel;

/// Feed generator configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Time between price updates.
    pub interval: Duration,
    /// Price before the first tick.
    pub start: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Largest change a single tick may apply.
    pub max_step: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            start: 4.5,
            floor: 3.5,
            ceiling: 6.0,
            max_step: 0.2,
        }
    }
}

impl FeedConfig {
    /// Set the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Compute the next price from the previous one and a random draw.
///
/// The draw is limited to `±max_step` before it is applied, then the sum is
/// clamped to `[floor, ceiling]`.
pub fn next_price(prev: f64, draw: f64, config: &FeedConfig) -> f64 {
    let step = draw.clamp(-config.max_step, config.max_step);
    (prev + step).clamp(config.floor, config.ceiling)
}

/// Holds the simulated price and the static reference datasets.
pub struct FeedGenerator {
    price_bits: AtomicU64,
    config: FeedConfig,
    suppliers: Vec<Supplier>,
    demand: Vec<DemandPoint>,
}

impl FeedGenerator {
    pub fn new(config: FeedConfig) -> Self {
        let start = config.start.clamp(config.floor, config.ceiling);
        Self {
            price_bits: AtomicU64::new(start.to_bits()),
            config,
            suppliers: reference::suppliers(),
            demand: reference::demand_forecast(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FeedConfig::default())
    }

    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Current price.
    pub fn price(&self) -> f64 {
        f64::from_bits(self.price_bits.load(Ordering::Acquire))
    }

    /// Advance the price using a specific draw. Returns the new price.
    pub fn apply_draw(&self, draw: f64) -> f64 {
        let prev = self
            .price_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(next_price(f64::from_bits(bits), draw, &self.config).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        next_price(f64::from_bits(prev), draw, &self.config)
    }

    /// Advance the price with a uniform random draw. Returns the new price.
    pub fn tick(&self) -> f64 {
        let step = self.config.max_step.abs();
        let draw = rand::random_range(-step..=step);
        self.apply_draw(draw)
    }

    /// Messages every new client receives, in order: current price, supplier
    /// list, demand forecast.
    pub fn snapshot(&self) -> [FeedMessage; 3] {
        [
            FeedMessage::market_price(self.price()),
            FeedMessage::Suppliers {
                data: self.suppliers.clone(),
            },
            FeedMessage::DemandForecast {
                data: self.demand.clone(),
            },
        ]
    }

    /// Spawn the periodic ticker. It broadcasts a `marketPrice` message every
    /// interval until `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn(
        self: Arc<Self>,
        channel: Arc<BroadcastChannel>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; clients already get the
            // current price on connect.
            interval.tick().await;

            info!(interval_ms = self.config.interval.as_millis(), "Market feed started");
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let price = self.tick();
                        let receivers = channel.broadcast(&FeedMessage::market_price(price)).await;
                        debug!(price, receivers, "Market price tick");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Market feed stopped");
        })
    }
}
