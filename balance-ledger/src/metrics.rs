//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `economy_operations_total{op, outcome}` - Ledger calls by outcome
//! - `economy_saves_total` - Host flushes that wrote a save
//! - `economy_tracked_players` - Players with a balance record in the bound world
//!
//! Each `Metrics` owns its own `Registry` so several ledgers (and tests) can
//! coexist in one process.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Operation label values
pub mod op {
    /// Balance query
    pub const GET: &str = "get";
    /// Credit
    pub const ADD: &str = "add";
    /// Debit
    pub const REMOVE: &str = "remove";
}

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Ledger calls, labelled by operation and outcome
    pub operations_total: IntCounterVec,

    /// Saves written by the host
    pub saves_total: IntCounter,

    /// Players with a record in the bound world
    pub tracked_players: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("saves_total", &self.saves_total.get())
            .field("tracked_players", &self.tracked_players.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("economy_operations_total", "Ledger operations by outcome"),
            &["op", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let saves_total = IntCounter::new("economy_saves_total", "Balance saves written")?;
        registry.register(Box::new(saves_total.clone()))?;

        let tracked_players = IntGauge::new(
            "economy_tracked_players",
            "Players with a balance record in the bound world",
        )?;
        registry.register(Box::new(tracked_players.clone()))?;

        Ok(Self {
            operations_total,
            saves_total,
            tracked_players,
            registry,
        })
    }

    /// Record one ledger call
    pub fn record_operation(&self, op: &str, success: bool) {
        let outcome = if success { "ok" } else { "rejected" };
        self.operations_total.with_label_values(&[op, outcome]).inc();
    }

    /// Record a written save
    pub fn record_save(&self) {
        self.saves_total.inc();
    }

    /// Update the tracked player count
    pub fn set_tracked_players(&self, count: usize) {
        self.tracked_players.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
