//! Ledger service bound to the active world
//!
//! `LedgerService` forwards every call to the balance store of whichever
//! world it is currently bound to. Calls made before the host binds a world
//! get the empty/failure default instead of an error, which tolerates other
//! plugins polling during startup.

use crate::{
    metrics::{op, Metrics},
    types::{PlayerId, WorldId},
    world::World,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Balance operations offered to other plugins
pub trait LedgerApi: Send + Sync {
    /// Balance of `player`, or 0.0 when the player has no record
    fn balance(&self, player: &PlayerId) -> f64;

    /// Credit a non-negative `amount`; false on invalid input
    fn add_balance(&self, player: PlayerId, amount: f64) -> bool;

    /// Debit a non-negative `amount`; false on invalid input or insufficient funds
    fn remove_balance(&self, player: PlayerId, amount: f64) -> bool;
}

/// Ledger bound to one world context at a time
#[derive(Debug)]
pub struct LedgerService {
    world: RwLock<Option<Arc<dyn World>>>,
    metrics: Option<Arc<Metrics>>,
}

impl LedgerService {
    /// Service bound to `world`
    pub fn new(world: Arc<dyn World>) -> Self {
        Self {
            world: RwLock::new(Some(world)),
            metrics: None,
        }
    }

    /// Service with no world yet
    pub fn unbound() -> Self {
        Self {
            world: RwLock::new(None),
            metrics: None,
        }
    }

    /// Record operation outcomes
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rebind to a new world context
    pub fn set_world(&self, world: Arc<dyn World>) {
        let mut bound = self.world.write();
        let previous = bound.as_ref().map(|w| w.id().clone());
        tracing::info!(
            from = ?previous.as_ref().map(WorldId::as_str),
            to = %world.id(),
            "Ledger bound to world"
        );
        if let Some(metrics) = &self.metrics {
            metrics.set_tracked_players(world.balances().len());
        }
        *bound = Some(world);
    }

    /// Drop the bound world; calls answer with defaults until the next bind
    pub fn unbind(&self) {
        if let Some(previous) = self.world.write().take() {
            tracing::info!(from = %previous.id(), "Ledger unbound from world");
        }
    }

    /// Currently bound world
    pub fn world_id(&self) -> Option<WorldId> {
        self.world.read().as_ref().map(|w| w.id().clone())
    }

    fn bound_world(&self) -> Option<Arc<dyn World>> {
        self.world.read().clone()
    }

    fn record(&self, op: &str, success: bool, tracked: Option<usize>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_operation(op, success);
            if let Some(count) = tracked {
                metrics.set_tracked_players(count);
            }
        }
    }
}

impl LedgerApi for LedgerService {
    fn balance(&self, player: &PlayerId) -> f64 {
        let balance = match self.bound_world() {
            Some(world) if !player.is_nil() => world.balances().balance(player),
            _ => 0.0,
        };
        self.record(op::GET, true, None);
        balance
    }

    fn add_balance(&self, player: PlayerId, amount: f64) -> bool {
        let world = match self.bound_world() {
            Some(world) if !player.is_nil() && amount >= 0.0 => world,
            _ => {
                self.record(op::ADD, false, None);
                return false;
            }
        };

        let store = world.balances();
        let success = store.add_balance(player, amount);
        self.record(op::ADD, success, Some(store.len()));
        success
    }

    fn remove_balance(&self, player: PlayerId, amount: f64) -> bool {
        let world = match self.bound_world() {
            Some(world) if !player.is_nil() && amount >= 0.0 => world,
            _ => {
                self.record(op::REMOVE, false, None);
                return false;
            }
        };

        let store = world.balances();
        let success = store.remove_balance(player, amount);
        self.record(op::REMOVE, success, Some(store.len()));
        success
    }
}
