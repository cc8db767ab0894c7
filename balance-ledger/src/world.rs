//! World contexts
//!
//! A world context is the host's save-data scope. Balances are partitioned
//! per world: each world owns exactly one `BalanceStore`, created on first
//! lookup. The host supplies the active world through [`ActiveWorld`].

use crate::{store::BalanceStore, types::WorldId};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A world context the ledger can be bound to
pub trait World: Send + Sync + fmt::Debug {
    /// World identifier
    fn id(&self) -> &WorldId;

    /// Client-side view of a world; never holds authoritative balances
    fn is_remote(&self) -> bool {
        false
    }

    /// Primary dimension of the save. Only the primary world rebinds the ledger.
    fn is_primary(&self) -> bool {
        true
    }

    /// Lookup-or-create this world's balance store
    fn balances(&self) -> Arc<BalanceStore>;
}

/// Host capability: which world is active right now
pub trait ActiveWorld {
    /// Currently active world, if the host has one loaded
    fn active_world(&self) -> Option<Arc<dyn World>>;
}

/// In-memory world with a lazily created store
#[derive(Debug)]
pub struct MemoryWorld {
    id: WorldId,
    remote: bool,
    primary: bool,
    store: OnceLock<Arc<BalanceStore>>,
}

impl MemoryWorld {
    /// Server-side primary world
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: WorldId::new(id),
            remote: false,
            primary: true,
            store: OnceLock::new(),
        }
    }

    /// Mark as a client-side world
    pub fn remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// Mark as a secondary dimension
    pub fn secondary(mut self) -> Self {
        self.primary = false;
        self
    }
}

impl World for MemoryWorld {
    fn id(&self) -> &WorldId {
        &self.id
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn balances(&self) -> Arc<BalanceStore> {
        self.store
            .get_or_init(|| {
                tracing::debug!(world = %self.id, "Creating balance store");
                Arc::new(BalanceStore::new())
            })
            .clone()
    }
}
