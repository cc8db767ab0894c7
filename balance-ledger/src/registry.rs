//! Process-wide ledger access point
//!
//! Other plugins reach the ledger through [`LedgerRegistry::global`]. The
//! registry is installed exactly once during host startup; calling a balance
//! operation before that is a startup-ordering bug and returns
//! [`Error::NotInitialized`] instead of a silent default.
//!
//! ```
//! use balance_ledger::{LedgerRegistry, LedgerService, MemoryWorld, PlayerId};
//! use std::sync::Arc;
//!
//! let registry = LedgerRegistry::new();
//! assert!(!registry.is_initialized());
//!
//! let world = Arc::new(MemoryWorld::new("world"));
//! registry.set_instance(Arc::new(LedgerService::new(world))).unwrap();
//!
//! let player = PlayerId::random();
//! assert!(registry.add_balance(player, 10.0).unwrap());
//! assert_eq!(registry.balance(&player).unwrap(), 10.0);
//! ```

use crate::{
    error::{Error, Result},
    service::LedgerApi,
    types::PlayerId,
};
use std::fmt;
use std::sync::{Arc, OnceLock};

static GLOBAL: LedgerRegistry = LedgerRegistry::new();

/// Holds at most one installed ledger
pub struct LedgerRegistry {
    instance: OnceLock<Arc<dyn LedgerApi>>,
}

impl LedgerRegistry {
    /// Empty registry, for explicit injection
    pub const fn new() -> Self {
        Self {
            instance: OnceLock::new(),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static LedgerRegistry {
        &GLOBAL
    }

    /// Install the ledger. Only the first call succeeds.
    pub fn set_instance(&self, api: Arc<dyn LedgerApi>) -> Result<()> {
        self.instance
            .set(api)
            .map_err(|_| Error::AlreadyInitialized)?;
        tracing::info!("Economy API initialized and ready for use");
        Ok(())
    }

    /// Whether a ledger has been installed. Never fails.
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// The installed ledger
    pub fn instance(&self) -> Result<&Arc<dyn LedgerApi>> {
        self.instance.get().ok_or(Error::NotInitialized)
    }

    /// Balance of `player`, or 0.0 when the player has no record
    pub fn balance(&self, player: &PlayerId) -> Result<f64> {
        Ok(self.instance()?.balance(player))
    }

    /// Credit a non-negative `amount`
    pub fn add_balance(&self, player: PlayerId, amount: f64) -> Result<bool> {
        Ok(self.instance()?.add_balance(player, amount))
    }

    /// Debit a non-negative `amount`; `Ok(false)` on insufficient funds
    pub fn remove_balance(&self, player: PlayerId, amount: f64) -> Result<bool> {
        Ok(self.instance()?.remove_balance(player, amount))
    }
}

impl Default for LedgerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LedgerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerRegistry")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
