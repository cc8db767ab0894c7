//! Player balance ledger
//!
//! Concurrent per-world balance store exposed to other plugins through a
//! process-wide registry.
//!
//! # Architecture
//!
//! - **BalanceStore**: `PlayerId -> f64` map for one world, with a dirty flag
//!   the host polls to decide when to save
//! - **LedgerService**: forwards calls to the store of the currently bound world
//! - **LedgerRegistry**: install-once access point other plugins call into
//! - **LedgerLifecycle**: reacts to host startup and world-load events
//!
//! # Invariants
//!
//! - Balances are never negative: debits check funds under the same entry
//!   guard that applies them
//! - Per-player updates are linearizable; no lost updates under contention
//! - Insufficient funds and bad input are `false`, never errors

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod save;
pub mod service;
pub mod store;
pub mod types;
pub mod world;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{LedgerLifecycle, LifecycleHooks};
pub use metrics::Metrics;
pub use registry::LedgerRegistry;
pub use save::FileWorld;
pub use service::{LedgerApi, LedgerService};
pub use store::BalanceStore;
pub use types::{BalanceRecord, BalanceSnapshot, PlayerId, WorldId};
pub use world::{ActiveWorld, MemoryWorld, World};
