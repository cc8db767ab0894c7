//! Per-world balance store
//!
//! The authoritative `PlayerId -> balance` map for one world context.
//!
//! # Invariants
//!
//! - Balances are never negative, NaN or infinite
//! - Read-check-write on one player happens under a single entry guard,
//!   so concurrent add/remove on the same player is linearizable
//! - Every successful mutation sets the dirty flag; only the host clears it

use crate::{
    error::{Error, Result},
    types::{BalanceRecord, BalanceSnapshot, PlayerId},
};
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

/// Key the snapshot is stored under inside the host's per-world container
pub const BALANCES_KEY: &str = "balances";

/// Concurrent balance map with a dirty flag
#[derive(Debug, Default)]
pub struct BalanceStore {
    balances: DashMap<PlayerId, f64>,
    dirty: AtomicBool,
}

fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

impl BalanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for `player`, or 0.0 when absent or nil
    pub fn balance(&self, player: &PlayerId) -> f64 {
        if player.is_nil() {
            return 0.0;
        }
        self.balances.get(player).map(|b| *b).unwrap_or(0.0)
    }

    /// Overwrite a balance. Negative and non-finite amounts store 0.0.
    /// No-op for the nil player.
    pub fn set_balance(&self, player: PlayerId, amount: f64) {
        if player.is_nil() {
            return;
        }
        let amount = if is_valid_amount(amount) { amount } else { 0.0 };
        self.balances.insert(player, amount);
        self.mark_dirty();

        tracing::debug!(player = %player, balance = amount, "Balance set");
    }

    /// Credit `amount`. Fails without mutation on a nil player or an amount
    /// that is negative or not finite.
    pub fn add_balance(&self, player: PlayerId, amount: f64) -> bool {
        if player.is_nil() || !is_valid_amount(amount) {
            return false;
        }

        let balance = match self.balances.entry(player) {
            Entry::Occupied(mut entry) => {
                let next = *entry.get() + amount;
                if !next.is_finite() {
                    return false;
                }
                *entry.get_mut() = next;
                next
            }
            Entry::Vacant(entry) => {
                entry.insert(amount);
                amount
            }
        };
        self.mark_dirty();

        tracing::debug!(player = %player, amount, balance, "Balance credited");
        true
    }

    /// Debit `amount`. Fails without mutation on a nil player, an invalid
    /// amount, or insufficient funds.
    pub fn remove_balance(&self, player: PlayerId, amount: f64) -> bool {
        if player.is_nil() || !is_valid_amount(amount) {
            return false;
        }

        let balance = match self.balances.entry(player) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current < amount {
                    return false;
                }
                let next = (current - amount).max(0.0);
                *entry.get_mut() = next;
                next
            }
            Entry::Vacant(entry) => {
                // Absent players hold 0.0, so only a zero debit succeeds
                if amount > 0.0 {
                    return false;
                }
                entry.insert(0.0);
                0.0
            }
        };
        self.mark_dirty();

        tracing::debug!(player = %player, amount, balance, "Balance debited");
        true
    }

    /// Whether a record exists for `player`
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.balances.contains_key(player)
    }

    /// Number of players with a record
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// True when no player has a record
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all balances
    pub fn total(&self) -> f64 {
        self.balances.iter().map(|entry| *entry.value()).sum()
    }

    // Dirty tracking

    /// Unsaved mutations pending
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flag the store for the next host flush
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Read and clear the dirty flag in one step
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    // Persistence

    /// Ordered (by identity) copy of every record
    pub fn snapshot(&self) -> BalanceSnapshot {
        let mut records: BalanceSnapshot = self
            .balances
            .iter()
            .map(|entry| BalanceRecord::new(*entry.key(), *entry.value()))
            .collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        records
    }

    /// Replace the whole map with `snapshot`.
    ///
    /// Every identity is parsed before the map is touched, so a malformed
    /// snapshot fails the load and leaves current balances in place.
    pub fn restore(&self, snapshot: BalanceSnapshot) -> Result<()> {
        let mut parsed = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            let player: PlayerId = record
                .identity
                .parse()
                .map_err(|source| Error::InvalidIdentity {
                    identity: record.identity.clone(),
                    source,
                })?;
            if player.is_nil() {
                tracing::warn!(
                    balance = record.balance,
                    "Dropping persisted record for nil player"
                );
                continue;
            }

            let balance = if is_valid_amount(record.balance) {
                record.balance
            } else {
                tracing::warn!(
                    player = %player,
                    balance = record.balance,
                    "Clamping invalid persisted balance to 0"
                );
                0.0
            };
            parsed.push((player, balance));
        }

        self.balances.clear();
        for (player, balance) in parsed {
            self.balances.insert(player, balance);
        }
        self.dirty.store(false, Ordering::Release);

        tracing::info!(players = self.balances.len(), "Balances restored");
        Ok(())
    }

    /// Store the snapshot under `balances` in the host container
    pub fn write_to(&self, container: &mut Map<String, Value>) -> Result<()> {
        let value = serde_json::to_value(self.snapshot())?;
        container.insert(BALANCES_KEY.to_string(), value);
        Ok(())
    }

    /// Load from the `balances` key of the host container. A missing key is
    /// an empty ledger.
    pub fn read_from(&self, container: &Map<String, Value>) -> Result<()> {
        let snapshot = match container.get(BALANCES_KEY) {
            Some(value) => serde_json::from_value::<BalanceSnapshot>(value.clone())
                .map_err(|e| Error::MalformedSnapshot(e.to_string()))?,
            None => BalanceSnapshot::new(),
        };
        self.restore(snapshot)
    }
}
