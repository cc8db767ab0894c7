//! Core types for the ledger
//!
//! - `PlayerId` keys every balance; the nil UUID stands for "no player"
//! - `WorldId` names a world context (one balance store per world)
//! - `BalanceRecord` / `BalanceSnapshot` are the persisted form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Player identity (128-bit UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Wrap a UUID
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The absent identity. Operations treat it like a missing player.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Random identity (v4)
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// True for the absent identity
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PlayerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical hyphenated form
        write!(f, "{}", self.0.hyphenated())
    }
}

/// World context identifier (e.g. `world`, `world_nether`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(String);

impl WorldId {
    /// Create new world ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted (identity, balance) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Canonical hyphenated UUID string
    #[serde(alias = "uuid")]
    pub identity: String,

    /// Non-negative amount. A `null` (how JSON spells a non-finite float)
    /// reads back as NaN and is clamped on restore.
    #[serde(deserialize_with = "balance_or_nan")]
    pub balance: f64,
}

fn balance_or_nan<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl BalanceRecord {
    /// Build a record for a player
    pub fn new(player: PlayerId, balance: f64) -> Self {
        Self {
            identity: player.to_string(),
            balance,
        }
    }
}

/// Ordered sequence of records, as stored under the `balances` key
pub type BalanceSnapshot = Vec<BalanceRecord>;
