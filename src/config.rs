//! Holder configuration: which initialization strategy to run and how long
//! the creation guard spins before parking.

use serde::{Deserialize, Serialize};

use crate::sync::RawGuard;

/// How a holder serializes first-time construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Acquire-load fast path; the guard is taken only while the slot is empty.
    #[default]
    DoubleChecked,
    /// The guard is held across the whole check-create-return sequence on
    /// every call.
    ///
    /// Correct without relying on acquire/release pairing of the slot; pays
    /// a lock round-trip per access.
    FullyLocked,
}

impl core::fmt::Display for Strategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Strategy::DoubleChecked => "double_checked",
            Strategy::FullyLocked => "fully_locked",
        })
    }
}

/// Construction-time settings of a [`LazySingletonHolder`](crate::LazySingletonHolder).
///
/// All setters are `const`, so a configuration can be spelled out inline in a
/// `static` declaration:
///
/// ```rust
/// use solo::{HolderConfig, LazySingletonHolder, Strategy};
///
/// static NAMES: LazySingletonHolder<Vec<&'static str>> = LazySingletonHolder::with_config(
///     HolderConfig::new().strategy(Strategy::FullyLocked).spin_rounds(4),
///     || Ok(vec!["alpha", "beta"]),
/// );
///
/// assert_eq!(NAMES.instance().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HolderConfig {
    /// Initialization strategy.
    pub strategy: Strategy,
    /// Backoff rounds the creation guard spins before parking the thread.
    pub spin_rounds: u32,
}

impl HolderConfig {
    /// Double-checked strategy with the guard's default spin budget.
    pub const fn new() -> Self {
        Self {
            strategy: Strategy::DoubleChecked,
            spin_rounds: RawGuard::DEFAULT_SPIN_ROUNDS,
        }
    }

    /// Replaces the strategy.
    #[must_use]
    pub const fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the spin budget. `0` parks immediately on contention.
    #[must_use]
    pub const fn spin_rounds(mut self, spin_rounds: u32) -> Self {
        self.spin_rounds = spin_rounds;
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```rust
    /// use solo::{HolderConfig, Strategy};
    ///
    /// let config = HolderConfig::from_json(r#"{ "strategy": "fully_locked" }"#).unwrap();
    /// assert_eq!(config.strategy, Strategy::FullyLocked);
    /// assert_eq!(config.spin_rounds, HolderConfig::new().spin_rounds);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for HolderConfig {
    fn default() -> Self {
        Self::new()
    }
}
