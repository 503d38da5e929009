use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Advisory confidence that a trade came from a fresh wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshWalletSignal {
    /// Clamped to `[0, 1]`.
    pub confidence: f64,
    /// Contribution of each scoring factor, keyed by factor name.
    pub factors: BTreeMap<String, f64>,
    pub triggered: bool,
}
