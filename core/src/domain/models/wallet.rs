use serde::{Deserialize, Serialize};

/// Server-side denormalized wallet row.
///
/// Absent in some deployments and briefly inconsistent after writes, so it is
/// trusted opportunistically, never exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAggregate {
    pub child_id: String,
    #[serde(default)]
    pub earned_points: i64,
    #[serde(default)]
    pub reserved_points: i64,
    #[serde(default)]
    pub available_points: i64,
}

impl WalletAggregate {
    /// An all-zero row is indistinguishable from a missing one and must not
    /// be trusted over the derived computation.
    pub fn is_trustworthy(&self) -> bool {
        self.earned_points > 0 || self.available_points > 0
    }
}
