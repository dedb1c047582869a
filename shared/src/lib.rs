use serde::{Deserialize, Serialize};

/// A child as shown in pickers and headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSummary {
    /// Canonical child id
    pub id: String,
    /// Legacy uid, kept alongside the canonical id for older rows
    pub child_uid: String,
    /// Family this child belongs to
    pub family_id: String,
    /// Short name used for child-facing login
    pub nickname: Option<String>,
    /// Full display name
    pub display_name: Option<String>,
}

/// Where a wallet snapshot's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletSource {
    /// Server-side denormalized aggregate, trusted as-is
    Precomputed,
    /// Recomputed locally from primitive tables
    Derived,
}

/// The single balance figure the UI renders for a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Lifetime points earned from completed activities
    pub earned_points: i64,
    /// Points committed to accepted offers and in-flight redemptions
    pub reserved_points: i64,
    /// Spendable points; never negative
    pub available_points: i64,
    pub source: WalletSource,
}

/// One point-change row as shown in the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: Option<i64>,
    pub child_uid: String,
    /// Signed point delta (positive for earnings)
    pub points: i64,
    pub reason: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Child-facing status of a catalog reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    /// Nothing in flight; the child may request it
    Available,
    /// A redemption is waiting on a parent
    Pending,
    /// Redeemed and approved or fulfilled
    Completed,
}

/// A catalog reward classified for one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReward {
    pub reward_id: String,
    pub title: String,
    pub cost_points: i64,
    pub status: RewardStatus,
}

/// How a child-entered credential should be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    Pin,
    Password,
}

/// Everything the child dashboard renders after a resolution or soft refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub child: ChildSummary,
    pub wallet: WalletSnapshot,
    /// Positive ledger points whose reason reads as a cheer/bonus; shown
    /// alongside the wallet, never folded into it
    pub encouragement_points: i64,
    pub ledger: Vec<LedgerRow>,
    pub rewards: Vec<ClassifiedReward>,
}
