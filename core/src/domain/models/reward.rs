use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog reward a family has set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub family_id: Uuid,
    pub title: String,
    pub cost_points: i64,
}

/// Lifecycle of a targeted offer. Transitions happen remotely; the core only
/// reads the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Offered,
    Accepted,
    Rejected,
    Fulfilled,
    Expired,
}

/// An offer targeted at one child. Offers may point at a catalog reward or
/// carry their own title and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub child_uid: String,
    #[serde(default)]
    pub reward_id: Option<String>,
    pub title: String,
    /// Cost override; when absent the catalog reward's cost applies
    #[serde(default)]
    pub cost_points: Option<i64>,
    pub status: OfferStatus,
}

impl Offer {
    /// The cost this offer commits if accepted: its own override when set,
    /// otherwise the referenced catalog reward's cost.
    pub fn effective_cost(&self, catalog: &[Reward]) -> i64 {
        if let Some(cost) = self.cost_points {
            return cost;
        }
        catalog
            .iter()
            .find(|r| {
                self.reward_id.as_deref() == Some(r.id.as_str()) || r.title == self.title
            })
            .map(|r| r.cost_points)
            .unwrap_or(0)
    }
}

/// Lifecycle of a redemption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl RedemptionStatus {
    /// Pending and approved redemptions still hold points back.
    pub fn reserves_points(&self) -> bool {
        matches!(self, RedemptionStatus::Pending | RedemptionStatus::Approved)
    }
}

/// A child's request to spend points on a reward. Rows created from offers
/// may lack a catalog reference and carry only a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: String,
    pub child_uid: String,
    #[serde(default)]
    pub reward_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cost_points: Option<i64>,
    pub status: RedemptionStatus,
}

impl Redemption {
    /// True when this redemption references the given catalog reward, by id
    /// or, for offer-created rows, by title.
    pub fn references(&self, reward: &Reward) -> bool {
        self.reward_id.as_deref() == Some(reward.id.as_str())
            || self.title.as_deref() == Some(reward.title.as_str())
    }

    /// The cost this redemption holds back, joining back to the catalog when
    /// the row itself has none.
    pub fn effective_cost(&self, catalog: &[Reward]) -> i64 {
        if let Some(cost) = self.cost_points {
            return cost;
        }
        catalog
            .iter()
            .find(|r| self.references(r))
            .map(|r| r.cost_points)
            .unwrap_or(0)
    }
}
