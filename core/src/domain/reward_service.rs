//! Reward and offer classification.
//!
//! Catalog rewards are shown to a child as available, pending, or completed.
//! The status comes from redemption rows referencing the reward, by id or,
//! for redemptions created straight from an offer, by title. Transitions
//! happen in the remote store; this service only reads and classifies.

use anyhow::Result;
use log::debug;
use shared::{ClassifiedReward, RewardStatus};
use std::sync::Arc;

use crate::domain::models::{ChildIdentity, Offer, OfferStatus, Redemption, RedemptionStatus, Reward};
use crate::domain::rows_or_empty;
use crate::store::traits::RemoteStore;

#[derive(Clone)]
pub struct RewardService {
    store: Arc<dyn RemoteStore>,
}

impl RewardService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Classify every catalog reward of the child's family for that child.
    pub async fn classify_rewards(&self, identity: &ChildIdentity) -> Result<Vec<ClassifiedReward>> {
        let ids = identity.id_set();

        let (rewards, redemptions) = tokio::join!(
            self.store.list_rewards(identity.family_id),
            self.store.redemptions_for_children(&ids),
        );
        let rewards = rows_or_empty(rewards, "rewards catalog");
        let redemptions = rows_or_empty(redemptions, "redemptions table");

        debug!(
            "Classifying {} rewards against {} redemptions for {}",
            rewards.len(),
            redemptions.len(),
            identity.canonical_id
        );

        Ok(rewards
            .iter()
            .map(|reward| ClassifiedReward {
                reward_id: reward.id.clone(),
                title: reward.title.clone(),
                cost_points: reward.cost_points,
                status: classify_reward(reward, &redemptions),
            })
            .collect())
    }

    /// Offers currently awaiting the child's answer.
    pub async fn open_offers(&self, identity: &ChildIdentity) -> Result<Vec<Offer>> {
        let ids = identity.id_set();
        let offers = rows_or_empty(self.store.offers_for_children(&ids).await, "offers table");
        Ok(offers
            .into_iter()
            .filter(|o| o.status == OfferStatus::Offered)
            .collect())
    }
}

/// Exactly one status per reward. A pending request wins over redemption
/// history, so a re-redeemable reward shows as pending while in flight.
fn classify_reward(reward: &Reward, redemptions: &[Redemption]) -> RewardStatus {
    let referencing: Vec<&Redemption> = redemptions
        .iter()
        .filter(|r| r.references(reward))
        .collect();

    if referencing
        .iter()
        .any(|r| r.status == RedemptionStatus::Pending)
    {
        RewardStatus::Pending
    } else if referencing.iter().any(|r| {
        matches!(
            r.status,
            RedemptionStatus::Approved | RedemptionStatus::Fulfilled
        )
    }) {
        RewardStatus::Completed
    } else {
        RewardStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use uuid::Uuid;

    fn child(family: Uuid) -> ChildIdentity {
        ChildIdentity {
            canonical_id: "c-1".to_string(),
            legacy_uid: "legacy-1".to_string(),
            family_id: family,
            nickname: None,
            display_name: None,
        }
    }

    fn reward(id: &str, family: Uuid, title: &str) -> Reward {
        Reward {
            id: id.to_string(),
            family_id: family,
            title: title.to_string(),
            cost_points: 25,
        }
    }

    fn redemption(id: &str, reward_id: Option<&str>, title: Option<&str>, status: RedemptionStatus) -> Redemption {
        Redemption {
            id: id.to_string(),
            child_uid: "legacy-1".to_string(),
            reward_id: reward_id.map(str::to_string),
            title: title.map(str::to_string),
            cost_points: Some(25),
            status,
        }
    }

    fn setup() -> (RewardService, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        (RewardService::new(store.clone()), store, Uuid::new_v4())
    }

    #[tokio::test]
    async fn untouched_rewards_are_available() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].status, RewardStatus::Available);
    }

    #[tokio::test]
    async fn pending_redemption_marks_reward_pending() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));
        store.add_redemption(redemption("rd-1", Some("r-1"), None, RedemptionStatus::Pending));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert_eq!(classified[0].status, RewardStatus::Pending);
    }

    #[tokio::test]
    async fn approved_or_fulfilled_marks_reward_completed() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));
        store.add_reward(reward("r-2", family, "Ice cream"));
        store.add_redemption(redemption("rd-1", Some("r-1"), None, RedemptionStatus::Approved));
        store.add_redemption(redemption("rd-2", Some("r-2"), None, RedemptionStatus::Fulfilled));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert!(classified.iter().all(|c| c.status == RewardStatus::Completed));
    }

    #[tokio::test]
    async fn title_match_covers_offer_created_redemptions() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));
        store.add_redemption(redemption("rd-1", None, Some("Movie night"), RedemptionStatus::Pending));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert_eq!(classified[0].status, RewardStatus::Pending);
    }

    #[tokio::test]
    async fn pending_wins_over_history() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));
        store.add_redemption(redemption("rd-1", Some("r-1"), None, RedemptionStatus::Fulfilled));
        store.add_redemption(redemption("rd-2", Some("r-1"), None, RedemptionStatus::Pending));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert_eq!(classified[0].status, RewardStatus::Pending);
    }

    #[tokio::test]
    async fn rejected_redemptions_leave_reward_available() {
        let (service, store, family) = setup();
        store.add_reward(reward("r-1", family, "Movie night"));
        store.add_redemption(redemption("rd-1", Some("r-1"), None, RedemptionStatus::Rejected));

        let classified = service.classify_rewards(&child(family)).await.unwrap();
        assert_eq!(classified[0].status, RewardStatus::Available);
    }

    #[tokio::test]
    async fn open_offers_excludes_answered_ones() {
        let (service, store, family) = setup();
        for (id, status) in [
            ("o-1", OfferStatus::Offered),
            ("o-2", OfferStatus::Accepted),
            ("o-3", OfferStatus::Expired),
        ] {
            store.add_offer(Offer {
                id: id.to_string(),
                child_uid: "legacy-1".to_string(),
                reward_id: None,
                title: format!("Offer {}", id),
                cost_points: Some(10),
                status,
            });
        }

        let open = service.open_offers(&child(family)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "o-1");
    }
}
