//! Wallet reconciliation.
//!
//! The precomputed aggregate is cheap and usually right, but it can be absent
//! in some deployments or briefly zeroed after a write. Whenever it does not
//! carry a positive figure, the wallet is derived from primitive tables:
//! earned from positive ledger rows, reserved from accepted offers plus
//! in-flight redemptions joined back to the catalog. Disagreement between the
//! two paths is not detected; a positive aggregate is trusted as-is.

use anyhow::Result;
use log::{debug, warn};
use shared::{WalletSnapshot, WalletSource};
use std::sync::Arc;

use crate::domain::encouragement::encouragement_total;
use crate::domain::ledger_service::LedgerService;
use crate::domain::models::{ChildIdentity, LedgerEntry, Offer, OfferStatus, Redemption, Reward};
use crate::domain::rows_or_empty;
use crate::store::traits::RemoteStore;

/// A reconciled wallet plus the ledger it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletComputation {
    pub snapshot: WalletSnapshot,
    /// Cheer/bonus points, reported alongside the snapshot
    pub encouragement_points: i64,
    pub ledger: Vec<LedgerEntry>,
}

#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn RemoteStore>,
    ledger_service: LedgerService,
}

impl WalletService {
    pub fn new(store: Arc<dyn RemoteStore>, ledger_service: LedgerService) -> Self {
        Self {
            store,
            ledger_service,
        }
    }

    /// Compute the wallet snapshot for a child.
    pub async fn compute_wallet(&self, identity: &ChildIdentity) -> Result<WalletComputation> {
        // The ledger is needed for the encouragement tally and the activity
        // feed regardless of which wallet path wins
        let (ledger, aggregate) = tokio::join!(
            self.ledger_service.load_ledger(identity),
            self.store.precomputed_wallet(&identity.canonical_id),
        );
        let ledger = ledger?;

        let aggregate = match aggregate {
            Ok(aggregate) => aggregate,
            Err(e) => {
                warn!("Wallet aggregate query failed, deriving instead: {}", e);
                None
            }
        };

        let snapshot = match aggregate {
            Some(aggregate) if aggregate.is_trustworthy() => {
                debug!(
                    "Trusting precomputed wallet for {}: {} available",
                    identity.canonical_id, aggregate.available_points
                );
                WalletSnapshot {
                    earned_points: aggregate.earned_points,
                    reserved_points: aggregate.reserved_points,
                    available_points: aggregate.available_points.max(0),
                    source: WalletSource::Precomputed,
                }
            }
            _ => self.derive_snapshot(identity, &ledger).await,
        };

        let encouragement_points = encouragement_total(&ledger);

        Ok(WalletComputation {
            snapshot,
            encouragement_points,
            ledger,
        })
    }

    /// The safety-net path: recompute everything from primitive tables.
    async fn derive_snapshot(
        &self,
        identity: &ChildIdentity,
        ledger: &[LedgerEntry],
    ) -> WalletSnapshot {
        let ids = identity.id_set();

        let (offers, redemptions, catalog) = tokio::join!(
            self.store.offers_for_children(&ids),
            self.store.redemptions_for_children(&ids),
            self.store.list_rewards(identity.family_id),
        );
        let offers = rows_or_empty(offers, "offers table");
        let redemptions = rows_or_empty(redemptions, "redemptions table");
        let catalog = rows_or_empty(catalog, "rewards catalog");

        let earned: i64 = ledger.iter().filter(|e| e.points > 0).map(|e| e.points).sum();
        let reserved = reserved_points(&offers, &redemptions, &catalog);

        debug!(
            "Derived wallet for {}: earned {}, reserved {}",
            identity.canonical_id, earned, reserved
        );

        WalletSnapshot {
            earned_points: earned,
            reserved_points: reserved,
            available_points: (earned - reserved).max(0),
            source: WalletSource::Derived,
        }
    }
}

/// Points already promised: accepted offers plus pending/approved
/// redemptions, each joined back to the catalog when the row carries no cost
/// of its own.
fn reserved_points(offers: &[Offer], redemptions: &[Redemption], catalog: &[Reward]) -> i64 {
    let from_offers: i64 = offers
        .iter()
        .filter(|o| o.status == OfferStatus::Accepted)
        .map(|o| o.effective_cost(catalog))
        .sum();

    let from_redemptions: i64 = redemptions
        .iter()
        .filter(|r| r.status.reserves_points())
        .map(|r| r.effective_cost(catalog))
        .sum();

    from_offers + from_redemptions
}
