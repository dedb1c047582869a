//! # Family Points Core
//!
//! Non-UI logic for the family points app: resolving which child and family a
//! request belongs to, keeping that identity across the two session tiers,
//! and reconciling a consistent points wallet from sources that occasionally
//! disagree.
//!
//! ## Architecture
//!
//! ```text
//! UI layer (forms, modals, dashboards)
//!     |
//! AppState (this crate's facade)
//!     |
//! Domain layer (resolution, verification, aggregation, classification)
//!     |
//! Store layer (REST backend, in-memory backend, session tiers)
//! ```
//!
//! The facade drives the mount pipeline: repair the session tiers, resolve
//! identity, remember it, then load the wallet and reward state in parallel.
//! Server-pushed row changes land on the [`events::EventBus`] and trigger one
//! soft refresh per event.

pub mod domain;
pub mod events;
pub mod store;

use anyhow::Result;
use log::{info, warn};
use shared::DashboardView;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::domain::commands::identity::ResolveHints;
use crate::domain::models::ChildIdentity;
use crate::domain::{
    IdentityService, LedgerService, RewardService, SecretService, SessionService, WalletService,
};
use crate::events::EventBus;
use crate::store::traits::{RemoteStore, SessionTier};

/// All services over one store connection.
#[derive(Clone)]
pub struct AppState {
    pub identity_service: IdentityService,
    pub session_service: SessionService,
    pub secret_service: SecretService,
    pub ledger_service: LedgerService,
    pub wallet_service: WalletService,
    pub reward_service: RewardService,
    events: EventBus,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        session_tier: Arc<dyn SessionTier>,
        durable_tier: Arc<dyn SessionTier>,
        events: EventBus,
    ) -> Self {
        let session_service = SessionService::new(session_tier, durable_tier);
        let identity_service = IdentityService::new(store.clone(), session_service.clone());
        let secret_service = SecretService::new(store.clone());
        let ledger_service = LedgerService::new(store.clone());
        let wallet_service = WalletService::new(store.clone(), ledger_service.clone());
        let reward_service = RewardService::new(store);

        Self {
            identity_service,
            session_service,
            secret_service,
            ledger_service,
            wallet_service,
            reward_service,
            events,
        }
    }

    /// The mount pipeline: repair the session tiers, resolve identity from
    /// the given hints, remember the result, and load the first dashboard.
    ///
    /// `None` means no hint yielded an identity and the UI should show its
    /// manual-entry form.
    pub async fn start_session(&self, hints: &ResolveHints) -> Result<Option<DashboardView>> {
        // Downstream reads go to the session tier unconditionally, so repair
        // must complete before anything renders
        self.session_service.repair();

        let Some(scope) = self.identity_service.resolve_family(hints).await? else {
            info!("Family resolution found nothing, falling back to manual entry");
            return Ok(None);
        };
        self.session_service.remember_family(scope.family_id);

        let Some(identity) = self.identity_service.resolve_child(&scope, hints).await? else {
            info!("Child resolution found nothing in family {}", scope.family_id);
            return Ok(None);
        };
        self.session_service.remember_child(&identity)?;

        let view = self.build_dashboard(&identity).await?;
        Ok(Some(view))
    }

    /// One full aggregation, reconciliation, and classification cycle.
    pub async fn build_dashboard(&self, identity: &ChildIdentity) -> Result<DashboardView> {
        let (computation, rewards) = tokio::join!(
            self.wallet_service.compute_wallet(identity),
            self.reward_service.classify_rewards(identity),
        );
        let computation = computation?;
        let rewards = rewards?;

        Ok(DashboardView {
            child: identity.to_summary(),
            wallet: computation.snapshot,
            encouragement_points: computation.encouragement_points,
            ledger: computation.ledger.iter().map(|e| e.to_row()).collect(),
            rewards,
        })
    }

    /// Watch a child's dashboard, re-running the full cycle once per change
    /// event scoped to that child. Events are not batched; a burst of changes
    /// produces a burst of refreshes, each independently consistent.
    pub async fn watch_dashboard(
        &self,
        identity: ChildIdentity,
    ) -> Result<watch::Receiver<DashboardView>> {
        let initial = self.build_dashboard(&identity).await?;
        let (tx, rx) = watch::channel(initial);
        let mut events = self.events.subscribe();
        let state = self.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if identity.matches_ref(&event.child_uid) => {
                        match state.build_dashboard(&identity).await {
                            Ok(view) => {
                                if tx.send(view).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Soft refresh failed: {}", e),
                        }
                    }
                    Ok(_) => {} // another child's change
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Soft refresh fell behind by {} events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}
