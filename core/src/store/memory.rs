//! In-memory store backend.
//!
//! Implements the full remote-store surface over process-local tables. Used
//! for local development and as the deterministic fixture behind every
//! service test. Write helpers publish change events the way the real
//! deployment pushes row notifications, and call counters let tests assert
//! that a lookup was or was not issued.

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::VerifyMode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{
    ChildIdentity, LedgerEntry, Offer, OfferStatus, Redemption, RedemptionStatus, Reward,
    WalletAggregate,
};
use crate::events::{ChangeEvent, ChangeTable, EventBus};
use crate::store::traits::{FamilyStore, LedgerStore, RewardStore, SecretStore, WalletStore};

#[derive(Default)]
struct Tables {
    children: Vec<ChildIdentity>,
    family_codes: HashMap<String, Uuid>,
    ledger: Vec<LedgerEntry>,
    summaries: HashMap<String, Vec<LedgerEntry>>,
    wallets: HashMap<String, WalletAggregate>,
    rewards: Vec<Reward>,
    offers: Vec<Offer>,
    redemptions: Vec<Redemption>,
    secrets: HashMap<String, String>,
}

/// Process-local store with the same surface as the remote one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    events: Option<EventBus>,
    /// Number of short-code exchange calls issued
    pub code_lookups: AtomicUsize,
    /// Number of verification round trips issued
    pub verify_calls: AtomicUsize,
    /// Simulate the summary procedure being absent
    pub fail_ledger_summary: AtomicBool,
    /// Simulate the raw ledger table being unreachable
    pub fail_ledger_table: AtomicBool,
    /// Simulate the wallet aggregate being unreachable
    pub fail_wallet: AtomicBool,
    /// Simulate a verification endpoint that never answers
    pub hang_verify: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that publishes row changes onto the given bus.
    pub fn with_events(events: EventBus) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    pub fn add_child(&self, child: ChildIdentity) {
        self.tables.write().unwrap().children.push(child);
    }

    pub fn set_family_code(&self, code: &str, family_id: Uuid) {
        self.tables
            .write()
            .unwrap()
            .family_codes
            .insert(code.to_lowercase(), family_id);
    }

    pub fn add_ledger_entry(&self, entry: LedgerEntry) {
        let child_uid = entry.child_uid.clone();
        self.tables.write().unwrap().ledger.push(entry);
        self.publish(ChangeTable::Ledger, child_uid);
    }

    /// Replace the summary-procedure result for a legacy uid.
    pub fn set_summary(&self, legacy_uid: &str, entries: Vec<LedgerEntry>) {
        self.tables
            .write()
            .unwrap()
            .summaries
            .insert(legacy_uid.to_string(), entries);
    }

    pub fn set_wallet(&self, aggregate: WalletAggregate) {
        self.tables
            .write()
            .unwrap()
            .wallets
            .insert(aggregate.child_id.clone(), aggregate);
    }

    pub fn add_reward(&self, reward: Reward) {
        self.tables.write().unwrap().rewards.push(reward);
    }

    pub fn add_offer(&self, offer: Offer) {
        let child_uid = offer.child_uid.clone();
        self.tables.write().unwrap().offers.push(offer);
        self.publish(ChangeTable::Offers, child_uid);
    }

    pub fn set_offer_status(&self, offer_id: &str, status: OfferStatus) {
        let mut child_uid = None;
        {
            let mut tables = self.tables.write().unwrap();
            if let Some(offer) = tables.offers.iter_mut().find(|o| o.id == offer_id) {
                offer.status = status;
                child_uid = Some(offer.child_uid.clone());
            }
        }
        if let Some(uid) = child_uid {
            self.publish(ChangeTable::Offers, uid);
        }
    }

    pub fn add_redemption(&self, redemption: Redemption) {
        let child_uid = redemption.child_uid.clone();
        self.tables.write().unwrap().redemptions.push(redemption);
        self.publish(ChangeTable::Redemptions, child_uid);
    }

    pub fn set_redemption_status(&self, redemption_id: &str, status: RedemptionStatus) {
        let mut child_uid = None;
        {
            let mut tables = self.tables.write().unwrap();
            if let Some(r) = tables.redemptions.iter_mut().find(|r| r.id == redemption_id) {
                r.status = status;
                child_uid = Some(r.child_uid.clone());
            }
        }
        if let Some(uid) = child_uid {
            self.publish(ChangeTable::Redemptions, uid);
        }
    }

    pub fn set_secret(&self, child_ref: &str, secret: &str) {
        self.tables
            .write()
            .unwrap()
            .secrets
            .insert(child_ref.to_string(), secret.to_string());
    }

    fn publish(&self, table: ChangeTable, child_uid: String) {
        if let Some(bus) = &self.events {
            bus.publish(ChangeEvent { table, child_uid });
        }
    }
}

#[async_trait]
impl FamilyStore for MemoryStore {
    async fn family_id_for_code(&self, code: &str) -> Result<Option<Uuid>> {
        self.code_lookups.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().unwrap();
        Ok(tables.family_codes.get(&code.to_lowercase()).copied())
    }

    async fn family_for_child(&self, child_ref: &str) -> Result<Option<Uuid>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .children
            .iter()
            .find(|c| c.matches_ref(child_ref))
            .map(|c| c.family_id))
    }

    async fn list_children(&self, family_id: Uuid) -> Result<Vec<ChildIdentity>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .children
            .iter()
            .filter(|c| c.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn child_by_id(&self, family_id: Uuid, child_ref: &str) -> Result<Option<ChildIdentity>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .children
            .iter()
            .find(|c| c.family_id == family_id && c.matches_ref(child_ref))
            .cloned())
    }

    async fn child_by_nickname(
        &self,
        family_id: Uuid,
        nickname: &str,
    ) -> Result<Option<ChildIdentity>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .children
            .iter()
            .find(|c| {
                c.family_id == family_id
                    && c.nickname
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(nickname))
            })
            .cloned())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn ledger_via_summary(&self, legacy_uid: &str) -> Result<Vec<LedgerEntry>> {
        if self.fail_ledger_summary.load(Ordering::SeqCst) {
            bail!("summary procedure unavailable");
        }
        let tables = self.tables.read().unwrap();
        Ok(tables.summaries.get(legacy_uid).cloned().unwrap_or_default())
    }

    async fn ledger_for_children(&self, child_refs: &[String]) -> Result<Vec<LedgerEntry>> {
        if self.fail_ledger_table.load(Ordering::SeqCst) {
            bail!("ledger table unavailable");
        }
        let tables = self.tables.read().unwrap();
        Ok(tables
            .ledger
            .iter()
            .filter(|e| child_refs.iter().any(|r| *r == e.child_uid))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn precomputed_wallet(&self, canonical_id: &str) -> Result<Option<WalletAggregate>> {
        if self.fail_wallet.load(Ordering::SeqCst) {
            bail!("wallet aggregate unavailable");
        }
        let tables = self.tables.read().unwrap();
        Ok(tables.wallets.get(canonical_id).cloned())
    }
}

#[async_trait]
impl RewardStore for MemoryStore {
    async fn list_rewards(&self, family_id: Uuid) -> Result<Vec<Reward>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .rewards
            .iter()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn offers_for_children(&self, child_refs: &[String]) -> Result<Vec<Offer>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .offers
            .iter()
            .filter(|o| child_refs.iter().any(|r| *r == o.child_uid))
            .cloned()
            .collect())
    }

    async fn redemptions_for_children(&self, child_refs: &[String]) -> Result<Vec<Redemption>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .redemptions
            .iter()
            .filter(|r| child_refs.iter().any(|c| *c == r.child_uid))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn verify_secret(&self, child_ref: &str, secret: &str, _mode: VerifyMode) -> Result<bool> {
        if self.hang_verify.load(Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().unwrap();
        Ok(tables
            .secrets
            .get(child_ref)
            .is_some_and(|stored| stored == secret))
    }
}
