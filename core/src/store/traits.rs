//! # Store Traits
//!
//! Abstraction over the remote data store and the local session tiers. The
//! domain layer works only against these traits, so the REST backend, the
//! in-memory backend, and any future transport are interchangeable.

use anyhow::Result;
use async_trait::async_trait;
use shared::VerifyMode;
use uuid::Uuid;

use crate::domain::models::{
    ChildIdentity, LedgerEntry, Offer, Redemption, Reward, WalletAggregate,
};

/// Family and child directory lookups.
#[async_trait]
pub trait FamilyStore: Send + Sync {
    /// Exchange a human-entered short code for a family id.
    /// Total or fail-closed: a code maps to exactly one family or to none.
    async fn family_id_for_code(&self, code: &str) -> Result<Option<Uuid>>;

    /// Find the family a child belongs to, by either of the child's id forms.
    async fn family_for_child(&self, child_ref: &str) -> Result<Option<Uuid>>;

    /// All children of a family, in listing order.
    async fn list_children(&self, family_id: Uuid) -> Result<Vec<ChildIdentity>>;

    /// Look up a child within a family by either id form.
    async fn child_by_id(&self, family_id: Uuid, child_ref: &str) -> Result<Option<ChildIdentity>>;

    /// Look up a child within a family by nickname (case-insensitive).
    async fn child_by_nickname(
        &self,
        family_id: Uuid,
        nickname: &str,
    ) -> Result<Option<ChildIdentity>>;
}

/// Point-change record sources.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Summary stored procedure keyed by the legacy uid. May be stale, empty,
    /// or entirely absent in some deployments.
    async fn ledger_via_summary(&self, legacy_uid: &str) -> Result<Vec<LedgerEntry>>;

    /// Raw ledger table filtered by any of the given child id forms. Source
    /// of truth, but rows may be keyed under either historical id scheme.
    async fn ledger_for_children(&self, child_refs: &[String]) -> Result<Vec<LedgerEntry>>;
}

/// Precomputed wallet aggregate.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn precomputed_wallet(&self, canonical_id: &str) -> Result<Option<WalletAggregate>>;
}

/// Reward catalog, offers, and redemptions.
#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn list_rewards(&self, family_id: Uuid) -> Result<Vec<Reward>>;

    async fn offers_for_children(&self, child_refs: &[String]) -> Result<Vec<Offer>>;

    async fn redemptions_for_children(&self, child_refs: &[String]) -> Result<Vec<Redemption>>;
}

/// Remote credential verification.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// One round trip to the verification procedure. The implementation must
    /// not retain the secret.
    async fn verify_secret(&self, child_ref: &str, secret: &str, mode: VerifyMode) -> Result<bool>;
}

/// The full remote store surface a backend provides.
pub trait RemoteStore:
    FamilyStore + LedgerStore + WalletStore + RewardStore + SecretStore
{
}

impl<T> RemoteStore for T where
    T: FamilyStore + LedgerStore + WalletStore + RewardStore + SecretStore
{
}

/// One key-value session tier (session-scoped or durable).
///
/// Reads are infallible by contract: a tier that cannot be read behaves as
/// empty. Writes can fail and callers decide whether that matters.
pub trait SessionTier: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
