//! Ledger aggregation across the two point-change sources.
//!
//! The summary stored procedure is fast but may be stale, empty, or missing
//! in some deployments; the raw ledger table is the source of truth but rows
//! may sit under either historical id scheme. Querying both and deduplicating
//! the union is the only policy that stays correct under every combination,
//! so either source failing is swallowed, never escalated.

use anyhow::Result;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::models::{ChildIdentity, LedgerEntry};
use crate::domain::rows_or_empty;
use crate::store::traits::RemoteStore;

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn RemoteStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Load the deduplicated point-change history for a child, newest first.
    pub async fn load_ledger(&self, identity: &ChildIdentity) -> Result<Vec<LedgerEntry>> {
        let ids = identity.id_set();

        let (summary, table) = tokio::join!(
            self.store.ledger_via_summary(&identity.legacy_uid),
            self.store.ledger_for_children(&ids),
        );

        let mut entries = rows_or_empty(summary, "points summary procedure");
        let summary_count = entries.len();
        entries.extend(rows_or_empty(table, "raw ledger table"));

        let deduped = dedupe_entries(entries);
        debug!(
            "Aggregated ledger for {}: {} from summary, {} total after dedup",
            identity.canonical_id,
            summary_count,
            deduped.len()
        );
        Ok(deduped)
    }
}

/// Drop duplicate entries by logical identity, keeping first occurrence,
/// then order newest first.
fn dedupe_entries(entries: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if seen.insert(entry.logical_key()) {
            out.push(entry);
        }
    }
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn child() -> ChildIdentity {
        ChildIdentity {
            canonical_id: "c-1".to_string(),
            legacy_uid: "legacy-1".to_string(),
            family_id: Uuid::nil(),
            nickname: None,
            display_name: None,
        }
    }

    fn entry(id: Option<i64>, uid: &str, points: i64, reason: &str, minute: u32) -> LedgerEntry {
        LedgerEntry {
            id,
            child_uid: uid.to_string(),
            points,
            reason: reason.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, minute, 0).unwrap(),
        }
    }

    fn setup() -> (LedgerService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (LedgerService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn union_deduplicates_by_row_id() {
        let (service, store) = setup();
        // The same row comes back from both sources
        store.set_summary("legacy-1", vec![entry(Some(1), "legacy-1", 50, "Reading", 0)]);
        store.add_ledger_entry(entry(Some(1), "legacy-1", 50, "Reading", 0));
        store.add_ledger_entry(entry(Some(2), "c-1", 20, "Chores", 1));

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn union_deduplicates_by_fields_when_id_missing() {
        let (service, store) = setup();
        store.set_summary("legacy-1", vec![entry(None, "legacy-1", 50, "Reading", 0)]);
        store.add_ledger_entry(entry(None, "legacy-1", 50, "Reading", 0));

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn both_id_forms_are_queried() {
        let (service, store) = setup();
        store.add_ledger_entry(entry(Some(1), "legacy-1", 50, "Reading", 0));
        store.add_ledger_entry(entry(Some(2), "c-1", 20, "Chores", 1));

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let (service, store) = setup();
        store.set_summary("legacy-1", vec![entry(Some(1), "legacy-1", 50, "Reading", 0)]);
        store.add_ledger_entry(entry(Some(1), "legacy-1", 50, "Reading", 0));
        store.add_ledger_entry(entry(Some(2), "c-1", 20, "Chores", 1));

        let first = service.load_ledger(&child()).await.unwrap();
        let second = service.load_ledger(&child()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn summary_failure_is_swallowed() {
        let (service, store) = setup();
        store.fail_ledger_summary.store(true, Ordering::SeqCst);
        store.add_ledger_entry(entry(Some(1), "c-1", 50, "Reading", 0));

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn table_failure_leaves_summary_rows() {
        let (service, store) = setup();
        store.fail_ledger_table.store(true, Ordering::SeqCst);
        store.set_summary("legacy-1", vec![entry(Some(1), "legacy-1", 50, "Reading", 0)]);

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn both_sources_failing_yields_empty() {
        let (service, store) = setup();
        store.fail_ledger_summary.store(true, Ordering::SeqCst);
        store.fail_ledger_table.store(true, Ordering::SeqCst);

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn entries_come_back_newest_first() {
        let (service, store) = setup();
        store.add_ledger_entry(entry(Some(1), "c-1", 50, "Oldest", 0));
        store.add_ledger_entry(entry(Some(2), "c-1", 20, "Newest", 30));

        let ledger = service.load_ledger(&child()).await.unwrap();
        assert_eq!(ledger[0].reason, "Newest");
        assert_eq!(ledger[1].reason, "Oldest");
    }
}
