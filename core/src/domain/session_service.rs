//! Two-tier persistence of the resolved identity.
//!
//! A resolved child is written to both a session-scoped tier and a durable
//! tier under fixed keys. On load the session tier is repaired from the
//! durable tier before anything renders, because downstream code reads the
//! session tier unconditionally.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::{extract_child_ref, ChildIdentity};
use crate::store::traits::SessionTier;

/// Fixed key for the remembered child (structured JSON record).
pub const CHILD_KEY: &str = "family_points.child";
/// Fixed key for the remembered family (bare UUID string).
pub const FAMILY_KEY: &str = "family_points.family";

/// Service keeping the two session tiers in agreement.
#[derive(Clone)]
pub struct SessionService {
    session: Arc<dyn SessionTier>,
    durable: Arc<dyn SessionTier>,
}

impl SessionService {
    pub fn new(session: Arc<dyn SessionTier>, durable: Arc<dyn SessionTier>) -> Self {
        Self { session, durable }
    }

    /// Copy durable values into an empty session tier.
    ///
    /// Must run before the first render; it is synchronous so callers cannot
    /// accidentally defer it past that point.
    pub fn repair(&self) {
        for key in [CHILD_KEY, FAMILY_KEY] {
            if self.session.get(key).is_none() {
                if let Some(value) = self.durable.get(key) {
                    debug!("Repairing session tier for key {}", key);
                    if let Err(e) = self.session.set(key, &value) {
                        warn!("Session tier repair write failed for {}: {}", key, e);
                    }
                }
            }
        }
    }

    /// Remember a resolved child in both tiers.
    pub fn remember_child(&self, identity: &ChildIdentity) -> Result<()> {
        let record = serde_json::to_string(identity)?;
        self.write_both(CHILD_KEY, &record);
        self.write_both(FAMILY_KEY, &identity.family_id.to_string());
        info!("Remembered child {} in both session tiers", identity.canonical_id);
        Ok(())
    }

    /// Remember a family scope alone (child not yet chosen).
    pub fn remember_family(&self, family_id: Uuid) {
        self.write_both(FAMILY_KEY, &family_id.to_string());
    }

    /// The remembered child reference, whichever tier and shape holds it.
    pub fn remembered_child_ref(&self) -> Option<String> {
        self.read_repaired(CHILD_KEY)
            .and_then(|value| extract_child_ref(&value))
    }

    /// The remembered family id, if any tier holds a parseable one.
    pub fn remembered_family(&self) -> Option<Uuid> {
        let value = self.read_repaired(FAMILY_KEY)?;
        // Historical builds stored the bare uuid; tolerate a quoted one too
        let trimmed = value.trim().trim_matches('"');
        Uuid::parse_str(trimmed).ok()
    }

    /// Drop the remembered identity from both tiers.
    pub fn forget(&self) {
        for key in [CHILD_KEY, FAMILY_KEY] {
            if let Err(e) = self.session.remove(key) {
                warn!("Failed to clear session tier key {}: {}", key, e);
            }
            if let Err(e) = self.durable.remove(key) {
                warn!("Failed to clear durable tier key {}: {}", key, e);
            }
        }
    }

    /// Read a key, repairing the session tier from the durable tier when they
    /// diverge. A divergent read never fails, it heals.
    fn read_repaired(&self, key: &str) -> Option<String> {
        match self.session.get(key) {
            Some(value) => Some(value),
            None => {
                let value = self.durable.get(key)?;
                if let Err(e) = self.session.set(key, &value) {
                    warn!("Session tier repair write failed for {}: {}", key, e);
                }
                Some(value)
            }
        }
    }

    fn write_both(&self, key: &str, value: &str) {
        if let Err(e) = self.session.set(key, value) {
            warn!("Session tier write failed for {}: {}", key, e);
        }
        if let Err(e) = self.durable.set(key, value) {
            warn!("Durable tier write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::session::MemoryTier;

    fn service() -> (SessionService, Arc<MemoryTier>, Arc<MemoryTier>) {
        let session = Arc::new(MemoryTier::new());
        let durable = Arc::new(MemoryTier::new());
        let svc = SessionService::new(session.clone(), durable.clone());
        (svc, session, durable)
    }

    fn child() -> ChildIdentity {
        ChildIdentity {
            canonical_id: "canonical-1".to_string(),
            legacy_uid: "legacy-1".to_string(),
            family_id: Uuid::nil(),
            nickname: Some("Sam".to_string()),
            display_name: None,
        }
    }

    #[test]
    fn repair_copies_durable_into_empty_session() {
        let (svc, session, durable) = service();
        durable.set(CHILD_KEY, "abc-123").unwrap();

        svc.repair();

        assert_eq!(session.get(CHILD_KEY), Some("abc-123".to_string()));
        assert_eq!(svc.remembered_child_ref(), Some("abc-123".to_string()));
    }

    #[test]
    fn repair_does_not_clobber_session_values() {
        let (svc, session, durable) = service();
        session.set(CHILD_KEY, "from-session").unwrap();
        durable.set(CHILD_KEY, "from-durable").unwrap();

        svc.repair();

        assert_eq!(session.get(CHILD_KEY), Some("from-session".to_string()));
    }

    #[test]
    fn divergent_read_heals_session_tier() {
        let (svc, session, durable) = service();
        durable
            .set(CHILD_KEY, r#"{"id":"canonical-2","child_uid":"legacy-2"}"#)
            .unwrap();

        // No repair() call; the read itself must heal
        assert_eq!(svc.remembered_child_ref(), Some("legacy-2".to_string()));
        assert!(session.get(CHILD_KEY).is_some());
    }

    #[test]
    fn remember_child_writes_both_tiers() {
        let (svc, session, durable) = service();
        svc.remember_child(&child()).unwrap();

        for tier in [&session, &durable] {
            let value = tier.get(CHILD_KEY).unwrap();
            assert_eq!(extract_child_ref(&value), Some("legacy-1".to_string()));
        }
        assert_eq!(svc.remembered_family(), Some(Uuid::nil()));
    }

    #[test]
    fn remembered_family_tolerates_quoted_uuid() {
        let (svc, session, _) = service();
        let id = Uuid::new_v4();
        session.set(FAMILY_KEY, &format!("\"{}\"", id)).unwrap();
        assert_eq!(svc.remembered_family(), Some(id));
    }

    #[test]
    fn forget_clears_both_tiers() {
        let (svc, session, durable) = service();
        svc.remember_child(&child()).unwrap();
        svc.forget();

        assert_eq!(session.get(CHILD_KEY), None);
        assert_eq!(durable.get(FAMILY_KEY), None);
        assert_eq!(svc.remembered_child_ref(), None);
    }
}
