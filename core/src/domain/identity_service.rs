//! Family and child resolution from weak identity hints.
//!
//! A request arrives with zero or more hints: a `fid` query parameter that is
//! either a family UUID or a short join code, a QR payload wrapping the same
//! fields in a URL, a nickname, or nothing but whatever an earlier visit left
//! in the session tiers. Resolution walks a fixed ordered source list and the
//! first source that produces a value wins. Missing everything is a `None`,
//! never an error; the UI responds with its manual-entry form.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::domain::commands::identity::ResolveHints;
use crate::domain::models::{ChildIdentity, FamilyScope};
use crate::domain::session_service::SessionService;
use crate::store::traits::RemoteStore;

/// Family sources in precedence order; each is attempted only if the ones
/// before it produced nothing.
const FAMILY_SOURCES: &[FamilySource] = &[
    FamilySource::ExplicitParam,
    FamilySource::RememberedFamily,
    FamilySource::RememberedChild,
];

/// Child sources in precedence order within a known family.
const CHILD_SOURCES: &[ChildSource] = &[
    ChildSource::ExplicitId,
    ChildSource::Nickname,
    ChildSource::RememberedChild,
    ChildSource::FirstListed,
];

#[derive(Debug, Clone, Copy)]
enum FamilySource {
    ExplicitParam,
    RememberedFamily,
    RememberedChild,
}

#[derive(Debug, Clone, Copy)]
enum ChildSource {
    ExplicitId,
    Nickname,
    RememberedChild,
    FirstListed,
}

enum ChildLookup {
    Found(ChildIdentity),
    /// This source had nothing to say; try the next one
    Continue,
    /// An explicit hint definitively missed; resolution fails closed
    FailClosed,
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn RemoteStore>,
    session: SessionService,
}

impl IdentityService {
    pub fn new(store: Arc<dyn RemoteStore>, session: SessionService) -> Self {
        Self { store, session }
    }

    /// Resolve the family a request belongs to, or `None` when no hint
    /// yields one.
    pub async fn resolve_family(&self, hints: &ResolveHints) -> Result<Option<FamilyScope>> {
        let hints = match expand_qr(hints) {
            Some(hints) => hints,
            None => {
                warn!("Malformed QR payload, family resolution fails closed");
                return Ok(None);
            }
        };

        for source in FAMILY_SOURCES {
            if let Some(family_id) = self.try_family_source(*source, &hints).await {
                info!("Resolved family {} via {:?}", family_id, source);
                return Ok(Some(FamilyScope { family_id }));
            }
        }

        info!("No identity hint yielded a family");
        Ok(None)
    }

    /// Resolve a child within a known family, or `None` when no hint yields
    /// one. The family listing fallback is a selection default only, never an
    /// authentication decision.
    pub async fn resolve_child(
        &self,
        scope: &FamilyScope,
        hints: &ResolveHints,
    ) -> Result<Option<ChildIdentity>> {
        let hints = match expand_qr(hints) {
            Some(hints) => hints,
            None => {
                warn!("Malformed QR payload, child resolution fails closed");
                return Ok(None);
            }
        };

        for source in CHILD_SOURCES {
            match self.try_child_source(*source, scope, &hints).await {
                ChildLookup::Found(child) => {
                    info!("Resolved child {} via {:?}", child.canonical_id, source);
                    return Ok(Some(child));
                }
                ChildLookup::Continue => continue,
                ChildLookup::FailClosed => {
                    info!("Explicit child hint missed via {:?}, failing closed", source);
                    return Ok(None);
                }
            }
        }

        info!("No hint yielded a child in family {}", scope.family_id);
        Ok(None)
    }

    async fn try_family_source(&self, source: FamilySource, hints: &ResolveHints) -> Option<Uuid> {
        match source {
            FamilySource::ExplicitParam => {
                let raw = hints.fid.as_deref()?.trim();
                if raw.is_empty() {
                    return None;
                }
                if let Ok(id) = Uuid::parse_str(raw) {
                    return Some(id);
                }
                // Parents sometimes paste their login into the code field;
                // an email must never reach the code lookup
                if looks_like_email(raw) {
                    warn!("Family hint is email-shaped, refusing code lookup");
                    return None;
                }
                match self.store.family_id_for_code(raw).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("Family code lookup failed: {}", e);
                        None
                    }
                }
            }
            FamilySource::RememberedFamily => self.session.remembered_family(),
            FamilySource::RememberedChild => {
                let child_ref = self.session.remembered_child_ref()?;
                match self.store.family_for_child(&child_ref).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("Family lookup by remembered child failed: {}", e);
                        None
                    }
                }
            }
        }
    }

    async fn try_child_source(
        &self,
        source: ChildSource,
        scope: &FamilyScope,
        hints: &ResolveHints,
    ) -> ChildLookup {
        match source {
            ChildSource::ExplicitId => {
                let Some(child_id) = hints.child_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
                else {
                    return ChildLookup::Continue;
                };
                match self.store.child_by_id(scope.family_id, child_id).await {
                    Ok(Some(child)) => ChildLookup::Found(child),
                    Ok(None) => ChildLookup::FailClosed,
                    Err(e) => {
                        warn!("Child lookup by id failed: {}", e);
                        ChildLookup::Continue
                    }
                }
            }
            ChildSource::Nickname => {
                let Some(nickname) = hints.nickname.as_deref().map(str::trim).filter(|s| !s.is_empty())
                else {
                    return ChildLookup::Continue;
                };
                match self.store.child_by_nickname(scope.family_id, nickname).await {
                    Ok(Some(child)) => ChildLookup::Found(child),
                    Ok(None) => {
                        debug!("Nickname {} not found in family {}", nickname, scope.family_id);
                        ChildLookup::FailClosed
                    }
                    Err(e) => {
                        warn!("Child lookup by nickname failed: {}", e);
                        ChildLookup::Continue
                    }
                }
            }
            ChildSource::RememberedChild => {
                let Some(child_ref) = self.session.remembered_child_ref() else {
                    return ChildLookup::Continue;
                };
                match self.store.child_by_id(scope.family_id, &child_ref).await {
                    // A stale memory of a removed child is not an error
                    Ok(Some(child)) => ChildLookup::Found(child),
                    Ok(None) => ChildLookup::Continue,
                    Err(e) => {
                        warn!("Child lookup by remembered id failed: {}", e);
                        ChildLookup::Continue
                    }
                }
            }
            ChildSource::FirstListed => {
                match self.store.list_children(scope.family_id).await {
                    Ok(children) => match children.into_iter().next() {
                        Some(child) => ChildLookup::Found(child),
                        None => ChildLookup::Continue,
                    },
                    Err(e) => {
                        warn!("Family child listing failed: {}", e);
                        ChildLookup::Continue
                    }
                }
            }
        }
    }
}

/// Merge QR-carried fields into the hints. Explicit fields win over QR
/// fields; a malformed payload yields `None` and resolution fails closed
/// without retry.
fn expand_qr(hints: &ResolveHints) -> Option<ResolveHints> {
    let Some(raw) = hints.qr_payload.as_deref() else {
        return Some(hints.clone());
    };

    let url = Url::parse(raw.trim()).ok()?;
    let mut merged = hints.clone();
    for (key, value) in url.query_pairs() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "fid" if merged.fid.is_none() => merged.fid = Some(value.to_string()),
            "child" if merged.child_id.is_none() => merged.child_id = Some(value.to_string()),
            "nick" if merged.nickname.is_none() => merged.nickname = Some(value.to_string()),
            _ => {}
        }
    }
    Some(merged)
}

/// Format check keeping parent credentials out of child-facing code lookup.
fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
