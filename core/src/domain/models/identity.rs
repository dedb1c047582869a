use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A fully resolved child.
///
/// `canonical_id` and `legacy_uid` may differ for children created before the
/// id migration, but they always name the same record. Every child-scoped
/// query must filter by both forms; use [`ChildIdentity::id_set`] for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildIdentity {
    #[serde(rename = "id")]
    pub canonical_id: String,
    #[serde(rename = "child_uid")]
    pub legacy_uid: String,
    pub family_id: Uuid,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ChildIdentity {
    /// Both id forms, deduplicated, for child-scoped store queries.
    pub fn id_set(&self) -> Vec<String> {
        let mut ids = vec![self.canonical_id.clone()];
        if self.legacy_uid != self.canonical_id {
            ids.push(self.legacy_uid.clone());
        }
        ids
    }

    /// True when `candidate` is either of this child's id forms.
    pub fn matches_ref(&self, candidate: &str) -> bool {
        candidate == self.canonical_id || candidate == self.legacy_uid
    }

    pub fn to_summary(&self) -> shared::ChildSummary {
        shared::ChildSummary {
            id: self.canonical_id.clone(),
            child_uid: self.legacy_uid.clone(),
            family_id: self.family_id.to_string(),
            nickname: self.nickname.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The tenant boundary all child and reward data is partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyScope {
    pub family_id: Uuid,
}

/// A value read back from a session tier.
///
/// Older app versions stored a bare id string; newer ones store a JSON record
/// and some intermediate builds nested that record inside another object.
/// All shapes normalize through [`StoredIdentity::child_ref`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoredIdentity {
    Raw(String),
    Structured(Value),
}

impl StoredIdentity {
    /// Parse a stored value into its shape. Empty values yield `None`.
    pub fn parse(raw: &str) -> Option<StoredIdentity> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) | Ok(value @ Value::String(_)) => {
                Some(StoredIdentity::Structured(value))
            }
            _ => Some(StoredIdentity::Raw(trimmed.to_string())),
        }
    }

    /// The child reference carried by this value, whatever its shape.
    pub fn child_ref(&self) -> Option<String> {
        match self {
            StoredIdentity::Raw(s) => Some(s.clone()),
            StoredIdentity::Structured(value) => find_child_ref(value),
        }
    }
}

/// Permissive extraction of a child id from a stored value of any shape.
pub fn extract_child_ref(raw: &str) -> Option<String> {
    StoredIdentity::parse(raw)?.child_ref()
}

fn find_child_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            for key in ["child_uid", "id", "uid"] {
                if let Some(found) = map.get(key).and_then(find_child_ref) {
                    return Some(found);
                }
            }
            // Intermediate builds wrapped the record one level deeper
            map.values().find_map(find_child_ref)
        }
        _ => None,
    }
}
