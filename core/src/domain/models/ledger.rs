use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable point-change record.
///
/// Rows reach us through two paths (a summary procedure and the raw table)
/// and may appear in both; [`LedgerEntry::logical_key`] defines when two rows
/// are the same entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Row id. Summary-procedure results may omit it.
    #[serde(default)]
    pub id: Option<i64>,
    pub child_uid: String,
    /// Signed point delta (positive for earnings)
    pub points: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Logical identity of a ledger entry: the row id when present, otherwise
/// the full field tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    Row(i64),
    Fields {
        child_uid: String,
        created_at: DateTime<Utc>,
        reason: String,
        points: i64,
    },
}

impl LedgerEntry {
    pub fn logical_key(&self) -> LedgerKey {
        match self.id {
            Some(id) => LedgerKey::Row(id),
            None => LedgerKey::Fields {
                child_uid: self.child_uid.clone(),
                created_at: self.created_at,
                reason: self.reason.clone(),
                points: self.points,
            },
        }
    }

    pub fn to_row(&self) -> shared::LedgerRow {
        shared::LedgerRow {
            id: self.id,
            child_uid: self.child_uid.clone(),
            points: self.points,
            reason: self.reason.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
