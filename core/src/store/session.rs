//! Session tier backends.
//!
//! Two tiers back the session synchronizer: a process-lifetime in-memory tier
//! and a durable tier persisted as one small JSON file in the user's data
//! directory. Both speak the same [`SessionTier`] interface.

use anyhow::{Context, Result};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::store::traits::SessionTier;

/// Session-scoped tier; values live as long as the process.
#[derive(Default)]
pub struct MemoryTier {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionTier for MemoryTier {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Durable tier; the whole map is rewritten to disk on every change.
pub struct FileTier {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileTier {
    /// Open a durable tier at the given file, loading any existing contents.
    /// A missing or unreadable file starts empty rather than failing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating session directory {}", parent.display()))?;
        }

        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Durable session file {} is malformed, starting empty: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the durable tier at its default location in the platform data
    /// directory.
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine platform data directory"))?;
        Self::open(base.join("Family Points").join("session.json"))
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Writing session file {}", self.path.display()))
    }
}

impl SessionTier for FileTier {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap();
        values.remove(key);
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tier_round_trips() {
        let tier = MemoryTier::new();
        assert_eq!(tier.get("k"), None);
        tier.set("k", "v").unwrap();
        assert_eq!(tier.get("k"), Some("v".to_string()));
        tier.remove("k").unwrap();
        assert_eq!(tier.get("k"), None);
    }

    #[test]
    fn file_tier_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let tier = FileTier::open(&path).unwrap();
            tier.set("child", "abc-123").unwrap();
        }

        let reopened = FileTier::open(&path).unwrap();
        assert_eq!(reopened.get("child"), Some("abc-123".to_string()));
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json at all").unwrap();

        let tier = FileTier::open(&path).unwrap();
        assert_eq!(tier.get("child"), None);

        // And it heals on the next write
        tier.set("child", "abc").unwrap();
        let reopened = FileTier::open(&path).unwrap();
        assert_eq!(reopened.get("child"), Some("abc".to_string()));
    }
}
