use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::models::{Alm, AlmSetting};
use super::store::{SettingsStore, SettingsTransaction, StoreError};

type Records = Arc<RwLock<HashMap<Uuid, AlmSetting>>>;

/// In-process settings store for development and tests.
///
/// Transactions buffer their writes and apply them at commit under the write lock.
/// The unique key constraint is enforced there, so two transactions that both
/// passed a key lookup cannot both land.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    records: Records,
}

/// Settings file entry accepted by `load_seed_file`
#[derive(Debug, Deserialize)]
struct SeedSetting {
    key: String,
    #[serde(default = "default_alm")]
    alm: Alm,
    url: String,
    app_id: String,
    private_key: String,
}

fn default_alm() -> Alm {
    Alm::Github
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new setting, enforcing key uniqueness
    pub async fn insert(&self, setting: AlmSetting) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.values().any(|r| r.key == setting.key) {
            return Err(StoreError::UniqueViolation(setting.key));
        }
        records.insert(setting.uuid, setting);
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<AlmSetting> {
        let records = self.records.read().await;
        records.values().find(|r| r.key == key).cloned()
    }

    /// All settings ordered by key
    pub async fn list(&self) -> Vec<AlmSetting> {
        let records = self.records.read().await;
        let mut all: Vec<AlmSetting> = records.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Load a JSON array of settings into the store
    pub async fn load_seed_file(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let seeds: Vec<SeedSetting> = serde_json::from_str(&raw)?;
        let count = seeds.len();

        for seed in seeds {
            let mut setting = AlmSetting::github(seed.key, seed.url, seed.app_id, seed.private_key);
            setting.alm = seed.alm;
            self.insert(setting).await?;
        }

        info!("Seeded {} ALM settings from {}", count, path.display());
        Ok(count)
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn begin(&self) -> Result<Box<dyn SettingsTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            records: self.records.clone(),
            pending: HashMap::new(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemoryTransaction {
    records: Records,
    pending: HashMap<Uuid, AlmSetting>,
}

#[async_trait]
impl SettingsTransaction for MemoryTransaction {
    async fn select_by_key(&mut self, key: &str) -> Result<Option<AlmSetting>, StoreError> {
        // Own writes are visible first; committed rows shadowed by them are not
        if let Some(found) = self.pending.values().find(|r| r.key == key) {
            return Ok(Some(found.clone()));
        }
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.key == key && !self.pending.contains_key(&r.uuid))
            .cloned())
    }

    async fn update(&mut self, setting: &AlmSetting) -> Result<(), StoreError> {
        let exists = self.records.read().await.contains_key(&setting.uuid);
        if !exists {
            return Err(StoreError::Missing(setting.uuid.to_string()));
        }
        self.pending.insert(setting.uuid, setting.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { records, pending } = *self;
        if pending.is_empty() {
            return Ok(());
        }

        let mut records = records.write().await;
        let mut next = records.clone();
        for (uuid, setting) in pending {
            if !next.contains_key(&uuid) {
                return Err(StoreError::Missing(uuid.to_string()));
            }
            next.insert(uuid, setting);
        }

        {
            let mut seen = HashSet::new();
            for setting in next.values() {
                if !seen.insert(setting.key.as_str()) {
                    return Err(StoreError::UniqueViolation(setting.key.clone()));
                }
            }
        }

        *records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_rejects_duplicate_keys() {
        let store = MemorySettingsStore::new();
        store.insert(AlmSetting::github("gh1", "https://a", "1", "pk")).await.unwrap();
        let err = store
            .insert(AlmSetting::github("gh1", "https://b", "2", "pk"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(k) if k == "gh1"));
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemorySettingsStore::new();
        let setting = AlmSetting::github("gh1", "https://a", "1", "pk");
        store.insert(setting.clone()).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut changed = setting.clone();
            changed.url = "https://changed".to_string();
            tx.update(&changed).await.unwrap();
            // dropped without commit
        }

        assert_eq!(store.get("gh1").await.unwrap().url, "https://a");
    }

    #[tokio::test]
    async fn transaction_sees_its_own_rename() {
        let store = MemorySettingsStore::new();
        let setting = AlmSetting::github("gh1", "https://a", "1", "pk");
        store.insert(setting.clone()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut renamed = setting.clone();
        renamed.key = "gh2".to_string();
        tx.update(&renamed).await.unwrap();

        assert!(tx.select_by_key("gh1").await.unwrap().is_none());
        assert_eq!(tx.select_by_key("gh2").await.unwrap().unwrap().uuid, setting.uuid);
        tx.commit().await.unwrap();

        assert!(store.get("gh1").await.is_none());
        assert!(store.get("gh2").await.is_some());
    }

    #[tokio::test]
    async fn commit_enforces_unique_keys_against_concurrent_insert() {
        let store = MemorySettingsStore::new();
        let setting = AlmSetting::github("gh1", "https://a", "1", "pk");
        store.insert(setting.clone()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.select_by_key("gh2").await.unwrap().is_none());

        // Lands between the lookup and the commit
        store.insert(AlmSetting::github("gh2", "https://b", "2", "pk")).await.unwrap();

        let mut renamed = setting.clone();
        renamed.key = "gh2".to_string();
        tx.update(&renamed).await.unwrap();
        let err = tx.commit().await.unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation(k) if k == "gh2"));
        assert_eq!(store.get("gh1").await.unwrap(), setting);
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails() {
        let store = MemorySettingsStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .update(&AlmSetting::github("ghost", "https://a", "1", "pk"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn loads_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"[
                {"key": "gh1", "url": "https://api.github.com", "app_id": "12", "private_key": "pk1"},
                {"key": "bb1", "alm": "bitbucket", "url": "https://bitbucket.org", "app_id": "x", "private_key": "pk2"}
            ]"#,
        )
        .unwrap();

        let store = MemorySettingsStore::new();
        assert_eq!(store.load_seed_file(&path).await.unwrap(), 2);

        let keys: Vec<String> = store.list().await.into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["bb1", "gh1"]);
        assert_eq!(store.get("bb1").await.unwrap().alm, Alm::Bitbucket);
    }
}
