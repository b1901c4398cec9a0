use crate::core::error::{Result, TrackerError};
use crate::core::models::{
    Category, CategoryDraft, CategoryId, LogEntry, LogId, PricedLog, Settings, SettingsUpdate,
};
use crate::core::store::{Session, TrackerStore};
use crate::store::{default_habits, ensure_unique_name, ensure_unreferenced};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

const CATEGORIES: &str = "categories";
const LOGS: &str = "logs";
const SETTINGS: &str = "settings";
const META: &str = "meta";

fn id_key(id: i64) -> [u8; 8] {
    (id as u64).to_be_bytes()
}

fn decode_all<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>> {
    partition
        .iter()
        .map(|item| {
            let (_, value) = item?;
            Ok(serde_json::from_slice(&value)?)
        })
        .collect()
}

fn decode_one<T: DeserializeOwned>(partition: &PartitionHandle, key: &[u8]) -> Result<Option<T>> {
    match partition.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
        None => Ok(None),
    }
}

/// Persistent single-user store on a fjall keyspace.
///
/// Ids are big-endian keys, so the last key in a partition is the highest id.
/// The next id of each partition is kept in `meta` so deleted ids are never handed out again.
pub struct LocalStore {
    keyspace: Keyspace,
    categories: PartitionHandle,
    logs: PartitionHandle,
    settings: PartitionHandle,
    meta: PartitionHandle,
    // Held across id allocation and the write that consumes the id.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        let categories = keyspace.open_partition(CATEGORIES, PartitionCreateOptions::default())?;
        let logs = keyspace.open_partition(LOGS, PartitionCreateOptions::default())?;
        let settings = keyspace.open_partition(SETTINGS, PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition(META, PartitionCreateOptions::default())?;
        debug!("Opened local store at {}", path.display());
        Ok(Self {
            keyspace,
            categories,
            logs,
            settings,
            meta,
            write_lock: Mutex::new(()),
        })
    }

    /// Adds the default habits when the store has none. Returns how many were added.
    pub async fn seed_default_habits(&self) -> Result<usize> {
        if !self.categories.is_empty()? {
            return Ok(0);
        }
        let mut added = 0;
        for draft in default_habits() {
            self.add_category(draft).await?;
            added += 1;
        }
        info!(added, "Seeded default habits");
        Ok(added)
    }

    fn decode_id(key: &[u8]) -> Result<i64> {
        let bytes = <[u8; 8]>::try_from(key)
            .map_err(|_| TrackerError::Corrupt(format!("{}-byte id", key.len())))?;
        Ok(u64::from_be_bytes(bytes) as i64)
    }

    /// Reserves the next id for `partition`. Must be called with `write_lock` held; the
    /// counter is persisted together with the record that consumes the id.
    fn next_id(&self, name: &str, partition: &PartitionHandle) -> Result<i64> {
        let counter = match self.meta.get(name.as_bytes())? {
            Some(value) => Self::decode_id(&value[..])?,
            None => 1,
        };
        let after_last = match partition.last_key_value()? {
            Some((key, _)) => Self::decode_id(&key[..])? + 1,
            None => 1,
        };
        let id = counter.max(after_last);
        self.meta.insert(name.as_bytes(), &id_key(id + 1)[..])?;
        Ok(id)
    }

    fn put<T: Serialize>(
        &self,
        partition: &PartitionHandle,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        partition.insert(key, serde_json::to_vec(value)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn remove(&self, partition: &PartitionHandle, key: &[u8]) -> Result<()> {
        partition.remove(key)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn owned_log(&self, session: &Session, id: LogId) -> Result<LogEntry> {
        decode_one::<LogEntry>(&self.logs, &id_key(id))?
            .filter(|l| l.user_id == session.user_id)
            .ok_or_else(|| TrackerError::not_found(format!("activity with id {id}")))
    }
}

#[async_trait]
impl TrackerStore for LocalStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        decode_all(&self.categories)
    }

    async fn add_category(&self, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let _guard = self.write_lock.lock().await;
        let existing: Vec<Category> = decode_all(&self.categories)?;
        ensure_unique_name(&existing, &draft, None)?;
        let id = self.next_id(CATEGORIES, &self.categories)?;
        let category = draft.into_category(id);
        self.put(&self.categories, &id_key(id), &category)?;
        debug!(id, name = %category.name, "Stored habit");
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let _guard = self.write_lock.lock().await;
        let existing: Vec<Category> = decode_all(&self.categories)?;
        if !existing.iter().any(|c| c.id == id) {
            return Err(TrackerError::not_found(format!("habit with id {id}")));
        }
        ensure_unique_name(&existing, &draft, Some(id))?;
        let category = draft.into_category(id);
        self.put(&self.categories, &id_key(id), &category)?;
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.categories.contains_key(id_key(id))? {
            return Err(TrackerError::not_found(format!("habit with id {id}")));
        }
        let logs: Vec<LogEntry> = decode_all(&self.logs)?;
        ensure_unreferenced(&logs, id)?;
        self.remove(&self.categories, &id_key(id))
    }

    async fn list_logs(&self, session: &Session) -> Result<Vec<LogEntry>> {
        let logs: Vec<LogEntry> = decode_all(&self.logs)?;
        Ok(logs
            .into_iter()
            .filter(|l| l.user_id == session.user_id)
            .collect())
    }

    async fn get_log(&self, session: &Session, id: LogId) -> Result<LogEntry> {
        self.owned_log(session, id)
    }

    async fn insert_log(&self, session: &Session, log: PricedLog) -> Result<LogEntry> {
        let _guard = self.write_lock.lock().await;
        let id = self.next_id(LOGS, &self.logs)?;
        let entry = log.into_entry(id, &session.user_id);
        self.put(&self.logs, &id_key(id), &entry)?;
        debug!(id, value = %entry.value, "Stored activity");
        Ok(entry)
    }

    async fn update_log(&self, session: &Session, id: LogId, log: PricedLog) -> Result<LogEntry> {
        let _guard = self.write_lock.lock().await;
        self.owned_log(session, id)?;
        let entry = log.into_entry(id, &session.user_id);
        self.put(&self.logs, &id_key(id), &entry)?;
        Ok(entry)
    }

    async fn delete_log(&self, session: &Session, id: LogId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.owned_log(session, id)?;
        self.remove(&self.logs, &id_key(id))
    }

    async fn get_settings(&self, session: &Session) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;
        let key = session.user_id.as_bytes();
        if let Some(settings) = decode_one(&self.settings, key)? {
            return Ok(settings);
        }
        let settings = Settings::defaults_for(&session.user_id);
        self.put(&self.settings, key, &settings)?;
        debug!(user_id = %session.user_id, "Created default settings");
        Ok(settings)
    }

    async fn upsert_settings(&self, session: &Session, update: SettingsUpdate) -> Result<Settings> {
        update.validate()?;
        let _guard = self.write_lock.lock().await;
        let key = session.user_id.as_bytes();
        let mut settings = decode_one(&self.settings, key)?
            .unwrap_or_else(|| Settings::defaults_for(&session.user_id));
        settings.apply(&update);
        self.put(&self.settings, key, &settings)?;
        Ok(settings)
    }
}
