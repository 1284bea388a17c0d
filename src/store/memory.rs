//! In-memory gateway used by unit tests. Mirrors the Postgres semantics that
//! matter to sync: newest-first ordering, the `(owner, observed_at)` unique
//! constraint, and get-or-create settings.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{NewWaterLog, SettingsPatch, UserSettings, WaterLogEntry};

use super::{LogStore, SettingsStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    logs: Mutex<Vec<WaterLogEntry>>,
    settings: Mutex<HashMap<Uuid, UserSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_for_owner(&self, owner_id: Uuid) -> Vec<WaterLogEntry> {
        let mut rows: Vec<WaterLogEntry> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.observed_at
                .cmp(&a.observed_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        rows
    }

    fn materialize(owner_id: Uuid, e: NewWaterLog) -> WaterLogEntry {
        WaterLogEntry {
            id: Uuid::new_v4(),
            owner_id,
            soil_moisture: e.soil_moisture,
            light_intensity: e.light_intensity,
            temperature: e.temperature,
            humidity: e.humidity,
            source: e.source,
            condition: e.condition,
            observed_at: e.observed_at,
            created_at: Utc::now(),
        }
    }
}

impl LogStore for MemoryStore {
    async fn list_recent(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WaterLogEntry>, StoreError> {
        Ok(self
            .sorted_for_owner(owner_id)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_last(&self, owner_id: Uuid) -> Result<Option<WaterLogEntry>, StoreError> {
        Ok(self.sorted_for_owner(owner_id).into_iter().next())
    }

    async fn insert_batch(
        &self,
        owner_id: Uuid,
        entries: Vec<NewWaterLog>,
    ) -> Result<u64, StoreError> {
        let mut logs = self.logs.lock().unwrap();
        let mut inserted = 0;
        for e in entries {
            let collides = logs
                .iter()
                .any(|row| row.owner_id == owner_id && row.observed_at == e.observed_at);
            if collides {
                continue;
            }
            logs.push(Self::materialize(owner_id, e));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn insert_one(
        &self,
        owner_id: Uuid,
        entry: NewWaterLog,
    ) -> Result<WaterLogEntry, StoreError> {
        let mut logs = self.logs.lock().unwrap();
        if let Some(existing) = logs
            .iter()
            .find(|row| row.owner_id == owner_id && row.observed_at == entry.observed_at)
        {
            return Ok(existing.clone());
        }
        let row = Self::materialize(owner_id, entry);
        logs.push(row.clone());
        Ok(row)
    }

    async fn delete_all(&self, owner_id: Uuid) -> Result<u64, StoreError> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|e| e.owner_id != owner_id);
        Ok((before - logs.len()) as u64)
    }

    async fn delete_except(&self, owner_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|e| e.owner_id != owner_id || keep.contains(&e.id));
        Ok((before - logs.len()) as u64)
    }
}

impl SettingsStore for MemoryStore {
    async fn get_or_create(&self, owner_id: Uuid) -> Result<UserSettings, StoreError> {
        let mut settings = self.settings.lock().unwrap();
        Ok(settings
            .entry(owner_id)
            .or_insert_with(|| UserSettings::with_defaults(owner_id))
            .clone())
    }

    async fn apply_patch(
        &self,
        owner_id: Uuid,
        patch: SettingsPatch,
    ) -> Result<UserSettings, StoreError> {
        let mut settings = self.settings.lock().unwrap();
        let row = settings
            .entry(owner_id)
            .or_insert_with(|| UserSettings::with_defaults(owner_id));
        if let Some(v) = patch.moisture_threshold {
            row.moisture_threshold = v;
        }
        if let Some(v) = patch.light_threshold {
            row.light_threshold = v;
        }
        if let Some(v) = patch.channel_id {
            row.channel_id = Some(v);
        }
        if let Some(v) = patch.read_api_key {
            row.read_api_key = Some(v);
        }
        if let Some(v) = patch.write_api_key {
            row.write_api_key = Some(v);
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn set_clear_cutoff(
        &self,
        owner_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut settings = self.settings.lock().unwrap();
        let row = settings
            .entry(owner_id)
            .or_insert_with(|| UserSettings::with_defaults(owner_id));
        row.log_clear_cutoff = Some(cutoff);
        row.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::models::LogSource;

    fn new_log(observed_at: DateTime<Utc>) -> NewWaterLog {
        NewWaterLog {
            soil_moisture: 600.0,
            light_intensity: 300.0,
            temperature: 21.0,
            humidity: 50.0,
            source: LogSource::Test,
            condition: None,
            observed_at,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .insert_batch(owner, vec![new_log(at(0)), new_log(at(10)), new_log(at(5))])
            .await
            .unwrap();

        let rows = store.list_recent(owner, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].observed_at, at(10));
        assert_eq!(rows[1].observed_at, at(5));
    }

    #[tokio::test]
    async fn insert_batch_skips_duplicate_observed_at() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        assert_eq!(
            store
                .insert_batch(owner, vec![new_log(at(0)), new_log(at(0))])
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.insert_batch(owner, vec![new_log(at(0))]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_one_returns_existing_row_on_duplicate_observed_at() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        // A repeated manual watering built from the same provider sample must
        // yield the first row, not a second one.
        let first = store.insert_one(owner, new_log(at(0))).await.unwrap();
        let second = store.insert_one(owner, new_log(at(0))).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(store.list_recent(owner, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_except_keeps_only_named_ids() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .insert_batch(owner, vec![new_log(at(0)), new_log(at(1)), new_log(at(2))])
            .await
            .unwrap();
        let keep: Vec<Uuid> = store
            .list_recent(owner, 1)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(store.delete_except(owner, &keep).await.unwrap(), 2);
        let rows = store.list_recent(owner, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, keep[0]);
    }

    #[tokio::test]
    async fn stores_are_scoped_per_owner() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.insert_batch(a, vec![new_log(at(0))]).await.unwrap();
        store.insert_batch(b, vec![new_log(at(0))]).await.unwrap();

        assert_eq!(store.delete_all(a).await.unwrap(), 1);
        assert_eq!(store.list_recent(b, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_or_create_persists_defaults_once() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = store.get_or_create(owner).await.unwrap();
        let second = store.get_or_create(owner).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.moisture_threshold, 30.0);
        assert_eq!(second.light_threshold, 400.0);
    }

    #[tokio::test]
    async fn apply_patch_changes_only_supplied_fields() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let patched = store
            .apply_patch(
                owner,
                SettingsPatch {
                    channel_id: Some("123456".to_owned()),
                    ..SettingsPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.channel_id.as_deref(), Some("123456"));
        assert_eq!(patched.moisture_threshold, 30.0);
    }
}
