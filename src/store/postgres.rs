use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{NewWaterLog, SettingsPatch, UserSettings, WaterLogEntry};

use super::{LogStore, SettingsStore, StoreError};

const LOG_COLUMNS: &str = "id, owner_id, soil_moisture, light_intensity, temperature, humidity, \
                           source, condition, observed_at, created_at";

const SETTINGS_COLUMNS: &str = "owner_id, moisture_threshold, light_threshold, channel_id, \
                                read_api_key, write_api_key, log_clear_cutoff, created_at, \
                                updated_at";

/// Postgres-backed gateway. Cheap to clone; shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LogStore for PgStore {
    async fn list_recent(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WaterLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, WaterLogEntry>(&format!(
            "SELECT {LOG_COLUMNS} FROM water_logs \
             WHERE owner_id = $1 \
             ORDER BY observed_at DESC, created_at DESC \
             LIMIT $2"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_last(&self, owner_id: Uuid) -> Result<Option<WaterLogEntry>, StoreError> {
        let row = sqlx::query_as::<_, WaterLogEntry>(&format!(
            "SELECT {LOG_COLUMNS} FROM water_logs \
             WHERE owner_id = $1 \
             ORDER BY observed_at DESC, created_at DESC \
             LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_batch(
        &self,
        owner_id: Uuid,
        entries: Vec<NewWaterLog>,
    ) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for e in entries {
            let result = sqlx::query(
                "INSERT INTO water_logs \
                     (owner_id, soil_moisture, light_intensity, temperature, humidity, \
                      source, condition, observed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (owner_id, observed_at) DO NOTHING",
            )
            .bind(owner_id)
            .bind(e.soil_moisture)
            .bind(e.light_intensity)
            .bind(e.temperature)
            .bind(e.humidity)
            .bind(e.source)
            .bind(e.condition)
            .bind(e.observed_at)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_one(
        &self,
        owner_id: Uuid,
        entry: NewWaterLog,
    ) -> Result<WaterLogEntry, StoreError> {
        // RETURNING yields nothing when the unique index swallows the insert;
        // fall back to reading the row that already owns this sample instant.
        let inserted = sqlx::query_as::<_, WaterLogEntry>(&format!(
            "INSERT INTO water_logs \
                 (owner_id, soil_moisture, light_intensity, temperature, humidity, \
                  source, condition, observed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (owner_id, observed_at) DO NOTHING \
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(entry.soil_moisture)
        .bind(entry.light_intensity)
        .bind(entry.temperature)
        .bind(entry.humidity)
        .bind(entry.source)
        .bind(entry.condition)
        .bind(entry.observed_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        let existing = sqlx::query_as::<_, WaterLogEntry>(&format!(
            "SELECT {LOG_COLUMNS} FROM water_logs \
             WHERE owner_id = $1 AND observed_at = $2"
        ))
        .bind(owner_id)
        .bind(entry.observed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(existing)
    }

    async fn delete_all(&self, owner_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM water_logs WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_except(&self, owner_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM water_logs WHERE owner_id = $1 AND id <> ALL($2)")
            .bind(owner_id)
            .bind(keep.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl SettingsStore for PgStore {
    async fn get_or_create(&self, owner_id: Uuid) -> Result<UserSettings, StoreError> {
        // Insert-if-absent, then read: the default row is persisted exactly
        // once per owner regardless of how many concurrent readers race here.
        sqlx::query("INSERT INTO user_settings (owner_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query_as::<_, UserSettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn apply_patch(
        &self,
        owner_id: Uuid,
        patch: SettingsPatch,
    ) -> Result<UserSettings, StoreError> {
        self.get_or_create(owner_id).await?;

        let row = sqlx::query_as::<_, UserSettings>(&format!(
            "UPDATE user_settings SET \
                 moisture_threshold = COALESCE($2, moisture_threshold), \
                 light_threshold    = COALESCE($3, light_threshold), \
                 channel_id         = COALESCE($4, channel_id), \
                 read_api_key       = COALESCE($5, read_api_key), \
                 write_api_key      = COALESCE($6, write_api_key), \
                 updated_at         = now() \
             WHERE owner_id = $1 \
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(patch.moisture_threshold)
        .bind(patch.light_threshold)
        .bind(patch.channel_id)
        .bind(patch.read_api_key)
        .bind(patch.write_api_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_clear_cutoff(
        &self,
        owner_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.get_or_create(owner_id).await?;

        sqlx::query(
            "UPDATE user_settings SET log_clear_cutoff = $2, updated_at = now() \
             WHERE owner_id = $1",
        )
        .bind(owner_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
