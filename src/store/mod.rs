//! Persistence boundary for watering logs and per-owner settings.
//!
//! Sync and trimming depend only on these traits; the backing storage is an
//! implementation detail (`PgStore` in production, `MemoryStore` in tests).

pub mod postgres;

#[cfg(test)]
pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{NewWaterLog, SettingsPatch, UserSettings, WaterLogEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Gateway over the watering-log table.
#[allow(async_fn_in_trait)]
pub trait LogStore: Send + Sync {
    /// Newest-first (by `observed_at`, ties by insertion order), at most
    /// `limit` rows.
    async fn list_recent(&self, owner_id: Uuid, limit: i64)
        -> Result<Vec<WaterLogEntry>, StoreError>;

    /// The owner's newest entry, or `None` when no log exists yet.
    async fn find_last(&self, owner_id: Uuid) -> Result<Option<WaterLogEntry>, StoreError>;

    /// Insert a batch; rows colliding with an existing `(owner, observed_at)`
    /// are skipped silently. Returns the number of rows actually inserted.
    /// A mid-batch failure leaves earlier rows committed.
    async fn insert_batch(&self, owner_id: Uuid, entries: Vec<NewWaterLog>)
        -> Result<u64, StoreError>;

    /// Insert a single entry and return the stored row. When a row with the
    /// same `(owner, observed_at)` already exists — e.g. a repeated manual
    /// log built from the same provider sample — the existing row is
    /// returned unchanged.
    async fn insert_one(&self, owner_id: Uuid, entry: NewWaterLog)
        -> Result<WaterLogEntry, StoreError>;

    /// Delete every entry for the owner; returns the number removed.
    async fn delete_all(&self, owner_id: Uuid) -> Result<u64, StoreError>;

    /// Delete every entry for the owner except the ids in `keep`; returns the
    /// number removed.
    async fn delete_except(&self, owner_id: Uuid, keep: &[Uuid]) -> Result<u64, StoreError>;
}

/// Gateway over the per-owner settings row.
#[allow(async_fn_in_trait)]
pub trait SettingsStore: Send + Sync {
    /// Read the owner's settings, persisting the documented default row the
    /// first time around. Exactly one row ever exists per owner.
    async fn get_or_create(&self, owner_id: Uuid) -> Result<UserSettings, StoreError>;

    /// Apply a partial update (unset fields keep their value) and return the
    /// resulting row, creating the default row first if absent.
    async fn apply_patch(&self, owner_id: Uuid, patch: SettingsPatch)
        -> Result<UserSettings, StoreError>;

    /// Record the instant of a full log clear. Sync treats this as a
    /// low-water mark and never re-inserts readings at or before it.
    async fn set_clear_cutoff(&self, owner_id: Uuid, cutoff: DateTime<Utc>)
        -> Result<(), StoreError>;
}
