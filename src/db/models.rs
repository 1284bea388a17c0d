use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Default moisture threshold for a freshly created settings row.
pub const DEFAULT_MOISTURE_THRESHOLD: f64 = 30.0;
/// Default light threshold for a freshly created settings row.
pub const DEFAULT_LIGHT_THRESHOLD: f64 = 400.0;

// ---------------------------------------------------------------------------
// LogSource
// ---------------------------------------------------------------------------

/// Mirrors the `log_source` Postgres enum: how a watering log row came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "log_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Reconciled from the provider feed (pump was on).
    Automatic,
    /// Created by the user through the manual watering action.
    Manual,
    /// Fixture rows, never produced by normal operation.
    Test,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSource::Automatic => "automatic",
            LogSource::Manual => "manual",
            LogSource::Test => "test",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Mirrors the `plant_condition` Postgres enum — the qualitative label
/// derived from a soil-moisture value (see `condition::classify_moisture`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plant_condition", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Dry,
    Wet,
    Good,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Condition::Dry => "dry",
            Condition::Wet => "wet",
            Condition::Good => "good",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// WaterLogEntry
// ---------------------------------------------------------------------------

/// A durable watering-log row. Immutable after creation; rows disappear only
/// through a full clear or retention trimming.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaterLogEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub source: LogSource,
    pub condition: Option<Condition>,
    /// When the provider sampled the reading. Ordering key for recency and
    /// retention; unique per owner.
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a watering-log row; `id`/`created_at` are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewWaterLog {
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub source: LogSource,
    pub condition: Option<Condition>,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// UserSettings
// ---------------------------------------------------------------------------

/// Per-owner settings row (zero or one per owner, created on first read).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSettings {
    pub owner_id: Uuid,
    pub moisture_threshold: f64,
    pub light_threshold: f64,
    pub channel_id: Option<String>,
    pub read_api_key: Option<String>,
    pub write_api_key: Option<String>,
    /// Instant of the last full log clear. Sync never re-inserts readings at
    /// or before this mark.
    pub log_clear_cutoff: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// The default row persisted when an owner reads settings for the first
    /// time.
    pub fn with_defaults(owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            moisture_threshold: DEFAULT_MOISTURE_THRESHOLD,
            light_threshold: DEFAULT_LIGHT_THRESHOLD,
            channel_id: None,
            read_api_key: None,
            write_api_key: None,
            log_clear_cutoff: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial settings update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SettingsPatch {
    pub moisture_threshold: Option<f64>,
    pub light_threshold: Option<f64>,
    pub channel_id: Option<String>,
    pub read_api_key: Option<String>,
    pub write_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_documented_table() {
        let s = UserSettings::with_defaults(Uuid::new_v4());
        assert_eq!(s.moisture_threshold, 30.0);
        assert_eq!(s.light_threshold, 400.0);
        assert!(s.channel_id.is_none());
        assert!(s.read_api_key.is_none());
        assert!(s.write_api_key.is_none());
        assert!(s.log_clear_cutoff.is_none());
    }

    #[test]
    fn log_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogSource::Automatic).unwrap(), "\"automatic\"");
        assert_eq!(serde_json::to_string(&LogSource::Manual).unwrap(), "\"manual\"");
        assert_eq!(LogSource::Test.to_string(), "test");
    }

    #[test]
    fn condition_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Condition::Dry).unwrap(), "\"dry\"");
        assert_eq!(Condition::Good.to_string(), "good");
    }
}
