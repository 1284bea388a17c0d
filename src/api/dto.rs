use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::models::{Condition, LogSource, UserSettings, WaterLogEntry},
    thingspeak::models::Reading,
    watering::ReadingOverride,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct WaterLogDto {
    pub id: Uuid,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub source: LogSource,
    pub condition: Option<Condition>,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<WaterLogEntry> for WaterLogDto {
    fn from(e: WaterLogEntry) -> Self {
        Self {
            id: e.id,
            soil_moisture: e.soil_moisture,
            light_intensity: e.light_intensity,
            temperature: e.temperature,
            humidity: e.humidity,
            source: e.source,
            condition: e.condition,
            observed_at: e.observed_at,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsDto {
    pub moisture_threshold: f64,
    pub light_threshold: f64,
    pub channel_id: Option<String>,
    pub read_api_key: Option<String>,
    pub write_api_key: Option<String>,
    pub log_clear_cutoff: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserSettings> for SettingsDto {
    fn from(s: UserSettings) -> Self {
        Self {
            moisture_threshold: s.moisture_threshold,
            light_threshold: s.light_threshold,
            channel_id: s.channel_id,
            read_api_key: s.read_api_key,
            write_api_key: s.write_api_key,
            log_clear_cutoff: s.log_clear_cutoff,
            updated_at: s.updated_at,
        }
    }
}

/// Response for `POST /thingspeak/sync`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Newest fetched reading, for display. `null` when the channel is empty.
    pub live_reading: Option<Reading>,
    /// Log rows inserted by this refresh.
    pub synced_count: u64,
}

/// Response for `DELETE /logs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearLogsResponse {
    pub removed: u64,
    /// New clear cutoff; sync never resurrects readings at or before it.
    pub cleared_at: DateTime<Utc>,
}

/// Request body for `POST /water/manual`. An empty body (or omitted
/// `reading`) logs the latest provider sample instead.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ManualWaterRequest {
    pub reading: Option<ReadingOverride>,
}

/// Response for `POST /water/manual`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ManualWaterResponse {
    pub log: WaterLogDto,
    /// Feed entry id returned by ThingSpeak when the manual command was sent.
    pub provider_entry_id: Option<i64>,
}
