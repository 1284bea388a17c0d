use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;

use super::{
    dto::{
        ClearLogsResponse, ManualWaterRequest, ManualWaterResponse, RefreshResponse, SettingsDto,
        WaterLogDto,
    },
    errors::AppError,
    owner::OwnerId,
    AppState,
};
use crate::{
    db::models::{Condition, LogSource, SettingsPatch, UserSettings},
    store::{LogStore, SettingsStore},
    sync,
    thingspeak::models::Reading,
    thingspeak::ProviderError,
    watering::{self, ReadingOverride},
};

/// Channel id and read key, both required before any feed call.
fn feed_config(settings: &UserSettings) -> Result<(&str, &str), AppError> {
    match (settings.channel_id.as_deref(), settings.read_api_key.as_deref()) {
        (Some(channel), Some(key)) if !channel.is_empty() && !key.is_empty() => Ok((channel, key)),
        _ => Err(AppError::Configuration(
            "ThingSpeak channel ID and read API key must be set in settings".to_owned(),
        )),
    }
}

fn write_key(settings: &UserSettings) -> Result<&str, AppError> {
    settings
        .write_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            AppError::Configuration(
                "ThingSpeak write API key must be set in settings".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// The owner's most recent watering logs, newest first, limited to the
/// retention cap.
#[utoipa::path(
    get,
    path = "/logs",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    responses(
        (status = 200, description = "Recent watering logs", body = Vec<WaterLogDto>),
        (status = 401, description = "Missing owner identity"),
    ),
    tag = "logs"
)]
pub async fn get_logs(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<Vec<WaterLogDto>>, AppError> {
    let rows = state
        .store
        .list_recent(owner, state.config.retention_cap as i64)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Clear every watering log for the owner. The clear cutoff is recorded
/// before deletion so a racing or subsequent sync cannot resurrect the
/// deleted history.
#[utoipa::path(
    delete,
    path = "/logs",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    responses(
        (status = 200, description = "Logs cleared", body = ClearLogsResponse),
        (status = 401, description = "Missing owner identity"),
    ),
    tag = "logs"
)]
pub async fn clear_logs(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<ClearLogsResponse>, AppError> {
    let cleared_at = Utc::now();
    state.store.set_clear_cutoff(owner, cleared_at).await?;
    let removed = state.store.delete_all(owner).await?;

    info!(owner_id = %owner, removed, "Watering logs cleared");
    Ok(Json(ClearLogsResponse { removed, cleared_at }))
}

// ---------------------------------------------------------------------------
// ThingSpeak
// ---------------------------------------------------------------------------

/// The channel's newest reading, for live display. Nothing is persisted.
#[utoipa::path(
    get,
    path = "/thingspeak/latest",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    responses(
        (status = 200, description = "Latest reading, or null when the channel is empty", body = Reading),
        (status = 400, description = "Channel id or read key not configured"),
        (status = 502, description = "ThingSpeak unavailable"),
    ),
    tag = "thingspeak"
)]
pub async fn get_latest_reading(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<Option<Reading>>, AppError> {
    let settings = state.store.get_or_create(owner).await?;
    let (channel, key) = feed_config(&settings)?;
    let reading = state.thingspeak.latest_reading(channel, key).await?;
    Ok(Json(reading))
}

/// Refresh: fetch the recent feed window, reconcile it into the watering log,
/// then trim to the retention cap. A trim failure is reported in the server
/// log only — the committed inserts stand.
#[utoipa::path(
    post,
    path = "/thingspeak/sync",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    responses(
        (status = 200, description = "Sync result", body = RefreshResponse),
        (status = 400, description = "Channel id or read key not configured"),
        (status = 502, description = "ThingSpeak unavailable"),
    ),
    tag = "thingspeak"
)]
pub async fn refresh(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<RefreshResponse>, AppError> {
    let settings = state.store.get_or_create(owner).await?;
    let (channel, key) = feed_config(&settings)?;

    let readings = state
        .thingspeak
        .fetch_feeds(channel, key, state.config.sync_fetch_count)
        .await?;

    let synced_count =
        sync::sync_auto_logs(&state.store, owner, &readings, settings.log_clear_cutoff).await?;

    if let Err(e) = sync::trim_to_cap(&state.store, owner, state.config.retention_cap).await {
        tracing::error!(owner_id = %owner, error = %e, "Retention trim failed; synced logs are kept");
    }

    let live_reading = readings.iter().max_by_key(|r| r.observed_at).cloned();
    Ok(Json(RefreshResponse { live_reading, synced_count }))
}

// ---------------------------------------------------------------------------
// Manual watering
// ---------------------------------------------------------------------------

/// Log a manual watering event, bypassing reconciliation. Values come from
/// the request override or, absent one, the latest fetched reading. When the
/// manual command is enabled, `field6=1` is written to the channel afterwards;
/// a ThingSpeak rejection surfaces as 429 but the created log row remains.
#[utoipa::path(
    post,
    path = "/water/manual",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    request_body = ManualWaterRequest,
    responses(
        (status = 201, description = "Manual watering logged", body = ManualWaterResponse),
        (status = 400, description = "Provider settings not configured"),
        (status = 422, description = "Malformed reading override"),
        (status = 429, description = "ThingSpeak rejected the command (rate limit)"),
        (status = 502, description = "ThingSpeak unavailable"),
    ),
    tag = "watering"
)]
pub async fn manual_water(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    body: Option<Json<ManualWaterRequest>>,
) -> Result<(StatusCode, Json<ManualWaterResponse>), AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    if let Some(override_) = &request.reading {
        override_.validate().map_err(AppError::Validation)?;
    }

    let settings = state.store.get_or_create(owner).await?;
    if state.config.manual_water_command {
        write_key(&settings)?;
    }

    let reading = match request.reading {
        Some(override_) => override_.into_reading(),
        None => {
            let (channel, key) = feed_config(&settings)?;
            state
                .thingspeak
                .latest_reading(channel, key)
                .await?
                .ok_or_else(|| {
                    AppError::Provider(ProviderError::Unavailable(
                        "channel has no feed data to log".to_owned(),
                    ))
                })?
        }
    };

    let log = state
        .store
        .insert_one(owner, watering::manual_entry(&reading))
        .await?;
    info!(owner_id = %owner, log_id = %log.id, "Manual watering logged");

    let provider_entry_id = if state.config.manual_water_command {
        let key = write_key(&settings)?;
        Some(state.thingspeak.send_manual_command(key).await?)
    } else {
        None
    };

    if state.config.trim_after_manual {
        if let Err(e) = sync::trim_to_cap(&state.store, owner, state.config.retention_cap).await {
            tracing::error!(owner_id = %owner, error = %e, "Retention trim failed after manual log");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ManualWaterResponse {
            log: log.into(),
            provider_entry_id,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The owner's settings, creating the default row on first read.
#[utoipa::path(
    get,
    path = "/settings",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    responses(
        (status = 200, description = "Owner settings", body = SettingsDto),
        (status = 401, description = "Missing owner identity"),
    ),
    tag = "settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<SettingsDto>, AppError> {
    let settings = state.store.get_or_create(owner).await?;
    Ok(Json(settings.into()))
}

/// Partial settings update; omitted fields keep their current value.
#[utoipa::path(
    put,
    path = "/settings",
    params(("x-owner-id" = String, Header, description = "Authenticated owner id")),
    request_body = SettingsPatch,
    responses(
        (status = 200, description = "Updated settings", body = SettingsDto),
        (status = 422, description = "Malformed threshold value"),
    ),
    tag = "settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsDto>, AppError> {
    for (name, value) in [
        ("moisture_threshold", patch.moisture_threshold),
        ("light_threshold", patch.light_threshold),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(AppError::Validation(format!(
                    "{name} must be a finite, non-negative number"
                )));
            }
        }
    }

    let settings = state.store.apply_patch(owner, patch).await?;
    Ok(Json(settings.into()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_logs,
        clear_logs,
        get_latest_reading,
        refresh,
        manual_water,
        get_settings,
        update_settings,
        health,
    ),
    components(schemas(
        WaterLogDto,
        SettingsDto,
        SettingsPatch,
        RefreshResponse,
        ClearLogsResponse,
        ManualWaterRequest,
        ManualWaterResponse,
        ReadingOverride,
        Reading,
        LogSource,
        Condition,
    )),
    tags(
        (name = "logs",       description = "Watering log endpoints"),
        (name = "thingspeak", description = "Telemetry feed endpoints"),
        (name = "watering",   description = "Manual watering"),
        (name = "settings",   description = "Per-owner settings"),
        (name = "system",     description = "System endpoints"),
    ),
    info(
        title = "Smart Plant Logger API",
        version = "0.1.0",
        description = "REST API for plant telemetry and watering logs"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
