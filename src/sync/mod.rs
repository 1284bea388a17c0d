//! Feed-to-log reconciliation and retention.
//!
//! A refresh is strictly sequential: fetch (done by the caller), reconcile
//! against the owner's log tail, insert the qualifying batch, then trim to
//! the retention cap. Exactly-once behavior rests on the recency and
//! clear-cutoff filters plus the store's `(owner, observed_at)` uniqueness;
//! there is no value-based deduplication.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    condition::classify_moisture,
    db::models::{LogSource, NewWaterLog},
    store::{LogStore, StoreError},
    thingspeak::models::Reading,
};

/// Decide which fetched readings become new automatic log rows.
///
/// Three independent per-reading filters, all required:
/// 1. newer than the newest existing log (`last_logged_at`),
/// 2. newer than the last clear cutoff,
/// 3. sampled while the pump was on.
///
/// Order-independent: each reading is judged on its own timestamp, so an
/// unexpected provider ordering never causes a qualifying sample to be
/// skipped. A timestamp exactly equal to the tail or the cutoff does not
/// qualify.
pub fn plan_auto_logs(
    readings: &[Reading],
    last_logged_at: Option<DateTime<Utc>>,
    clear_cutoff: Option<DateTime<Utc>>,
) -> Vec<NewWaterLog> {
    readings
        .iter()
        .filter(|r| {
            if let Some(last) = last_logged_at {
                if r.observed_at <= last {
                    return false;
                }
            }
            if let Some(cutoff) = clear_cutoff {
                if r.observed_at <= cutoff {
                    return false;
                }
            }
            r.pump_state == 1
        })
        .map(|r| NewWaterLog {
            soil_moisture: r.soil_moisture,
            light_intensity: r.light_intensity,
            temperature: r.temperature,
            humidity: r.humidity,
            source: LogSource::Automatic,
            condition: Some(classify_moisture(r.soil_moisture)),
            observed_at: r.observed_at,
        })
        .collect()
}

/// Reconcile a fetched batch against the owner's log tail and persist the
/// qualifying readings as one batch. Returns the number of rows inserted.
///
/// A store failure mid-batch surfaces as a single error; rows already written
/// stay (a later refresh re-attempts anything still newer than the tail).
pub async fn sync_auto_logs<S: LogStore>(
    store: &S,
    owner_id: Uuid,
    readings: &[Reading],
    clear_cutoff: Option<DateTime<Utc>>,
) -> Result<u64, StoreError> {
    let last_logged_at = store.find_last(owner_id).await?.map(|e| e.observed_at);
    let batch = plan_auto_logs(readings, last_logged_at, clear_cutoff);
    if batch.is_empty() {
        debug!(owner_id = %owner_id, fetched = readings.len(), "No qualifying readings to log");
        return Ok(0);
    }

    let planned = batch.len();
    let inserted = store.insert_batch(owner_id, batch).await?;
    info!(
        owner_id = %owner_id,
        fetched = readings.len(),
        planned,
        inserted,
        "Automatic watering logs synced"
    );
    Ok(inserted)
}

/// Keep only the `cap` most recent log rows for the owner, deleting the rest.
/// Not source-aware: manual and test rows are evicted like any other.
pub async fn trim_to_cap<S: LogStore>(
    store: &S,
    owner_id: Uuid,
    cap: usize,
) -> Result<u64, StoreError> {
    let keep: Vec<Uuid> = store
        .list_recent(owner_id, cap as i64)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    let removed = store.delete_except(owner_id, &keep).await?;
    if removed > 0 {
        debug!(owner_id = %owner_id, removed, cap, "Trimmed watering logs to retention cap");
    }
    Ok(removed)
}
