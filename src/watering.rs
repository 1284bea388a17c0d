//! Manual watering: a single user-initiated log entry, created outside the
//! reconciliation filters.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    condition::classify_moisture,
    db::models::{LogSource, NewWaterLog},
    thingspeak::models::Reading,
};

/// Caller-supplied sensor values for a manual watering log, used instead of
/// fetching the latest provider sample.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReadingOverride {
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub temperature: f64,
    pub humidity: f64,
    /// Defaults to the current time when omitted.
    pub observed_at: Option<DateTime<Utc>>,
}

impl ReadingOverride {
    /// Reject values that cannot have come from the sensors.
    pub fn validate(&self) -> Result<(), String> {
        let named = [
            ("soil_moisture", self.soil_moisture),
            ("light_intensity", self.light_intensity),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite number"));
            }
        }
        for (name, value) in [
            ("soil_moisture", self.soil_moisture),
            ("light_intensity", self.light_intensity),
            ("humidity", self.humidity),
        ] {
            if value < 0.0 {
                return Err(format!("{name} must not be negative"));
            }
        }
        Ok(())
    }

    pub fn into_reading(self) -> Reading {
        Reading {
            soil_moisture: self.soil_moisture,
            light_intensity: self.light_intensity,
            temperature: self.temperature,
            humidity: self.humidity,
            pump_state: 1,
            manual_trigger: 1,
            observed_at: self.observed_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Build the `source = manual` log row for a reading. The condition label is
/// computed the same way as for automatic rows.
pub fn manual_entry(reading: &Reading) -> NewWaterLog {
    NewWaterLog {
        soil_moisture: reading.soil_moisture,
        light_intensity: reading.light_intensity,
        temperature: reading.temperature,
        humidity: reading.humidity,
        source: LogSource::Manual,
        condition: Some(classify_moisture(reading.soil_moisture)),
        observed_at: reading.observed_at,
    }
}
