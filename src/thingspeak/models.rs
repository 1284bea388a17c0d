use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Payload of `GET /channels/{id}/feeds.json`.
///
/// ThingSpeak sends every field as a string (or null); channel metadata in the
/// response is ignored.
#[derive(Debug, Deserialize)]
pub struct FeedsResponse {
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

/// One raw feed sample. Field mapping for the plant channel:
/// field1 = soil moisture, field2 = light intensity, field3 = temperature,
/// field4 = humidity, field5 = pump state, field6 = manual trigger flag.
#[derive(Debug, Default, Deserialize)]
pub struct FeedEntry {
    pub created_at: Option<String>,
    pub field1: Option<String>,
    pub field2: Option<String>,
    pub field3: Option<String>,
    pub field4: Option<String>,
    pub field5: Option<String>,
    pub field6: Option<String>,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A normalized, timestamped telemetry sample. Transient: it is the input to
/// log reconciliation and the live-reading view, never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub temperature: f64,
    pub humidity: f64,
    /// 1 while the pump is running, otherwise 0.
    pub pump_state: i64,
    /// field6: set to 1 when a manual watering command was issued.
    pub manual_trigger: i64,
    pub observed_at: DateTime<Utc>,
}

impl FeedEntry {
    /// Normalize into a `Reading`.
    ///
    /// Returns `None` when `created_at` is missing or unparseable — a sample
    /// without a usable timestamp cannot be ordered and is dropped before
    /// reconciliation. Missing or empty numeric fields coerce to 0.
    pub fn into_reading(self) -> Option<Reading> {
        let observed_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))?;

        Some(Reading {
            soil_moisture: numeric(&self.field1),
            light_intensity: numeric(&self.field2),
            temperature: numeric(&self.field3),
            humidity: numeric(&self.field4),
            pump_state: flag(&self.field5),
            manual_trigger: flag(&self.field6),
            observed_at,
        })
    }
}

fn numeric(field: &Option<String>) -> f64 {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

// A flag field counts as set only when it is exactly 1; fractional or other
// values read as unset rather than being rounded up.
fn flag(field: &Option<String>) -> i64 {
    if numeric(field) == 1.0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: Option<&str>, field5: Option<&str>) -> FeedEntry {
        FeedEntry {
            created_at: created_at.map(str::to_owned),
            field1: Some("650".to_owned()),
            field2: Some("320.5".to_owned()),
            field3: Some("21.4".to_owned()),
            field4: Some("55".to_owned()),
            field5: field5.map(str::to_owned),
            field6: None,
        }
    }

    #[test]
    fn full_entry_normalizes() {
        let r = entry(Some("2024-05-01T10:00:00Z"), Some("1"))
            .into_reading()
            .unwrap();
        assert_eq!(r.soil_moisture, 650.0);
        assert_eq!(r.light_intensity, 320.5);
        assert_eq!(r.temperature, 21.4);
        assert_eq!(r.humidity, 55.0);
        assert_eq!(r.pump_state, 1);
        assert_eq!(r.manual_trigger, 0);
        assert_eq!(r.observed_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn missing_timestamp_drops_entry() {
        assert!(entry(None, Some("1")).into_reading().is_none());
    }

    #[test]
    fn unparseable_timestamp_drops_entry() {
        assert!(entry(Some("yesterday-ish"), Some("1")).into_reading().is_none());
    }

    #[test]
    fn missing_fields_coerce_to_zero() {
        let r = FeedEntry {
            created_at: Some("2024-05-01T10:00:00Z".to_owned()),
            ..FeedEntry::default()
        }
        .into_reading()
        .unwrap();
        assert_eq!(r.soil_moisture, 0.0);
        assert_eq!(r.pump_state, 0);
    }

    #[test]
    fn non_numeric_field_coerces_to_zero() {
        let mut e = entry(Some("2024-05-01T10:00:00Z"), Some("on"));
        e.field1 = Some("n/a".to_owned());
        let r = e.into_reading().unwrap();
        assert_eq!(r.soil_moisture, 0.0);
        assert_eq!(r.pump_state, 0);
    }

    #[test]
    fn pump_flag_requires_exactly_one() {
        for (raw, expected) in [("1", 1), ("1.0", 1), ("0.6", 0), ("2", 0), ("0", 0)] {
            let r = entry(Some("2024-05-01T10:00:00Z"), Some(raw))
                .into_reading()
                .unwrap();
            assert_eq!(r.pump_state, expected, "field5 = {raw:?}");
        }
    }

    #[test]
    fn feeds_payload_without_feeds_key_is_empty() {
        let resp: FeedsResponse = serde_json::from_str(r#"{"channel":{"id":1}}"#).unwrap();
        assert!(resp.feeds.is_empty());
    }

    #[test]
    fn feeds_payload_parses_thingspeak_shape() {
        let resp: FeedsResponse = serde_json::from_str(
            r#"{
                "channel": {"id": 123, "name": "plant"},
                "feeds": [
                    {"created_at": "2024-05-01T10:00:00Z", "entry_id": 1,
                     "field1": "850", "field5": "1"},
                    {"created_at": null, "entry_id": 2, "field1": "300"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(resp.feeds.len(), 2);
        let readings: Vec<_> = resp
            .feeds
            .into_iter()
            .filter_map(FeedEntry::into_reading)
            .collect();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].soil_moisture, 850.0);
    }
}
