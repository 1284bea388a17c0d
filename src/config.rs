use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Connection pool size for the Postgres store.
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// ThingSpeak API base, e.g. `https://api.thingspeak.com`.
    pub thingspeak_base_url: String,
    /// How many samples a sync fetches from the feed (`results=N`).
    pub sync_fetch_count: u32,
    /// Maximum watering-log rows retained per owner after trimming.
    pub retention_cap: usize,
    /// Whether a manual watering log also trims the owner's logs to the cap.
    pub trim_after_manual: bool,
    /// Whether a manual watering log sends `field6=1` to ThingSpeak.
    pub manual_water_command: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", "10")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            thingspeak_base_url: optional("THINGSPEAK_BASE_URL", "https://api.thingspeak.com"),
            sync_fetch_count: optional("SYNC_FETCH_COUNT", "100")
                .parse()
                .context("SYNC_FETCH_COUNT must be a positive integer")?,
            retention_cap: optional("RETENTION_CAP", "5")
                .parse()
                .context("RETENTION_CAP must be a positive integer")?,
            trim_after_manual: parse_bool(&optional("TRIM_AFTER_MANUAL", "false"))
                .context("TRIM_AFTER_MANUAL must be a boolean")?,
            manual_water_command: parse_bool(&optional("MANUAL_WATER_COMMAND", "true"))
                .context("MANUAL_WATER_COMMAND must be a boolean")?,
        })
    }
}

/// Accepts the usual env-var spellings of a boolean.
fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_truthy_spellings() {
        for raw in ["1", "true", "TRUE", "yes", "On"] {
            assert!(parse_bool(raw).unwrap(), "{raw:?} should parse as true");
        }
    }

    #[test]
    fn parse_bool_falsy_spellings() {
        for raw in ["0", "false", "No", "off", " FALSE "] {
            assert!(!parse_bool(raw).unwrap(), "{raw:?} should parse as false");
        }
    }

    #[test]
    fn parse_bool_garbage_errors() {
        let err = parse_bool("maybe").unwrap_err();
        assert!(err.to_string().contains("not a boolean"));
    }
}
