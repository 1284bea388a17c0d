pub mod models;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::{config::Config, response_store};

use self::models::{FeedEntry, FeedsResponse, Reading};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, error status, or a payload we cannot parse. Never
    /// retried here — retry is a user-initiated re-invocation.
    #[error("ThingSpeak unavailable: {0}")]
    Unavailable(String),
    /// ThingSpeak explicitly refused the write (`0` response body), commonly
    /// its 15-second per-channel rate limit.
    #[error("ThingSpeak rejected the update (likely its 15s rate limit); wait and retry")]
    Rejected,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin ThingSpeak HTTP client. Credentials are per-owner and passed per
/// call; only the base URL is shared.
#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: Client,
    base_url: String,
}

impl ThingSpeakClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.thingspeak_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Fetch the channel's most recent `results` samples, normalized into
    /// `Reading`s in exactly the order the provider supplied them. Entries
    /// without a usable timestamp are dropped.
    pub async fn fetch_feeds(
        &self,
        channel_id: &str,
        read_key: &str,
        results: u32,
    ) -> Result<Vec<Reading>, ProviderError> {
        let url = feeds_url(&self.base_url, channel_id, read_key, results);
        debug!(channel_id = %channel_id, results, "Fetching ThingSpeak feed");

        let bytes = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("feed request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ProviderError::Unavailable(format!("feed endpoint returned error status: {e}")))?
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to read feed response body: {e}")))?;

        response_store::save("feeds", channel_id, &bytes).await;

        let resp: FeedsResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Unavailable(format!("malformed feed payload: {e}")))?;

        let total = resp.feeds.len();
        let readings: Vec<Reading> = resp
            .feeds
            .into_iter()
            .filter_map(FeedEntry::into_reading)
            .collect();
        if readings.len() < total {
            debug!(
                channel_id = %channel_id,
                dropped = total - readings.len(),
                "Dropped feed entries without a usable timestamp"
            );
        }

        Ok(readings)
    }

    /// Fetch only the newest sample, or `None` when the channel has no data.
    pub async fn latest_reading(
        &self,
        channel_id: &str,
        read_key: &str,
    ) -> Result<Option<Reading>, ProviderError> {
        Ok(self.fetch_feeds(channel_id, read_key, 1).await?.into_iter().next())
    }

    /// Signal a manual watering command by writing `field6=1` to the channel.
    ///
    /// Returns the new feed entry id. A literal `0` body means ThingSpeak
    /// refused the write and surfaces as `ProviderError::Rejected`.
    pub async fn send_manual_command(&self, write_key: &str) -> Result<i64, ProviderError> {
        let url = update_url(&self.base_url, write_key);
        debug!("Sending manual watering command to ThingSpeak");

        let text = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("update request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ProviderError::Unavailable(format!("update endpoint returned error status: {e}")))?
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to read update response body: {e}")))?;

        response_store::save("update", "", text.as_bytes()).await;

        let body = text.trim().trim_matches('"');
        if body == "0" {
            return Err(ProviderError::Rejected);
        }
        body.parse::<i64>()
            .map_err(|_| ProviderError::Unavailable(format!("unexpected update response: {body:?}")))
    }
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

// ThingSpeak takes credentials as query-string parameters, so the parameters
// are formatted straight into the URL. Channel ids and API keys are
// alphanumeric and need no percent-encoding.

fn feeds_url(base_url: &str, channel_id: &str, read_key: &str, results: u32) -> String {
    format!("{base_url}/channels/{channel_id}/feeds.json?api_key={read_key}&results={results}")
}

fn update_url(base_url: &str, write_key: &str) -> String {
    format!("{base_url}/update.json?api_key={write_key}&field6=1")
}
