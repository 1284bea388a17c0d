//! Best-effort archival of raw ThingSpeak response bodies under
//! `responses/{endpoint}/` for offline debugging. Failures are logged and
//! never interrupt the request that triggered the call.

use tokio::fs;
use tracing::warn;

/// Write `body` to `responses/{endpoint}/{timestamp}[_{tag}].json`.
///
/// `tag` is appended after the timestamp (e.g. a channel id); pass `""` to
/// omit it.
pub async fn save(endpoint: &str, tag: &str, body: &[u8]) {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let name = if tag.is_empty() {
        format!("{stamp}.json")
    } else {
        format!("{stamp}_{tag}.json")
    };

    let dir = format!("responses/{endpoint}");
    if let Err(e) = fs::create_dir_all(&dir).await {
        warn!(dir = %dir, error = %e, "response archive: failed to create directory");
        return;
    }

    let path = format!("{dir}/{name}");
    if let Err(e) = fs::write(&path, body).await {
        warn!(path = %path, error = %e, "response archive: failed to write file");
    } else {
        tracing::debug!(path = %path, bytes = body.len(), "response archive: saved");
    }
}
