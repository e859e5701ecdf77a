use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Candidate, ContentHash, FetchOutcome};

/// Durable record of one interesting response. `(url, path)` is unique in any sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Base URL the candidate was built from.
    pub url: String,
    /// Requested path relative to `url`, e.g. `admin.php`.
    pub path: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: u64,
    pub body_hash: ContentHash,
    pub location: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        candidate: &Candidate,
        outcome: &FetchOutcome,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: candidate.base().to_string(),
            path: candidate.path(),
            status_code: outcome.status,
            content_type: outcome.content_type.clone(),
            content_length: outcome.body_len,
            body_hash: outcome.body_hash,
            location: outcome.location.clone(),
            discovered_at,
        }
    }

    /// The full URL that was probed.
    pub fn target(&self) -> String {
        format!("{}/{}", self.url, self.path)
    }
}
