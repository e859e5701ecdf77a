use crate::{ContentHash, FetchOutcome, HostDedupCache};

/// Redirect targets containing one of these (case-insensitive) are worth recording.
pub const DEFAULT_REDIRECT_KEYWORDS: &[&str] = &["login", "admin", "dashboard"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyPolicy {
    /// A 200 body must be strictly longer than this to become the host's fingerprint.
    pub dedup_min_body_length: u64,
    /// Substrings matched case-insensitively against the `Location` header.
    pub redirect_keywords: Vec<String>,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        Self {
            dedup_min_body_length: 100,
            redirect_keywords: DEFAULT_REDIRECT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupUpdate {
    pub host: String,
    pub hash: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub interesting: bool,
    pub dedup_update: Option<DedupUpdate>,
}

impl Verdict {
    fn keep() -> Self {
        Self {
            interesting: true,
            dedup_update: None,
        }
    }

    fn skip() -> Self {
        Self {
            interesting: false,
            dedup_update: None,
        }
    }

    /// Writes the scheduled fingerprint, if any, into `cache`.
    pub fn apply(&self, cache: &mut HostDedupCache) {
        if let Some(update) = &self.dedup_update {
            cache.record(update.host.clone(), update.hash);
        }
    }
}

/// Decides whether `outcome` is worth a finding. Never mutates `cache`.
pub fn classify(
    outcome: &FetchOutcome,
    cache: &HostDedupCache,
    policy: &ClassifyPolicy,
) -> Verdict {
    match outcome.status {
        200 => {
            let host = outcome.host();
            if cache.seen(&host) == Some(&outcome.body_hash) {
                return Verdict::skip();
            }
            let dedup_update = (outcome.body_len > policy.dedup_min_body_length).then(|| {
                DedupUpdate {
                    host,
                    hash: outcome.body_hash,
                }
            });
            Verdict {
                interesting: true,
                dedup_update,
            }
        }
        301 | 302 | 307 => {
            let location = outcome
                .location
                .as_deref()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if policy
                .redirect_keywords
                .iter()
                .any(|keyword| location.contains(&keyword.to_ascii_lowercase()))
            {
                Verdict::keep()
            } else {
                Verdict::skip()
            }
        }
        401 | 403 => Verdict::keep(),
        404 => Verdict::skip(),
        _ => Verdict::keep(),
    }
}
