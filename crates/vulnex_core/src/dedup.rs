use std::collections::HashMap;

use crate::ContentHash;

/// Last accepted content hash per host. No eviction; lives as long as its owner.
#[derive(Debug, Clone, Default)]
pub struct HostDedupCache {
    hashes: HashMap<String, ContentHash>,
}

impl HostDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, host: &str) -> Option<&ContentHash> {
        self.hashes.get(host)
    }

    pub fn record(&mut self, host: impl Into<String>, hash: ContentHash) {
        self.hashes.insert(host.into(), hash);
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
