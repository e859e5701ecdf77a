use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use vulnex_core::Finding;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    Connect,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An interesting response. `line` is the live output line, absent for empty bodies.
    Finding { finding: Finding, line: Option<String> },
    /// The candidate got no HTTP response and was dropped.
    Dropped { url: String, error: FetchError },
    WorkerFinished { worker: usize, processed: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards events into a channel; sends after the receiver is gone are ignored.
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Counters for one run, or one worker's share of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub fetched: usize,
    pub failed: usize,
    pub interesting: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub persist_errors: usize,
}

impl RunSummary {
    pub fn merge(&mut self, other: RunSummary) {
        self.candidates += other.candidates;
        self.fetched += other.fetched;
        self.failed += other.failed;
        self.interesting += other.interesting;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.persist_errors += other.persist_errors;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates, {} responses, {} failed, {} interesting ({} new, {} already stored, {} not stored)",
            self.candidates,
            self.fetched,
            self.failed,
            self.interesting,
            self.stored,
            self.duplicates,
            self.persist_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_names_kind_then_detail() {
        let err = FetchError::new(FailureKind::Connect, "connection refused");
        assert_eq!(err.to_string(), "connection failed: connection refused");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn merged_summaries_add_up() {
        let mut total = RunSummary {
            candidates: 3,
            fetched: 2,
            failed: 1,
            ..RunSummary::default()
        };
        total.merge(RunSummary {
            candidates: 2,
            fetched: 2,
            interesting: 1,
            stored: 1,
            ..RunSummary::default()
        });
        assert_eq!(
            total.to_string(),
            "5 candidates, 4 responses, 1 failed, 1 interesting (1 new, 0 already stored, 0 not stored)"
        );
    }
}
