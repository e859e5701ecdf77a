//! Vulnex core: candidate generation, response classification and per-host dedup.
//!
//! Everything in this crate is pure; network and storage live in `vulnex_engine`.
mod candidate;
mod classify;
mod dedup;
mod finding;
mod outcome;
mod report;

pub use candidate::{
    Candidate, CandidateError, CandidateIter, CandidateSet, DEFAULT_EXTENSIONS, DEFAULT_PATHS,
};
pub use classify::{classify, ClassifyPolicy, DedupUpdate, Verdict, DEFAULT_REDIRECT_KEYWORDS};
pub use dedup::HostDedupCache;
pub use finding::Finding;
pub use outcome::{host_key, ContentHash, FetchOutcome};
pub use report::progress_line;
