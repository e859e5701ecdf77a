//! Vulnex engine: fetching, result storage and the worker pool.
mod fetch;
mod pool;
mod sink;
mod types;

pub use fetch::{Fetcher, FetchSettings, ReqwestFetcher};
pub use pool::{Clock, DedupScope, Engine, EngineConfig};
pub use sink::{MemorySink, ResultSink, SinkError, SqliteSink};
pub use types::{
    ChannelProgressSink, EngineEvent, FailureKind, FetchError, ProgressSink, RunSummary,
};
