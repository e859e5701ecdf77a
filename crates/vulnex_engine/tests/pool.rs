use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use vulnex_core::{
    classify, CandidateSet, ClassifyPolicy, ContentHash, FetchOutcome, HostDedupCache,
};
use vulnex_engine::{
    ChannelProgressSink, DedupScope, Engine, EngineConfig, EngineEvent, FailureKind, FetchError,
    Fetcher, MemorySink, ProgressSink, ResultSink, SinkError, SqliteSink,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scan_logging::initialize_for_tests);
}

/// Answers from a fixed table; unknown URLs fail like a refused connection.
struct ScriptedFetcher {
    responses: HashMap<String, FetchOutcome>,
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        self.responses.get(url).cloned().ok_or_else(|| FetchError {
            kind: FailureKind::Connect,
            message: "connection refused".to_string(),
        })
    }
}

/// Every URL returns the same catch-all page.
struct CatchAllFetcher;

#[async_trait::async_trait]
impl Fetcher for CatchAllFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        Ok(outcome(url, 200, &[b'c'; 2048], None))
    }
}

struct FailingSink;

impl ResultSink for FailingSink {
    fn record(&self, _finding: &vulnex_core::Finding) -> Result<bool, SinkError> {
        Err(SinkError::Poisoned)
    }
}

/// Takes as long as a busy database on every insert.
struct SlowSink {
    delay: Duration,
}

impl ResultSink for SlowSink {
    fn record(&self, _finding: &vulnex_core::Finding) -> Result<bool, SinkError> {
        std::thread::sleep(self.delay);
        Ok(true)
    }
}

/// Paths starting with `hit` are forbidden at once; anything else is a 404 after a short wait.
/// Records when each fetch completed.
struct TimedFetcher {
    started: Instant,
    completed: Mutex<Vec<(String, Duration)>>,
}

#[async_trait::async_trait]
impl Fetcher for TimedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let response = if url.contains("/hit") {
            outcome(url, 403, b"forbidden", None)
        } else {
            tokio::time::sleep(Duration::from_millis(20)).await;
            outcome(url, 404, b"", None)
        };
        self.completed
            .lock()
            .unwrap()
            .push((url.to_string(), self.started.elapsed()));
        Ok(response)
    }
}

struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: EngineEvent) {}
}

fn outcome(url: &str, status: u16, body: &[u8], location: Option<&str>) -> FetchOutcome {
    FetchOutcome {
        url: url.to_string(),
        status,
        content_type: Some("text/html".to_string()),
        location: location.map(str::to_string),
        body_hash: ContentHash::digest(body),
        body_len: body.len() as u64,
        truncated: false,
    }
}

fn config(worker_count: usize, dedup_scope: DedupScope) -> EngineConfig {
    EngineConfig {
        worker_count,
        dedup_scope,
        clock: Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        ..EngineConfig::default()
    }
}

/// 2 bases x 10 paths x (4 extensions + bare) = 100 candidates.
fn hundred_candidates() -> CandidateSet {
    let paths: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
    CandidateSet::new(
        ["https://a.example.com", "https://b.example.com"],
        paths,
        [".php", ".bak", ".json", ".html"],
    )
    .unwrap()
}

/// Deterministic, varied responses keyed by candidate index; every ninth fails.
fn scripted_responses(set: &CandidateSet) -> HashMap<String, FetchOutcome> {
    let catch_all = vec![b'x'; 1500];
    let mut responses = HashMap::new();
    for (i, candidate) in set.iter().enumerate() {
        let url = candidate.url();
        let unique = format!("unique page {i} {}", "y".repeat(200));
        let response = match i % 9 {
            0 => outcome(&url, 200, &catch_all, None),
            1 => outcome(&url, 404, b"nope", None),
            2 => outcome(&url, 403, b"forbidden", None),
            3 => outcome(&url, 301, b"", Some("/admin/dashboard")),
            4 => outcome(&url, 302, b"", Some("/static/app.js")),
            5 => outcome(&url, 200, unique.as_bytes(), None),
            6 => outcome(&url, 200, b"tiny", None),
            7 => outcome(&url, 500, b"oops", None),
            _ => continue,
        };
        responses.insert(url, response);
    }
    responses
}

fn collect_events(mut rx: mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn single_worker_matches_sequential_decision_table() {
    init_logging();
    let set = hundred_candidates();
    assert_eq!(set.len(), 100);
    let responses = scripted_responses(&set);

    let policy = ClassifyPolicy::default();
    let mut cache = HostDedupCache::new();
    let mut expected = 0;
    for candidate in set.iter() {
        if let Some(response) = responses.get(&candidate.url()) {
            let verdict = classify(response, &cache, &policy);
            verdict.apply(&mut cache);
            if verdict.interesting {
                expected += 1;
            }
        }
    }

    let engine = Engine::with_fetcher(
        config(1, DedupScope::PerWorker),
        Arc::new(ScriptedFetcher { responses }),
    );
    let sink = Arc::new(MemorySink::new());
    let summary = engine.run(&set, sink.clone(), Arc::new(NullProgress)).await;

    assert_eq!(summary.candidates, 100);
    assert_eq!(summary.failed, 11);
    assert_eq!(summary.fetched, 100 - summary.failed);
    assert_eq!(summary.interesting, expected);
    assert_eq!(sink.len(), expected);
    assert_eq!(summary.stored, expected);
}

#[tokio::test]
async fn rerun_against_same_store_adds_nothing() {
    init_logging();
    let set = hundred_candidates();
    let temp = tempfile::TempDir::new().unwrap();
    let db_path = temp.path().join("vulnex.db");

    let mut counts = Vec::new();
    for _ in 0..2 {
        let engine = Engine::with_fetcher(
            config(1, DedupScope::PerWorker),
            Arc::new(ScriptedFetcher {
                responses: scripted_responses(&set),
            }),
        );
        let sink = Arc::new(SqliteSink::open(&db_path).unwrap());
        let summary = engine.run(&set, sink.clone(), Arc::new(NullProgress)).await;
        counts.push((summary, sink.count().unwrap()));
    }

    let (first, first_count) = counts[0];
    let (second, second_count) = counts[1];
    assert_eq!(first_count, first.stored as u64);
    assert_eq!(second_count, first_count);
    assert_eq!(second.stored, 0);
    assert_eq!(second.duplicates, first.interesting);
}

#[tokio::test]
async fn shared_scope_reports_catch_all_once_per_host() {
    init_logging();
    let set =
        CandidateSet::with_defaults(["https://a.example.com", "https://b.example.com"]).unwrap();
    let engine = Engine::with_fetcher(config(8, DedupScope::Shared), Arc::new(CatchAllFetcher));
    let sink = Arc::new(MemorySink::new());

    let summary = engine.run(&set, sink.clone(), Arc::new(NullProgress)).await;

    assert_eq!(summary.candidates, set.len());
    assert_eq!(summary.interesting, 2);
    let hosts: Vec<String> = sink.findings().into_iter().map(|f| f.url).collect();
    assert_eq!(hosts, vec!["https://a.example.com", "https://b.example.com"]);
}

#[tokio::test]
async fn per_worker_scope_reports_catch_all_at_most_once_per_worker() {
    init_logging();
    let set = CandidateSet::with_defaults(["https://a.example.com"]).unwrap();
    let workers = 4;
    let engine = Engine::with_fetcher(
        config(workers, DedupScope::PerWorker),
        Arc::new(CatchAllFetcher),
    );

    let summary = engine
        .run(&set, Arc::new(MemorySink::new()), Arc::new(NullProgress))
        .await;

    assert!(summary.interesting >= 1);
    assert!(summary.interesting <= workers);
}

#[tokio::test]
async fn progress_stream_carries_findings_drops_and_worker_exits() {
    init_logging();
    let set = CandidateSet::new(
        ["https://a.example.com"],
        ["admin", "empty", "gone", "down"],
        [] as [&str; 0],
    )
    .unwrap();
    let mut responses = HashMap::new();
    responses.insert(
        "https://a.example.com/admin".to_string(),
        outcome("https://a.example.com/admin", 401, b"auth required", None),
    );
    responses.insert(
        "https://a.example.com/empty".to_string(),
        outcome("https://a.example.com/empty", 204, b"", None),
    );
    responses.insert(
        "https://a.example.com/gone".to_string(),
        outcome("https://a.example.com/gone", 404, b"", None),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Engine::with_fetcher(
        config(2, DedupScope::PerWorker),
        Arc::new(ScriptedFetcher { responses }),
    );
    let summary = engine
        .run(&set, Arc::new(MemorySink::new()), Arc::new(ChannelProgressSink::new(tx)))
        .await;
    let events = collect_events(rx);

    let mut lines: Vec<(String, Option<String>)> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Finding { finding, line } => Some((finding.path.clone(), line.clone())),
            _ => None,
        })
        .collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            ("admin".to_string(), Some("[401] admin (text/html)".to_string())),
            ("empty".to_string(), None),
        ]
    );

    let dropped: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Dropped { url, .. } => Some(url.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(dropped, vec!["https://a.example.com/down"]);

    let finished = events
        .iter()
        .filter(|event| matches!(event, EngineEvent::WorkerFinished { .. }))
        .count();
    assert_eq!(finished, 2);
    assert_eq!(summary.interesting, 2);
}

#[tokio::test]
async fn storage_failures_do_not_stop_the_scan() {
    init_logging();
    let set = CandidateSet::with_defaults(["https://a.example.com"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Engine::with_fetcher(config(3, DedupScope::Shared), Arc::new(CatchAllFetcher));

    let summary = engine
        .run(&set, Arc::new(FailingSink), Arc::new(ChannelProgressSink::new(tx)))
        .await;

    assert_eq!(summary.candidates, set.len());
    assert_eq!(summary.interesting, 1);
    assert_eq!(summary.persist_errors, 1);
    assert_eq!(summary.stored, 0);
    let findings = collect_events(rx)
        .into_iter()
        .filter(|event| matches!(event, EngineEvent::Finding { .. }))
        .count();
    assert_eq!(findings, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_storage_does_not_stall_other_fetches() {
    init_logging();
    let set = CandidateSet::new(
        ["https://a.example.com"],
        ["hit", "hit2", "x1"],
        [] as [&str; 0],
    )
    .unwrap();
    let fetcher = Arc::new(TimedFetcher {
        started: Instant::now(),
        completed: Mutex::new(Vec::new()),
    });
    let engine = Engine::with_fetcher(config(3, DedupScope::PerWorker), fetcher.clone());
    let sink = Arc::new(SlowSink {
        delay: Duration::from_millis(800),
    });

    let summary = engine.run(&set, sink, Arc::new(NullProgress)).await;

    assert_eq!(summary.stored, 2);
    let completed = fetcher.completed.lock().unwrap().clone();
    let (_, unrelated) = completed
        .iter()
        .find(|(url, _)| url.ends_with("/x1"))
        .unwrap();
    assert!(
        *unrelated < Duration::from_millis(400),
        "404 fetch finished after {unrelated:?}"
    );
}
