use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, Utc};
use scan_logging::{scan_debug, scan_error, scan_info, scan_trace, scan_warn};
use tokio::sync::{mpsc, Mutex};
use vulnex_core::{
    classify, progress_line, Candidate, CandidateSet, ClassifyPolicy, FetchOutcome, Finding,
    HostDedupCache, Verdict,
};

use crate::{
    EngineEvent, FetchError, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher, ResultSink,
    RunSummary, SinkError,
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Who owns the host fingerprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupScope {
    /// Each worker keeps its own cache. Suppression depends on which worker sees a host.
    #[default]
    PerWorker,
    /// One cache for the whole pool; suppression no longer depends on worker count.
    Shared,
}

#[derive(Clone)]
pub struct EngineConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub fetch: FetchSettings,
    pub policy: ClassifyPolicy,
    pub dedup_scope: DedupScope,
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            queue_capacity: 1024,
            fetch: FetchSettings::default(),
            policy: ClassifyPolicy::default(),
            dedup_scope: DedupScope::PerWorker,
            clock: Arc::new(Utc::now),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("fetch", &self.fetch)
            .field("policy", &self.policy)
            .field("dedup_scope", &self.dedup_scope)
            .finish_non_exhaustive()
    }
}

pub struct Engine {
    config: EngineConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl Engine {
    /// Engine backed by a real HTTP client built from `config.fetch`.
    pub fn new(config: EngineConfig) -> Result<Self, FetchError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: EngineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Probes every candidate and returns once all workers have drained the queue.
    pub async fn run(
        &self,
        candidates: &CandidateSet,
        sink: Arc<dyn ResultSink>,
        progress: Arc<dyn ProgressSink>,
    ) -> RunSummary {
        let worker_count = self.config.worker_count.max(1);
        scan_info!(
            "Starting scan: {} candidates, {} workers, dedup {:?}",
            candidates.len(),
            worker_count,
            self.config.dedup_scope
        );

        let (tx, rx) = mpsc::channel::<Candidate>(self.config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let pending = candidates.iter();
        let producer = tokio::spawn(async move {
            for candidate in pending {
                if tx.send(candidate).await.is_err() {
                    break;
                }
            }
            // Dropping `tx` closes the queue.
        });

        let shared_cache = match self.config.dedup_scope {
            DedupScope::PerWorker => None,
            DedupScope::Shared => Some(Arc::new(StdMutex::new(HostDedupCache::new()))),
        };

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let dedup = match &shared_cache {
                Some(cache) => Dedup::Shared(Arc::clone(cache)),
                None => Dedup::Local(HostDedupCache::new()),
            };
            let worker = Worker {
                id,
                fetcher: Arc::clone(&self.fetcher),
                sink: Arc::clone(&sink),
                progress: Arc::clone(&progress),
                policy: self.config.policy.clone(),
                clock: Arc::clone(&self.config.clock),
                dedup,
                tally: RunSummary::default(),
            };
            workers.push(tokio::spawn(worker.run(Arc::clone(&queue))));
        }

        if let Err(err) = producer.await {
            scan_error!("Candidate producer failed: {}", err);
        }

        let mut summary = RunSummary::default();
        for handle in workers {
            match handle.await {
                Ok(tally) => summary.merge(tally),
                Err(err) => scan_error!("Worker task failed: {}", err),
            }
        }

        scan_info!("Scan finished: {}", summary);
        summary
    }
}

enum Dedup {
    Local(HostDedupCache),
    Shared(Arc<StdMutex<HostDedupCache>>),
}

impl Dedup {
    /// Classifies and applies the fingerprint update as one step.
    fn judge(&mut self, outcome: &FetchOutcome, policy: &ClassifyPolicy) -> Verdict {
        match self {
            Dedup::Local(cache) => {
                let verdict = classify(outcome, cache, policy);
                verdict.apply(cache);
                verdict
            }
            Dedup::Shared(cache) => {
                let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
                let verdict = classify(outcome, &cache, policy);
                verdict.apply(&mut cache);
                verdict
            }
        }
    }
}

struct Worker {
    id: usize,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ResultSink>,
    progress: Arc<dyn ProgressSink>,
    policy: ClassifyPolicy,
    clock: Clock,
    dedup: Dedup,
    tally: RunSummary,
}

impl Worker {
    async fn run(mut self, queue: Arc<Mutex<mpsc::Receiver<Candidate>>>) -> RunSummary {
        loop {
            let next = queue.lock().await.recv().await;
            let Some(candidate) = next else {
                break;
            };
            self.process(candidate).await;
        }

        scan_debug!("Worker {} done after {} candidates", self.id, self.tally.candidates);
        self.progress.emit(EngineEvent::WorkerFinished {
            worker: self.id,
            processed: self.tally.candidates,
        });
        self.tally
    }

    async fn process(&mut self, candidate: Candidate) {
        self.tally.candidates += 1;
        let url = candidate.url();

        let outcome = match self.fetcher.fetch(&url).await {
            Ok(outcome) => outcome,
            Err(error) => {
                scan_debug!("Dropping {}: {}", url, error);
                self.tally.failed += 1;
                self.progress.emit(EngineEvent::Dropped { url, error });
                return;
            }
        };
        self.tally.fetched += 1;

        let verdict = self.dedup.judge(&outcome, &self.policy);
        if !verdict.interesting {
            if outcome.status != 404 {
                scan_trace!("Skipping {} [{}]", url, outcome.status);
            }
            return;
        }
        self.tally.interesting += 1;

        let finding = Finding::new(&candidate, &outcome, (self.clock)());
        match self.store(&finding).await {
            Ok(true) => self.tally.stored += 1,
            Ok(false) => self.tally.duplicates += 1,
            Err(err) => {
                self.tally.persist_errors += 1;
                scan_warn!("Failed to store {} {}: {}", finding.url, finding.path, err);
            }
        }

        let line = progress_line(&finding);
        self.progress.emit(EngineEvent::Finding { finding, line });
    }

    /// Sink writes block, so they run on the blocking pool and leave runtime threads to fetches.
    async fn store(&self, finding: &Finding) -> Result<bool, SinkError> {
        let sink = Arc::clone(&self.sink);
        let finding = finding.clone();
        tokio::task::spawn_blocking(move || sink.record(&finding)).await?
    }
}
