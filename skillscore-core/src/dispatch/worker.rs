use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::{
    sync::{Mutex as AsyncMutex, broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use super::{DispatchStats, DispatchStrategy, ScoreDispatcher, enqueue};
use crate::{
    domain::{ScoreRequest, SkillScore},
    error::DispatchError,
    scoring::Scorer,
    store::ScoreStore,
};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    /// Simulated scoring latency applied to every job.
    pub processing_delay: Duration,
    pub enqueue_timeout: Duration,
    pub outcome_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            queue_capacity: 1024,
            processing_delay: Duration::from_secs(2),
            enqueue_timeout: Duration::from_millis(250),
            outcome_capacity: 256,
        }
    }
}

/// What happened to a request after it left the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringOutcome {
    Completed { user_id: String, score: SkillScore },
    Failed { request: ScoreRequest, error: String },
}

#[derive(Debug, Default)]
struct WorkerCounters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl WorkerCounters {
    /// Outcomes are read before `enqueued` so a snapshot never shows more
    /// finished jobs than queued ones.
    fn snapshot(&self) -> DispatchStats {
        let completed = self.completed.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        DispatchStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            completed,
            failed,
        }
    }
}

/// Everything a worker task needs, shared by all of them.
struct WorkerContext {
    queue: AsyncMutex<mpsc::Receiver<ScoreRequest>>,
    store: Arc<ScoreStore>,
    scorer: Arc<dyn Scorer>,
    outcomes: broadcast::Sender<ScoringOutcome>,
    counters: Arc<WorkerCounters>,
    processing_delay: Duration,
}

/// In-process dispatch strategy.
///
/// Requests go onto a bounded queue drained by `concurrency` worker tasks.
/// Each job waits out the processing delay, asks the [`Scorer`] for a score
/// and writes the result to the store. Failures never reach the caller that
/// dispatched the request: they are logged, counted and published on the
/// outcome channel alongside completions.
///
/// Queued jobs are never cancelled. Dropping the pool or calling
/// [`ScoreDispatcher::shutdown`] only closes intake; workers keep draining
/// until the queue is empty.
pub struct ScoringWorkerPool {
    sender: Mutex<Option<mpsc::Sender<ScoreRequest>>>,
    workers: AsyncMutex<Vec<JoinHandle<()>>>,
    outcomes: broadcast::Sender<ScoringOutcome>,
    counters: Arc<WorkerCounters>,
    config: WorkerConfig,
}

impl fmt::Debug for ScoringWorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringWorkerPool")
            .field("config", &self.config)
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl ScoringWorkerPool {
    /// Start the worker tasks. Must be called inside a tokio runtime.
    pub fn spawn(
        config: WorkerConfig,
        store: Arc<ScoreStore>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        let concurrency = config.concurrency.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (outcomes, _) = broadcast::channel(config.outcome_capacity.max(1));
        let counters = Arc::new(WorkerCounters::default());

        let context = Arc::new(WorkerContext {
            queue: AsyncMutex::new(receiver),
            store,
            scorer,
            outcomes: outcomes.clone(),
            counters: Arc::clone(&counters),
            processing_delay: config.processing_delay,
        });

        let workers = (0..concurrency)
            .map(|id| {
                let context = Arc::clone(&context);
                tokio::spawn(async move { worker_loop(id, context).await })
            })
            .collect();

        info!(
            worker.concurrency = concurrency,
            worker.queue_capacity = config.queue_capacity,
            worker.processing_delay_ms = config.processing_delay.as_millis() as u64,
            "scoring workers started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: AsyncMutex::new(workers),
            outcomes,
            counters,
            config,
        }
    }

    /// Receive every completion and failure from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ScoringOutcome> {
        self.outcomes.subscribe()
    }
}

#[async_trait]
impl ScoreDispatcher for ScoringWorkerPool {
    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::Worker
    }

    async fn dispatch(&self, request: ScoreRequest) -> Result<(), DispatchError> {
        let sender = self.sender.lock().clone().ok_or(DispatchError::Closed)?;
        // Counted before the send so `completed` never runs ahead.
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = enqueue(&sender, request, self.config.enqueue_timeout).await {
            self.counters.enqueued.fetch_sub(1, Ordering::Relaxed);
            return Err(err);
        }
        Ok(())
    }

    fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    async fn shutdown(&self) {
        // Dropping the last sender lets workers see the end of the queue once
        // it is drained.
        if self.sender.lock().take().is_none() {
            return;
        }

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(err) = handle.await {
                error!(error = %err, "scoring worker terminated abnormally");
            }
        }
        let stats = self.counters.snapshot();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            "scoring workers drained"
        );
    }
}

async fn worker_loop(id: usize, context: Arc<WorkerContext>) {
    debug!(worker = id, "scoring worker started");

    loop {
        let next = { context.queue.lock().await.recv().await };
        let Some(request) = next else {
            break;
        };
        process(id, &context, request).await;
    }

    debug!(worker = id, "scoring worker stopped");
}

async fn process(id: usize, context: &WorkerContext, request: ScoreRequest) {
    tokio::time::sleep(context.processing_delay).await;

    let outcome = match context.scorer.score(&request) {
        Ok(value) => {
            let score = SkillScore::new(&request.skill_name, value, Utc::now());
            context.store.write(&request.user_id, score.clone());
            context.counters.completed.fetch_add(1, Ordering::Release);
            debug!(
                worker = id,
                user_id = %request.user_id,
                skill = %request.skill_name,
                score = value,
                "skill scored"
            );
            ScoringOutcome::Completed {
                user_id: request.user_id,
                score,
            }
        }
        Err(err) => {
            context.counters.failed.fetch_add(1, Ordering::Release);
            error!(
                worker = id,
                user_id = %request.user_id,
                skill = %request.skill_name,
                error = %err,
                "skill scoring failed"
            );
            ScoringOutcome::Failed {
                request,
                error: err.to_string(),
            }
        }
    };

    // Having no subscribers is fine.
    let _ = context.outcomes.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::MAX_SCORE, error::ScoringError, scoring::RandomScorer};

    #[derive(Debug)]
    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn score(&self, request: &ScoreRequest) -> Result<u8, ScoringError> {
            Err(ScoringError::Failed {
                user_id: request.user_id.clone(),
                skill_name: request.skill_name.clone(),
                message: "model offline".into(),
            })
        }
    }

    fn config(delay: Duration) -> WorkerConfig {
        WorkerConfig {
            concurrency: 2,
            queue_capacity: 16,
            processing_delay: delay,
            ..WorkerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn score_is_invisible_until_the_delay_elapses() {
        let store = Arc::new(ScoreStore::new());
        let pool = ScoringWorkerPool::spawn(
            config(Duration::from_secs(2)),
            Arc::clone(&store),
            Arc::new(RandomScorer),
        );
        let mut outcomes = pool.subscribe();

        pool.dispatch(ScoreRequest::new("u1", "Go")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.read("u1", "Go"), None);

        let outcome = outcomes.recv().await.unwrap();
        let ScoringOutcome::Completed { user_id, score } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(user_id, "u1");
        assert!(score.score < MAX_SCORE);
        assert_eq!(store.read("u1", "Go"), Some(score));
    }

    #[tokio::test(start_paused = true)]
    async fn scorer_failure_is_published_and_leaves_the_store_alone() {
        let store = Arc::new(ScoreStore::new());
        let pool = ScoringWorkerPool::spawn(
            config(Duration::from_millis(10)),
            Arc::clone(&store),
            Arc::new(FailingScorer),
        );
        let mut outcomes = pool.subscribe();

        pool.dispatch(ScoreRequest::new("u1", "Go")).await.unwrap();

        match outcomes.recv().await.unwrap() {
            ScoringOutcome::Failed { request, error } => {
                assert_eq!(request, ScoreRequest::new("u1", "Go"));
                assert!(error.contains("model offline"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(store.read("u1", "Go"), None);
        assert_eq!(
            pool.stats(),
            DispatchStats {
                enqueued: 1,
                completed: 0,
                failed: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_queued_work_instead_of_cancelling_it() {
        let store = Arc::new(ScoreStore::new());
        let pool = ScoringWorkerPool::spawn(
            config(Duration::from_secs(5)),
            Arc::clone(&store),
            Arc::new(RandomScorer),
        );

        for skill in ["Go", "Rust", "Kafka", "Redis", "Axum"] {
            pool.dispatch(ScoreRequest::new("u1", skill)).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(store.skills_for("u1").len(), 5);
        assert_eq!(pool.stats().completed, 5);
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_rejected() {
        let pool = ScoringWorkerPool::spawn(
            config(Duration::ZERO),
            Arc::new(ScoreStore::new()),
            Arc::new(RandomScorer),
        );
        pool.shutdown().await;

        let err = pool
            .dispatch(ScoreRequest::new("u1", "Go"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_pool_does_not_cancel_queued_jobs() {
        let store = Arc::new(ScoreStore::new());
        let pool = ScoringWorkerPool::spawn(
            config(Duration::from_secs(1)),
            Arc::clone(&store),
            Arc::new(RandomScorer),
        );
        let mut outcomes = pool.subscribe();

        pool.dispatch(ScoreRequest::new("u1", "Go")).await.unwrap();
        drop(pool);

        assert!(matches!(
            outcomes.recv().await.unwrap(),
            ScoringOutcome::Completed { .. }
        ));
        assert!(store.read("u1", "Go").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_reports_backpressure() {
        let pool = ScoringWorkerPool::spawn(
            WorkerConfig {
                concurrency: 1,
                queue_capacity: 1,
                processing_delay: Duration::from_secs(60),
                enqueue_timeout: Duration::from_millis(50),
                ..WorkerConfig::default()
            },
            Arc::new(ScoreStore::new()),
            Arc::new(RandomScorer),
        );

        // First job is picked up by the lone worker, second fills the queue.
        pool.dispatch(ScoreRequest::new("u1", "a")).await.unwrap();
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        pool.dispatch(ScoreRequest::new("u1", "b")).await.unwrap();

        let err = pool
            .dispatch(ScoreRequest::new("u1", "c"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Backpressure(_)));
        assert_eq!(pool.stats().enqueued, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn completed_never_runs_ahead_of_enqueued() {
        let pool = Arc::new(ScoringWorkerPool::spawn(
            WorkerConfig {
                concurrency: 4,
                queue_capacity: 512,
                processing_delay: Duration::ZERO,
                ..WorkerConfig::default()
            },
            Arc::new(ScoreStore::new()),
            Arc::new(RandomScorer),
        ));
        let mut outcomes = pool.subscribe();

        let producer = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                for i in 0..200 {
                    pool.dispatch(ScoreRequest::new("u1", format!("skill{i}")))
                        .await
                        .unwrap();
                }
            })
        };

        for _ in 0..200 {
            outcomes.recv().await.unwrap();
            let stats = pool.stats();
            assert!(stats.completed <= stats.enqueued, "{stats:?}");
        }
        producer.await.unwrap();
        assert_eq!(pool.stats().enqueued, 200);
    }
}
