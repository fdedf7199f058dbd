use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum_test::TestServer;
use skillscore_core::{
    BatchPolicy, DispatchError, DispatchStats, DispatchStrategy, ScoreDispatcher,
    ScoreRequest, ScoreStore,
    dispatch::{
        emitter::{EmitterConfig, MessageEmitter},
        transport::InMemoryTransport,
        worker::{ScoringWorkerPool, WorkerConfig},
    },
    scoring::RandomScorer,
};
use skillscore_server::{AppState, create_app};

// Each test binary uses a different subset of these helpers.
#[allow(unused)]
pub struct WorkerApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<ScoreStore>,
    pub pool: Arc<ScoringWorkerPool>,
}

#[allow(unused)]
pub fn worker_app(processing_delay: Duration) -> WorkerApp {
    let store = Arc::new(ScoreStore::new());
    let pool = Arc::new(ScoringWorkerPool::spawn(
        WorkerConfig {
            concurrency: 4,
            processing_delay,
            ..WorkerConfig::default()
        },
        Arc::clone(&store),
        Arc::new(RandomScorer),
    ));

    let state =
        AppState::new(Arc::clone(&store), pool.clone(), BatchPolicy::BestEffort);
    let server =
        TestServer::new(create_app(state.clone())).expect("test server");

    WorkerApp {
        server,
        state,
        store,
        pool,
    }
}

#[allow(unused)]
pub struct BrokerApp {
    pub server: TestServer,
    pub store: Arc<ScoreStore>,
    pub emitter: Arc<MessageEmitter>,
    pub transport: Arc<InMemoryTransport>,
}

#[allow(unused)]
pub fn broker_app() -> BrokerApp {
    let store = Arc::new(ScoreStore::new());
    let transport = Arc::new(InMemoryTransport::new());
    let emitter = Arc::new(MessageEmitter::spawn(
        EmitterConfig::default(),
        transport.clone(),
    ));

    let state = AppState::new(
        Arc::clone(&store),
        emitter.clone(),
        BatchPolicy::BestEffort,
    );
    let server = TestServer::new(create_app(state)).expect("test server");

    BrokerApp {
        server,
        store,
        emitter,
        transport,
    }
}

/// Accepts the first `accept` requests, then reports a full queue.
#[derive(Debug)]
pub struct SaturatingDispatcher {
    accept: u64,
    enqueued: AtomicU64,
    rejected: AtomicU64,
}

#[allow(unused)]
impl SaturatingDispatcher {
    pub fn new(accept: u64) -> Self {
        Self {
            accept,
            enqueued: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ScoreDispatcher for SaturatingDispatcher {
    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::Worker
    }

    async fn dispatch(&self, _request: ScoreRequest) -> Result<(), DispatchError> {
        if self.enqueued.load(Ordering::SeqCst) < self.accept {
            self.enqueued.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            Err(DispatchError::Backpressure(Duration::from_millis(250)))
        }
    }

    fn stats(&self) -> DispatchStats {
        DispatchStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            completed: 0,
            failed: self.rejected.load(Ordering::SeqCst),
        }
    }

    async fn shutdown(&self) {}
}

#[allow(unused)]
pub fn saturated_app(
    accept: u64,
    policy: BatchPolicy,
) -> (TestServer, Arc<SaturatingDispatcher>) {
    let dispatcher = Arc::new(SaturatingDispatcher::new(accept));
    let state = AppState::new(
        Arc::new(ScoreStore::new()),
        dispatcher.clone(),
        policy,
    );
    let server = TestServer::new(create_app(state)).expect("test server");
    (server, dispatcher)
}
