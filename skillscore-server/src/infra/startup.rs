use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use skillscore_config::Config;
use skillscore_core::{
    DispatchStrategy, ScoreDispatcher, ScoreStore,
    dispatch::{
        emitter::MessageEmitter, transport::RedisStreamTransport,
        worker::ScoringWorkerPool,
    },
    fixtures::seed_demo_scores,
    scoring::RandomScorer,
};

use super::app_state::AppState;

/// Build the store, seed it if configured and start the dispatcher.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let store = Arc::new(ScoreStore::new());

    if config.fixtures.seed {
        seed_demo_scores(&store, Utc::now());
    }

    let dispatcher = build_dispatcher(config, &store).await?;

    Ok(AppState::new(store, dispatcher, config.dispatch.batch_policy))
}

/// Start the configured strategy. The broker strategy needs a reachable
/// Redis before the server accepts traffic.
pub async fn build_dispatcher(
    config: &Config,
    store: &Arc<ScoreStore>,
) -> Result<Arc<dyn ScoreDispatcher>> {
    let dispatcher: Arc<dyn ScoreDispatcher> = match config.dispatch.strategy {
        DispatchStrategy::Worker => Arc::new(ScoringWorkerPool::spawn(
            config.worker.worker_config(),
            Arc::clone(store),
            Arc::new(RandomScorer),
        )),
        DispatchStrategy::Broker => {
            let transport = RedisStreamTransport::connect(
                &config.broker.url,
                config.broker.stream_max_len,
            )
            .await?;

            Arc::new(MessageEmitter::spawn(
                config.broker.emitter_config(),
                Arc::new(transport),
            ))
        }
    };

    info!(
        strategy = %dispatcher.strategy(),
        batch_policy = %config.dispatch.batch_policy,
        "dispatcher ready"
    );

    Ok(dispatcher)
}
