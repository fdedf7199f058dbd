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
    sync::{Mutex as AsyncMutex, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    DispatchStats, DispatchStrategy, ScoreDispatcher, enqueue,
    transport::{BrokerTransport, OutboundMessage},
};
use crate::{
    domain::{ScoreMessage, ScoreRequest},
    error::DispatchError,
};

pub const DEFAULT_TOPIC: &str = "skill-score-requests";

#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub topic: String,
    pub buffer_capacity: usize,
    pub enqueue_timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            buffer_capacity: 256,
            enqueue_timeout: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Default)]
struct EmitterCounters {
    enqueued: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
}

/// Broker dispatch strategy.
///
/// `dispatch` encodes the request as a [`ScoreMessage`], keys it by user and
/// queues it on a bounded buffer; success means "queued for delivery". One
/// publisher task drains the buffer in FIFO order, so messages for a key
/// reach the transport in dispatch order. Transport failures are logged and
/// counted; the caller has already been answered by then.
pub struct MessageEmitter {
    sender: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
    publisher: AsyncMutex<Option<JoinHandle<()>>>,
    counters: Arc<EmitterCounters>,
    config: EmitterConfig,
}

impl fmt::Debug for MessageEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEmitter")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl MessageEmitter {
    /// Start the publisher task. Must be called inside a tokio runtime.
    pub fn spawn(
        config: EmitterConfig,
        transport: Arc<dyn BrokerTransport>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.buffer_capacity.max(1));
        let counters = Arc::new(EmitterCounters::default());

        let publisher = tokio::spawn(publish_loop(
            receiver,
            transport,
            Arc::clone(&counters),
        ));

        info!(
            broker.topic = %config.topic,
            broker.buffer_capacity = config.buffer_capacity,
            "message emitter started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            publisher: AsyncMutex::new(Some(publisher)),
            counters,
            config,
        }
    }

    fn encode(&self, request: &ScoreRequest) -> Result<OutboundMessage, DispatchError> {
        let payload = serde_json::to_vec(&ScoreMessage::from(request))?;
        Ok(OutboundMessage {
            topic: self.config.topic.clone(),
            key: request.user_id.clone(),
            payload,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl ScoreDispatcher for MessageEmitter {
    fn strategy(&self) -> DispatchStrategy {
        DispatchStrategy::Broker
    }

    async fn dispatch(&self, request: ScoreRequest) -> Result<(), DispatchError> {
        let sender = self.sender.lock().clone().ok_or(DispatchError::Closed)?;
        let message = self.encode(&request)?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = enqueue(&sender, message, self.config.enqueue_timeout).await {
            self.counters.enqueued.fetch_sub(1, Ordering::Relaxed);
            return Err(err);
        }
        Ok(())
    }

    fn stats(&self) -> DispatchStats {
        DispatchStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            completed: self.counters.published.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    async fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }

        if let Some(handle) = self.publisher.lock().await.take()
            && let Err(err) = handle.await
        {
            error!(error = %err, "broker publisher terminated abnormally");
        }
        let stats = self.stats();
        info!(
            published = stats.completed,
            failed = stats.failed,
            "message emitter flushed"
        );
    }
}

async fn publish_loop(
    mut receiver: mpsc::Receiver<OutboundMessage>,
    transport: Arc<dyn BrokerTransport>,
    counters: Arc<EmitterCounters>,
) {
    while let Some(message) = receiver.recv().await {
        match transport.publish(&message).await {
            Ok(()) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %message.topic, key = %message.key, "score request published");
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    topic = %message.topic,
                    key = %message.key,
                    error = %err,
                    "broker rejected score request"
                );
            }
        }
    }
}
