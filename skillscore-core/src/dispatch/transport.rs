use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::TransportError;

/// One queued publish: a keyed payload bound for `topic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    /// Partition key; the owning user's id.
    pub key: String,
    pub payload: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Hands messages to the external broker.
///
/// Called from a single publisher task, one message at a time, in the order
/// messages were dispatched.
#[async_trait]
pub trait BrokerTransport: Send + Sync + fmt::Debug {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Publishes onto a Redis stream named after the topic.
///
/// Entries carry `key`, `value` and `ts` (milliseconds since the epoch). A
/// stream is totally ordered, so per-key order is preserved as well.
#[derive(Clone)]
pub struct RedisStreamTransport {
    conn: ConnectionManager,
    max_len: Option<usize>,
}

impl fmt::Debug for RedisStreamTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStreamTransport")
            .field("connection", &"ConnectionManager")
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl RedisStreamTransport {
    pub async fn connect(
        redis_url: &str,
        max_len: Option<usize>,
    ) -> Result<Self, TransportError> {
        info!("Connecting to Redis broker at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| {
            TransportError::Connection(format!(
                "Failed to create Redis client: {e}"
            ))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            TransportError::Connection(format!("Failed to connect to Redis: {e}"))
        })?;

        info!("Successfully connected to Redis broker");

        Ok(Self { conn, max_len })
    }
}

#[async_trait]
impl BrokerTransport for RedisStreamTransport {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("XADD");
        cmd.arg(&message.topic);
        if let Some(max_len) = self.max_len {
            cmd.arg("MAXLEN").arg("~").arg(max_len);
        }
        cmd.arg("*")
            .arg("key")
            .arg(&message.key)
            .arg("value")
            .arg(message.payload.as_slice())
            .arg("ts")
            .arg(message.timestamp.timestamp_millis());

        let entry_id: String = cmd.query_async(&mut conn).await.map_err(|e| {
            TransportError::Publish {
                topic: message.topic.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(topic = %message.topic, key = %message.key, entry_id = %entry_id, "XADD ok");
        Ok(())
    }
}

/// Keeps every published message in memory, in publish order.
///
/// Backs the broker strategy when no external broker is wanted and lets
/// tests inspect exactly what would have been sent.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    pub fn messages_for_key(&self, key: &str) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.key == key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BrokerTransport for InMemoryTransport {
    async fn publish(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}
