pub mod sources;

use std::{path::PathBuf, time::Duration};

use skillscore_core::{
    BatchPolicy, DispatchStrategy,
    dispatch::{emitter::EmitterConfig, worker::WorkerConfig},
};

use crate::constants::{
    DEFAULT_BROKER_BUFFER_CAPACITY, DEFAULT_BROKER_URL,
    DEFAULT_ENQUEUE_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_PROCESSING_DELAY, DEFAULT_WORKER_CONCURRENCY,
    DEFAULT_WORKER_QUEUE_CAPACITY,
};

/// Fully resolved service configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub worker: WorkerSettings,
    pub broker: BrokerConfig,
    pub fixtures: FixtureConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchConfig {
    pub strategy: DispatchStrategy,
    pub batch_policy: BatchPolicy,
}

/// Settings for the in-process worker strategy.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub queue_capacity: usize,
    /// Simulated scoring time per request.
    pub processing_delay: Duration,
    pub enqueue_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_WORKER_CONCURRENCY,
            queue_capacity: DEFAULT_WORKER_QUEUE_CAPACITY,
            processing_delay: DEFAULT_PROCESSING_DELAY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
        }
    }
}

impl WorkerSettings {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            concurrency: self.concurrency,
            queue_capacity: self.queue_capacity,
            processing_delay: self.processing_delay,
            enqueue_timeout: self.enqueue_timeout,
            ..WorkerConfig::default()
        }
    }
}

/// Settings for the broker strategy.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub topic: String,
    pub buffer_capacity: usize,
    pub enqueue_timeout: Duration,
    /// Approximate cap passed to `XADD MAXLEN ~`; `None` leaves the stream
    /// unbounded.
    pub stream_max_len: Option<usize>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BROKER_URL.to_string(),
            topic: skillscore_core::dispatch::emitter::DEFAULT_TOPIC
                .to_string(),
            buffer_capacity: DEFAULT_BROKER_BUFFER_CAPACITY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            stream_max_len: None,
        }
    }
}

impl BrokerConfig {
    pub fn emitter_config(&self) -> EmitterConfig {
        EmitterConfig {
            topic: self.topic.clone(),
            buffer_capacity: self.buffer_capacity,
            enqueue_timeout: self.enqueue_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub seed: bool,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
