use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::env_var;

/// Raw configuration as defined in a TOML file.
///
/// Durations are kept as strings and parsed with `humantime` during
/// composition so errors can name the offending key.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub dispatch: FileDispatchConfig,
    #[serde(default)]
    pub worker: FileWorkerConfig,
    #[serde(default)]
    pub broker: FileBrokerConfig,
    #[serde(default)]
    pub fixtures: FileFixtureConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDispatchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_policy: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileWorkerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enqueue_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBrokerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enqueue_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_max_len: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileFixtureConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<bool>,
}

/// Environment-derived configuration values.
///
/// Values stay raw here; the loader parses them so a bad value is reported
/// instead of silently falling back to the file or the default.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub dispatch_strategy: Option<String>,
    pub batch_policy: Option<String>,
    pub worker_concurrency: Option<String>,
    pub worker_queue_capacity: Option<String>,
    pub scoring_delay: Option<String>,
    pub worker_enqueue_timeout: Option<String>,
    pub broker_url: Option<String>,
    pub broker_topic: Option<String>,
    pub broker_buffer_capacity: Option<String>,
    pub broker_enqueue_timeout: Option<String>,
    pub broker_stream_max_len: Option<String>,
    pub seed_fixtures: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: env_var("SKILLSCORE_CONFIG_PATH").map(PathBuf::from),
            server_host: env_var("SERVER_HOST"),
            server_port: env_var("SERVER_PORT"),
            dispatch_strategy: env_var("DISPATCH_STRATEGY"),
            batch_policy: env_var("BATCH_POLICY"),
            worker_concurrency: env_var("WORKER_CONCURRENCY"),
            worker_queue_capacity: env_var("WORKER_QUEUE_CAPACITY"),
            scoring_delay: env_var("SCORING_DELAY"),
            worker_enqueue_timeout: env_var("WORKER_ENQUEUE_TIMEOUT"),
            broker_url: env_var("BROKER_URL"),
            broker_topic: env_var("BROKER_TOPIC"),
            broker_buffer_capacity: env_var("BROKER_BUFFER_CAPACITY"),
            broker_enqueue_timeout: env_var("BROKER_ENQUEUE_TIMEOUT"),
            broker_stream_max_len: env_var("BROKER_STREAM_MAX_LEN"),
            seed_fixtures: env_var("SEED_FIXTURES"),
        }
    }
}
