use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_WORKER_CONCURRENCY: usize = 8;
pub const DEFAULT_WORKER_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

pub const DEFAULT_BROKER_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_BROKER_BUFFER_CAPACITY: usize = 256;

pub const DEFAULT_CONFIG_FILES: [&str; 2] =
    ["skillscore.toml", "config/skillscore.toml"];
