pub mod error;

use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use skillscore_core::{BatchPolicy, DispatchStrategy};
use tracing::debug;

use self::error::ConfigLoadError;
use crate::{
    constants::DEFAULT_CONFIG_FILES,
    models::{
        BrokerConfig, Config, ConfigMetadata, DispatchConfig, FixtureConfig,
        ServerConfig, WorkerSettings,
    },
    models::sources::{EnvConfig, FileConfig},
    util::{parse_bool, parse_duration},
    validation::{self, ConfigWarnings},
};

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    /// Wins over both the environment and the file.
    strategy: Option<DispatchStrategy>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.options.strategy = Some(strategy);
        self
    }

    /// Load `.env`, the process environment and the config file, then
    /// compose them into a validated [`Config`].
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut env_config = EnvConfig::gather();
        if let Some(strategy) = self.options.strategy {
            env_config.dispatch_strategy = Some(strategy.to_string());
        }
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        // An explicitly named file must exist; the default locations are
        // optional.
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_FILES
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }
}

/// Parse a TOML configuration file.
pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Layer defaults ← file ← environment and run the guard rails.
pub fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No skillscore.toml detected; using environment variables and defaults",
            "Create skillscore.toml or set SKILLSCORE_CONFIG_PATH to pin settings",
        );
    }

    let FileConfig {
        server: file_server,
        dispatch: file_dispatch,
        worker: file_worker,
        broker: file_broker,
        fixtures: file_fixtures,
    } = file_config.unwrap_or_default();

    let defaults = Config::default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or(defaults.server.host),
        port: layered("server.port", env.server_port, file_server.port, parse)?
            .unwrap_or(defaults.server.port),
    };

    let dispatch = DispatchConfig {
        strategy: layered_str::<DispatchStrategy>(
            "dispatch.strategy",
            env.dispatch_strategy,
            file_dispatch.strategy,
        )?
        .unwrap_or(defaults.dispatch.strategy),
        batch_policy: layered_str::<BatchPolicy>(
            "dispatch.batch_policy",
            env.batch_policy,
            file_dispatch.batch_policy,
        )?
        .unwrap_or(defaults.dispatch.batch_policy),
    };

    let worker = WorkerSettings {
        concurrency: layered(
            "worker.concurrency",
            env.worker_concurrency,
            file_worker.concurrency,
            parse,
        )?
        .unwrap_or(defaults.worker.concurrency),
        queue_capacity: layered(
            "worker.queue_capacity",
            env.worker_queue_capacity,
            file_worker.queue_capacity,
            parse,
        )?
        .unwrap_or(defaults.worker.queue_capacity),
        processing_delay: layered_duration(
            "worker.processing_delay",
            env.scoring_delay,
            file_worker.processing_delay,
        )?
        .unwrap_or(defaults.worker.processing_delay),
        enqueue_timeout: layered_duration(
            "worker.enqueue_timeout",
            env.worker_enqueue_timeout,
            file_worker.enqueue_timeout,
        )?
        .unwrap_or(defaults.worker.enqueue_timeout),
    };

    let broker = BrokerConfig {
        url: env
            .broker_url
            .or(file_broker.url)
            .unwrap_or(defaults.broker.url),
        topic: env
            .broker_topic
            .or(file_broker.topic)
            .unwrap_or(defaults.broker.topic),
        buffer_capacity: layered(
            "broker.buffer_capacity",
            env.broker_buffer_capacity,
            file_broker.buffer_capacity,
            parse,
        )?
        .unwrap_or(defaults.broker.buffer_capacity),
        enqueue_timeout: layered_duration(
            "broker.enqueue_timeout",
            env.broker_enqueue_timeout,
            file_broker.enqueue_timeout,
        )?
        .unwrap_or(defaults.broker.enqueue_timeout),
        stream_max_len: layered(
            "broker.stream_max_len",
            env.broker_stream_max_len,
            file_broker.stream_max_len,
            parse,
        )?,
    };

    let fixtures = FixtureConfig {
        seed: layered(
            "fixtures.seed",
            env.seed_fixtures,
            file_fixtures.seed,
            |raw| parse_bool(raw).ok_or_else(|| "expected a boolean".to_string()),
        )?
        .unwrap_or(defaults.fixtures.seed),
    };

    let config = Config {
        server,
        dispatch,
        worker,
        broker,
        fixtures,
        metadata,
    };

    warnings.extend(validation::apply_guard_rails(&config)?);

    Ok((config, warnings))
}

/// An env value (raw) wins over a file value (already typed).
fn layered<T>(
    field: &'static str,
    env: Option<String>,
    file: Option<T>,
    parse_env: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, ConfigLoadError> {
    match env {
        Some(raw) => parse_env(&raw).map(Some).map_err(|reason| {
            ConfigLoadError::Invalid {
                field,
                value: raw,
                reason,
            }
        }),
        None => Ok(file),
    }
}

/// Both layers are raw strings.
fn layered_str<T>(
    field: &'static str,
    env: Option<String>,
    file: Option<String>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: Display,
{
    env.or(file)
        .map(|raw| {
            raw.parse::<T>().map_err(|err| ConfigLoadError::Invalid {
                field,
                reason: err.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn layered_duration(
    field: &'static str,
    env: Option<String>,
    file: Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    env.or(file)
        .map(|raw| {
            parse_duration(&raw).map_err(|reason| ConfigLoadError::Invalid {
                field,
                value: raw,
                reason,
            })
        })
        .transpose()
}

fn parse<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|err| err.to_string())
}
