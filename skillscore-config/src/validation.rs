use std::time::Duration;

use skillscore_core::DispatchStrategy;
use thiserror::Error;
use url::Url;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be at least 1")]
    ZeroCapacity { field: &'static str },
    #[error("broker URL `{url}` is invalid: {reason}")]
    InvalidBrokerUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    for (field, value) in [
        ("worker.concurrency", config.worker.concurrency),
        ("worker.queue_capacity", config.worker.queue_capacity),
        ("broker.buffer_capacity", config.broker.buffer_capacity),
    ] {
        if value == 0 {
            return Err(ConfigGuardRailError::ZeroCapacity { field });
        }
    }

    match (config.dispatch.strategy, validate_broker_url(&config.broker.url)) {
        (DispatchStrategy::Broker, Err(err)) => return Err(err),
        (DispatchStrategy::Worker, Err(err)) => warnings.push_with_hint(
            format!("{err}; ignored while the worker strategy is active"),
            "Fix BROKER_URL before switching DISPATCH_STRATEGY to broker",
        ),
        _ => {}
    }

    if config.dispatch.strategy == DispatchStrategy::Broker
        && config.broker.stream_max_len.is_none()
    {
        warnings.push_with_hint(
            format!(
                "Broker stream `{}` is uncapped and grows until trimmed externally",
                config.broker.topic
            ),
            "Set BROKER_STREAM_MAX_LEN to keep an approximate upper bound",
        );
    }

    if config.dispatch.strategy == DispatchStrategy::Worker
        && config.worker.processing_delay == Duration::ZERO
    {
        warnings.push("SCORING_DELAY is zero; scores become visible immediately");
    }

    Ok(warnings)
}

fn validate_broker_url(raw: &str) -> Result<(), ConfigGuardRailError> {
    let invalid = |reason: String| ConfigGuardRailError::InvalidBrokerUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "redis" | "rediss" => {}
        other => {
            return Err(invalid(format!(
                "unsupported scheme `{other}`, expected redis or rediss"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    Ok(())
}
