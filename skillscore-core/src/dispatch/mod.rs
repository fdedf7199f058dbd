pub mod emitter;
pub mod transport;
pub mod worker;

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::{debug, warn};

use crate::{
    domain::ScoreRequest,
    error::{BatchError, DispatchError},
};

/// Which mechanism turns a scoring request into an eventual store update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Score in-process on the worker pool.
    #[default]
    Worker,
    /// Publish to the external broker.
    Broker,
}

impl DispatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStrategy::Worker => "worker",
            DispatchStrategy::Broker => "broker",
        }
    }
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" | "async" | "in_process" => Ok(DispatchStrategy::Worker),
            "broker" | "emitter" | "publish" => Ok(DispatchStrategy::Broker),
            other => Err(format!(
                "unknown dispatch strategy `{other}` (expected `worker` or `broker`)"
            )),
        }
    }
}

/// Counters reported by a dispatcher.
///
/// `completed` means scored-and-stored for the worker pool and
/// handed-to-the-broker for the emitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Narrow interface the ingestion path depends on.
///
/// `dispatch` returns once the request is queued. Whatever happens after that
/// belongs to the strategy and is never reported back to the caller.
#[async_trait]
pub trait ScoreDispatcher: Send + Sync + fmt::Debug {
    fn strategy(&self) -> DispatchStrategy;

    async fn dispatch(&self, request: ScoreRequest) -> Result<(), DispatchError>;

    fn stats(&self) -> DispatchStats;

    /// Stop accepting requests and wait until everything already queued has
    /// run. Queued work is never cancelled.
    async fn shutdown(&self);
}

/// How a multi-skill ingestion request treats individual dispatch failures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Dispatch every skill; report failures but accept the request.
    #[default]
    BestEffort,
    /// Stop at the first failure and fail the request.
    AllOrNothing,
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPolicy::BestEffort => f.write_str("best_effort"),
            BatchPolicy::AllOrNothing => f.write_str("all_or_nothing"),
        }
    }
}

impl FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(BatchPolicy::BestEffort),
            "all_or_nothing" | "strict" => Ok(BatchPolicy::AllOrNothing),
            other => Err(format!(
                "unknown batch policy `{other}` (expected `best_effort` or `all_or_nothing`)"
            )),
        }
    }
}

/// Result of a batch that was accepted.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub queued: usize,
    pub failures: Vec<(String, DispatchError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatch one request per skill, in order, under `policy`.
pub async fn dispatch_batch(
    dispatcher: &dyn ScoreDispatcher,
    user_id: &str,
    skills: &[String],
    policy: BatchPolicy,
) -> Result<BatchReport, BatchError> {
    let mut report = BatchReport::default();

    for skill in skills {
        let request = ScoreRequest::new(user_id, skill.as_str());
        match dispatcher.dispatch(request).await {
            Ok(()) => {
                debug!(user_id, skill = %skill, strategy = %dispatcher.strategy(), "score request queued");
                report.queued += 1;
            }
            Err(err) => match policy {
                BatchPolicy::BestEffort => {
                    warn!(user_id, skill = %skill, error = %err, "dropping skill from batch after dispatch failure");
                    report.failures.push((skill.clone(), err));
                }
                BatchPolicy::AllOrNothing => {
                    warn!(user_id, skill = %skill, error = %err, queued = report.queued, "aborting batch after dispatch failure");
                    return Err(BatchError {
                        skill_name: skill.clone(),
                        queued: report.queued,
                        source: err,
                    });
                }
            },
        }
    }

    Ok(report)
}

/// Push onto a bounded queue, waiting at most `timeout` for room.
pub(crate) async fn enqueue<T>(
    sender: &mpsc::Sender<T>,
    item: T,
    timeout: Duration,
) -> Result<(), DispatchError> {
    sender.send_timeout(item, timeout).await.map_err(|err| match err {
        SendTimeoutError::Timeout(_) => DispatchError::Backpressure(timeout),
        SendTimeoutError::Closed(_) => DispatchError::Closed,
    })
}
