use std::time::Duration;

use thiserror::Error;

/// Why a scoring request could not be queued.
///
/// Returned synchronously from `dispatch`; anything that goes wrong after a
/// request is queued is reported through the strategy's own observability.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("dispatcher is shut down")]
    Closed,

    #[error("queue still full after waiting {0:?}")]
    Backpressure(Duration),

    #[error("failed to encode score message: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure while computing a score inside the worker pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    #[error("scoring failed for {user_id}/{skill_name}: {message}")]
    Failed {
        user_id: String,
        skill_name: String,
        message: String,
    },
}

/// Failure handing a message to the external broker.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to broker: {0}")]
    Connection(String),

    #[error("publish to {topic} failed: {message}")]
    Publish { topic: String, message: String },
}

/// An all-or-nothing batch stopped at `skill_name`.
///
/// The `queued` requests before it were already handed off and are not
/// recalled.
#[derive(Error, Debug)]
#[error("dispatch of skill {skill_name} failed after {queued} queued: {source}")]
pub struct BatchError {
    pub skill_name: String,
    pub queued: usize,
    #[source]
    pub source: DispatchError,
}
