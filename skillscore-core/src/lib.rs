//! # SkillScore Core
//!
//! Core library for the SkillScore service: the score store and the
//! decoupled scoring pipeline that sits between the HTTP ingestion path and
//! the place where scores are eventually computed.
//!
//! ## Overview
//!
//! - **Score store**: [`store::ScoreStore`], an in-memory `(user, skill)` table
//!   with per-user locking
//! - **Dispatch**: the [`dispatch::ScoreDispatcher`] trait with two
//!   interchangeable strategies
//!   - [`dispatch::worker::ScoringWorkerPool`] scores in-process after a
//!     simulated delay and writes the store directly
//!   - [`dispatch::emitter::MessageEmitter`] publishes a keyed message to a
//!     broker for out-of-process scoring
//! - **Batch policy**: [`dispatch::dispatch_batch`] applies a
//!   [`dispatch::BatchPolicy`] to a multi-skill ingestion request
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use skillscore_core::{
//!     dispatch::{ScoreDispatcher, worker::{ScoringWorkerPool, WorkerConfig}},
//!     domain::ScoreRequest,
//!     scoring::RandomScorer,
//!     store::ScoreStore,
//! };
//!
//! async fn score_one() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(ScoreStore::new());
//!     let pool = ScoringWorkerPool::spawn(
//!         WorkerConfig::default(),
//!         Arc::clone(&store),
//!         Arc::new(RandomScorer),
//!     );
//!
//!     pool.dispatch(ScoreRequest::new("user1", "Rust")).await?;
//!     pool.shutdown().await;
//!
//!     assert!(store.read("user1", "Rust").is_some());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Dispatch strategies and the batch ingestion policy
pub mod dispatch;
/// Score records, scoring requests and the broker wire payload
pub mod domain;
/// Error types shared across the pipeline
pub mod error;
/// Demo data seeded at startup
pub mod fixtures;
/// Score computation
pub mod scoring;
/// Concurrency-safe in-memory score table
pub mod store;

pub use dispatch::{
    BatchPolicy, BatchReport, DispatchStats, DispatchStrategy,
    ScoreDispatcher, dispatch_batch,
};
pub use domain::{MAX_SCORE, ScoreMessage, ScoreRequest, SkillScore};
pub use error::{BatchError, DispatchError, ScoringError, TransportError};
pub use store::{ScoreStore, StoreStats};
