use std::fmt;

use rand::Rng;

use crate::{
    domain::{MAX_SCORE, ScoreRequest},
    error::ScoringError,
};

/// Computes a score for a request. Called from worker tasks after the
/// simulated processing delay.
pub trait Scorer: Send + Sync + fmt::Debug {
    fn score(&self, request: &ScoreRequest) -> Result<u8, ScoringError>;
}

/// Stand-in for a real assessment: a uniformly random score in
/// `0..MAX_SCORE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomScorer;

impl Scorer for RandomScorer {
    fn score(&self, _request: &ScoreRequest) -> Result<u8, ScoringError> {
        Ok(rand::rng().random_range(0..MAX_SCORE))
    }
}
