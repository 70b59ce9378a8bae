//! Result values shared by chord and key search.

use harmony::{Error, Key, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// How well a candidate explains an input, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub likelihood: f64,
    pub consonance: f64,
}

impl Scores {
    /// Descending order on (recall, precision, likelihood, consonance).
    pub fn rank(&self, other: &Scores) -> Ordering {
        other
            .recall
            .total_cmp(&self.recall)
            .then(other.precision.total_cmp(&self.precision))
            .then(other.likelihood.total_cmp(&self.likelihood))
            .then(other.consonance.total_cmp(&self.consonance))
    }

    /// Whether recall and precision are equal, ignoring float noise.
    pub fn ties_with(&self, other: &Scores) -> bool {
        (self.recall - other.recall).abs() < 1e-9 && (self.precision - other.precision).abs() < 1e-9
    }
}

/// A candidate together with its scores against one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult<T> {
    pub candidate: T,
    #[serde(flatten)]
    pub scores: Scores,
}

impl<T> MatchResult<T> {
    pub fn new(candidate: T, scores: Scores) -> Self {
        Self { candidate, scores }
    }

    pub fn precision(&self) -> f64 {
        self.scores.precision
    }

    pub fn recall(&self) -> f64 {
        self.scores.recall
    }
}

/// Stable sort, best first.
pub fn rank<T>(results: &mut [MatchResult<T>]) {
    results.sort_by(|a, b| a.scores.rank(&b.scores));
}

/// A key candidate with the normalized cadence score of the progression in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMatch {
    #[serde(flatten)]
    pub result: MatchResult<Key>,
    pub cadence: f64,
}

impl KeyMatch {
    pub fn key(&self) -> &Key {
        &self.result.candidate
    }

    pub fn scores(&self) -> &Scores {
        &self.result.scores
    }
}

/// Shared flag for stopping a running search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
