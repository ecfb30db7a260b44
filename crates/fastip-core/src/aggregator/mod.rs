//! Best-result aggregation
//!
//! [`ResultAggregator`] reduces concurrently arriving [`ProbeOutcome`]s into
//! one best (lowest-latency, reachable) candidate and fires the
//! first-success publish exactly once.
//!
//! ## Critical Section
//!
//! Every `observe` call takes the same async mutex for the whole
//! compare, update and maybe-publish sequence. The first reachable outcome to
//! acquire the lock is published, regardless of its final latency rank.
//! The publish call is awaited while the lock is held, which is why this is a
//! `tokio::sync::Mutex` and not a std one. The improvement callback of
//! [`ResultAggregator::observe_with`] also runs inside the lock, so callers
//! see improvements in the order they were applied.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::traits::{Candidate, ProbeOutcome, PublishResult, Publisher, RecordTarget};

/// Shared best-so-far state
#[derive(Debug)]
struct BestResult {
    candidate: Option<Candidate>,
    latency_score: f64,
    published_once: bool,
    observed: usize,
    reachable: usize,
    unreachable: Vec<Candidate>,
}

impl BestResult {
    fn new() -> Self {
        Self {
            candidate: None,
            latency_score: f64::INFINITY,
            published_once: false,
            observed: 0,
            reachable: 0,
            unreachable: Vec::new(),
        }
    }
}

/// What a single `observe` call changed
#[derive(Debug)]
pub struct Observation {
    /// The outcome replaced the best result
    pub improved: bool,
    /// Set when this outcome triggered the first-success publish
    pub first_publish: Option<std::result::Result<PublishResult, Error>>,
}

/// The overall winner of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Winner {
    pub candidate: Candidate,
    /// Elapsed seconds of the winning probe
    pub latency_secs: f64,
}

/// Diagnostic counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub observed: usize,
    pub reachable: usize,
    pub unreachable: Vec<Candidate>,
}

/// Result of [`ResultAggregator::finalize`]
#[derive(Debug)]
pub struct Finalization {
    /// `None` means no usable address was found
    pub winner: Option<Winner>,
    /// The final publish, when a winner exists
    pub publish: Option<std::result::Result<PublishResult, Error>>,
    pub stats: AggregateStats,
}

/// Task-safe reducer over probe outcomes
pub struct ResultAggregator {
    state: Mutex<BestResult>,
    publisher: Arc<dyn Publisher>,
    record: RecordTarget,
}

impl ResultAggregator {
    /// Create an aggregator that publishes to `record` through `publisher`
    pub fn new(publisher: Arc<dyn Publisher>, record: RecordTarget) -> Self {
        Self {
            state: Mutex::new(BestResult::new()),
            publisher,
            record,
        }
    }

    /// Fold one completed probe into the best result
    pub async fn observe(&self, outcome: ProbeOutcome) -> Observation {
        self.observe_with(outcome, |_| {}).await
    }

    /// Like [`ResultAggregator::observe`], calling `on_improved` with the new
    /// best result before the lock is released
    ///
    /// `on_improved` must not block.
    pub async fn observe_with<F>(&self, outcome: ProbeOutcome, on_improved: F) -> Observation
    where
        F: FnOnce(&Winner) + Send,
    {
        let mut best = self.state.lock().await;
        best.observed += 1;

        if !outcome.is_reachable() {
            debug!(
                "Unreachable candidate {}: {}",
                outcome.candidate(),
                outcome
                    .failure()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            best.unreachable.push(outcome.candidate().clone());
            return Observation {
                improved: false,
                first_publish: None,
            };
        }

        best.reachable += 1;
        info!(
            "Reachable candidate {} ({:.3}s)",
            outcome.candidate(),
            outcome.latency_score()
        );

        let improved = outcome.latency_score() < best.latency_score;
        if improved {
            best.candidate = Some(outcome.candidate().clone());
            best.latency_score = outcome.latency_score();
            on_improved(&Winner {
                candidate: outcome.candidate().clone(),
                latency_secs: best.latency_score,
            });
        }

        let first_publish = if best.published_once {
            None
        } else {
            info!("First reachable candidate: {}", outcome.candidate());
            let result = self.publisher.publish(outcome.candidate(), &self.record).await;
            if let Err(e) = &result {
                warn!(
                    "First-success publish of {} via {} failed: {}",
                    outcome.candidate(),
                    self.publisher.provider_name(),
                    e
                );
            }
            best.published_once = true;
            Some(result)
        };

        Observation {
            improved,
            first_publish,
        }
    }

    /// Current best candidate and score
    pub async fn best(&self) -> Option<Winner> {
        let best = self.state.lock().await;
        best.candidate.as_ref().map(|candidate| Winner {
            candidate: candidate.clone(),
            latency_secs: best.latency_score,
        })
    }

    /// Whether the first-success publish has fired
    pub async fn has_published(&self) -> bool {
        self.state.lock().await.published_once
    }

    /// Publish the overall winner once all probes are done
    ///
    /// This may repeat the address already published by the first-success
    /// trigger. With no reachable candidate nothing is published.
    pub async fn finalize(&self) -> Finalization {
        let best = self.state.lock().await;
        let stats = AggregateStats {
            observed: best.observed,
            reachable: best.reachable,
            unreachable: best.unreachable.clone(),
        };

        let Some(candidate) = best.candidate.clone() else {
            info!("No usable address among {} candidate(s)", best.observed);
            return Finalization {
                winner: None,
                publish: None,
                stats,
            };
        };

        let winner = Winner {
            candidate,
            latency_secs: best.latency_score,
        };
        info!(
            "Fastest address: {} ({:.3}s)",
            winner.candidate, winner.latency_secs
        );

        let publish = self.publisher.publish(&winner.candidate, &self.record).await;
        if let Err(e) = &publish {
            warn!(
                "Final publish of {} via {} failed: {}",
                winner.candidate,
                self.publisher.provider_name(),
                e
            );
        }

        Finalization {
            winner: Some(winner),
            publish: Some(publish),
            stats,
        }
    }
}
