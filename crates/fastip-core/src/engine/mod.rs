//! Speed-test engine
//!
//! The SpeedTestEngine is responsible for:
//! - Fetching the candidate list via CandidateSource
//! - Fanning probes out through the WorkerPool
//! - Folding outcomes into the ResultAggregator
//! - Publishing the winner and reporting the run
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ CandidateSource │─── Vec<String> ───┐
//! └─────────────────┘                   │
//!                                       ▼
//!                              ┌────────────────┐
//!                              │   WorkerPool   │  ≤ limit in flight
//!                              └────────────────┘
//!                                       │ one task per candidate
//!                 ┌─────────────────────┼─────────────────────┐
//!                 ▼                     ▼                     ▼
//!         ┌─────────────┐      ┌──────────────────┐    ┌─────────────┐
//!         │   Prober    │─────►│ ResultAggregator │───►│  Publisher  │
//!         │  (measure)  │      │ (best, 1st pub)  │    │  (update)   │
//!         └─────────────┘      └──────────────────┘    └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch candidates (failure is fatal)
//! 2. Probe every non-blank candidate, bounded by the concurrency limit;
//!    a task gives up its slot as soon as its probe is done
//! 3. Publish the first reachable candidate immediately
//! 4. After all probes finish, publish the overall fastest candidate
//! 5. Emit events for monitoring/logging and return a [`RunReport`]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregator::{ResultAggregator, Winner};
use crate::config::FastIpConfig;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::traits::{
    Candidate, CandidateSource, ProbeFailure, ProbeOutcome, ProbeSettings, Prober,
    PublishResult, Publisher, RecordTarget,
};

/// Which publish of a run an event or report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    /// Triggered by the first reachable candidate
    FirstSuccess,
    /// The overall winner after all probes finished
    Final,
}

/// Events emitted by the SpeedTestEngine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Run started
    Started {
        entries: usize,
        concurrency_limit: usize,
    },

    /// A probe finished (or timed out)
    ProbeCompleted {
        candidate: Candidate,
        reachable: bool,
        latency_secs: Option<f64>,
        failure: Option<String>,
    },

    /// A new fastest candidate
    NewBest {
        candidate: Candidate,
        latency_secs: f64,
    },

    /// Publisher accepted an address
    Published {
        candidate: Candidate,
        stage: PublishStage,
    },

    /// Publisher rejected an address
    PublishFailed {
        candidate: Candidate,
        stage: PublishStage,
        error: String,
    },

    /// Run finished
    Finished { winner: Option<Candidate> },
}

/// One publish attempt as seen in the run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReport {
    pub stage: PublishStage,
    pub address: Candidate,
    pub succeeded: bool,
    pub dry_run: bool,
    pub error: Option<String>,
}

impl PublishReport {
    fn new(stage: PublishStage, address: &Candidate, result: &Result<PublishResult>) -> Self {
        match result {
            Ok(published) => Self {
                stage,
                address: published.address().clone(),
                succeeded: true,
                dry_run: matches!(published, PublishResult::DryRun { .. }),
                error: None,
            },
            Err(e) => Self {
                stage,
                address: address.clone(),
                succeeded: false,
                dry_run: false,
                error: Some(e.to_string()),
            },
        }
    }

    fn event(&self) -> EngineEvent {
        match &self.error {
            None => EngineEvent::Published {
                candidate: self.address.clone(),
                stage: self.stage,
            },
            Some(error) => EngineEvent::PublishFailed {
                candidate: self.address.clone(),
                stage: self.stage,
                error: error.clone(),
            },
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Candidates probed
    pub probed: usize,
    /// Blank entries skipped
    pub skipped: usize,
    /// Reachable candidates
    pub reachable: usize,
    /// Candidates that failed their probe
    pub unreachable: Vec<Candidate>,
    /// Probe tasks that panicked
    pub panicked: usize,
    /// `None` means no usable address
    pub winner: Option<Winner>,
    /// Publish attempts in the order they happened
    pub publishes: Vec<PublishReport>,
}

impl RunReport {
    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    /// Number of publish attempts that failed
    pub fn publish_failures(&self) -> usize {
        self.publishes.iter().filter(|p| !p.succeeded).count()
    }
}

/// Core speed-test engine
///
/// The engine performs one complete run per call to [`SpeedTestEngine::run`].
/// It holds no state between runs.
///
/// ## Threading
///
/// Probes run on spawned tokio tasks. The only shared mutable state is the
/// per-run [`ResultAggregator`].
pub struct SpeedTestEngine {
    /// Candidate list source
    source: Box<dyn CandidateSource>,

    /// Latency prober
    prober: Arc<dyn Prober>,

    /// DNS publisher
    publisher: Arc<dyn Publisher>,

    /// Parameters shared by every probe
    settings: Arc<ProbeSettings>,

    /// Record the winner is published to
    record: RecordTarget,

    /// Bounded executor
    pool: WorkerPool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SpeedTestEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `source`: Candidate source implementation
    /// - `prober`: Prober implementation
    /// - `publisher`: Publisher implementation
    /// - `config`: fastip configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn CandidateSource>,
        prober: Arc<dyn Prober>,
        publisher: Arc<dyn Publisher>,
        config: FastIpConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            prober,
            publisher,
            settings: Arc::new(config.probe.settings()),
            record: config.record.target(),
            pool: WorkerPool::new(config.probe.concurrency)?,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Fetch candidates and run
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The run completed (even with no usable address)
    /// - `Err(Error)`: The candidate list could not be obtained
    pub async fn run(&self) -> Result<RunReport> {
        info!("Fetching candidates via {} source", self.source.source_name());
        let entries = self.source.fetch().await.map_err(|e| match e {
            Error::CandidateSource(_) => e,
            other => Error::candidate_source(other.to_string()),
        })?;
        Ok(self.run_candidates(entries).await)
    }

    /// Run against an already obtained list of raw entries
    pub async fn run_candidates(&self, entries: Vec<String>) -> RunReport {
        let started_at = Utc::now();
        let aggregator = Arc::new(ResultAggregator::new(
            Arc::clone(&self.publisher),
            self.record.clone(),
        ));

        info!(
            "Probing {} entr(ies) via {} with concurrency {}",
            entries.len(),
            self.prober.prober_name(),
            self.pool.concurrency_limit()
        );
        self.emit_event(EngineEvent::Started {
            entries: entries.len(),
            concurrency_limit: self.pool.concurrency_limit(),
        });

        let pool_report = self
            .pool
            .run_with_slots(entries, |candidate, slot| {
                let prober = Arc::clone(&self.prober);
                let settings = Arc::clone(&self.settings);
                let aggregator = Arc::clone(&aggregator);
                let events = self.event_tx.clone();

                async move {
                    let outcome = probe_with_deadline(prober.as_ref(), &candidate, &settings).await;
                    // The slot bounds probing only
                    slot.release();

                    emit_to(
                        &events,
                        EngineEvent::ProbeCompleted {
                            candidate: candidate.clone(),
                            reachable: outcome.is_reachable(),
                            latency_secs: outcome
                                .is_reachable()
                                .then(|| outcome.latency_score()),
                            failure: outcome.failure().map(|f| f.to_string()),
                        },
                    );

                    let observation = aggregator
                        .observe_with(outcome, |best| {
                            emit_to(
                                &events,
                                EngineEvent::NewBest {
                                    candidate: best.candidate.clone(),
                                    latency_secs: best.latency_secs,
                                },
                            );
                        })
                        .await;

                    observation.first_publish.map(|result| {
                        let report = PublishReport::new(PublishStage::FirstSuccess, &candidate, &result);
                        emit_to(&events, report.event());
                        report
                    })
                }
            })
            .await;

        let mut publishes: Vec<PublishReport> = pool_report.results.into_iter().flatten().collect();

        let finalization = aggregator.finalize().await;
        let winner_candidate = finalization.winner.as_ref().map(|w| w.candidate.clone());
        if let (Some(candidate), Some(result)) = (&winner_candidate, &finalization.publish) {
            let report = PublishReport::new(PublishStage::Final, candidate, result);
            self.emit_event(report.event());
            publishes.push(report);
        }

        match &finalization.winner {
            Some(winner) => info!(
                "Run finished: fastest address {} ({:.3}s), {}/{} reachable",
                winner.candidate, winner.latency_secs, finalization.stats.reachable, pool_report.launched
            ),
            None => warn!(
                "Run finished: no usable address among {} candidate(s)",
                pool_report.launched
            ),
        }
        self.emit_event(EngineEvent::Finished {
            winner: winner_candidate,
        });

        RunReport {
            started_at,
            finished_at: Utc::now(),
            probed: pool_report.launched,
            skipped: pool_report.skipped,
            reachable: finalization.stats.reachable,
            unreachable: finalization.stats.unreachable,
            panicked: pool_report.panicked,
            winner: finalization.winner,
            publishes,
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        emit_to(&self.event_tx, event);
    }
}

/// Run one probe, bounded by the probe timeout
///
/// The prober applies its own timeout too; this guard keeps an admission
/// slot from outliving the timeout when a prober misbehaves.
async fn probe_with_deadline(
    prober: &dyn Prober,
    candidate: &Candidate,
    settings: &ProbeSettings,
) -> ProbeOutcome {
    match tokio::time::timeout(settings.timeout, prober.probe(candidate, settings)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!("Probe of {} exceeded {:?}", candidate, settings.timeout);
            ProbeOutcome::unreachable(candidate.clone(), ProbeFailure::Timeout)
        }
    }
}

fn emit_to(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    // A full channel means nobody is keeping up; drop rather than block probes.
    // A closed channel means nobody is listening, which is fine.
    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
        warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
    }
}
