//! Contract Test: Aggregation and Failure Handling
//!
//! Constraints verified:
//! - The winner is the reachable candidate with the lowest latency
//! - Unreachable candidates never win and never trigger a publish
//! - A hanging probe is cut off at the probe timeout without
//!   disturbing other probes
//! - Publish failures are reported, not fatal
//! - A failing candidate source is the only fatal run error
//! - New-best notifications arrive in strictly improving order, even when
//!   outcomes race

mod common;

use async_trait::async_trait;
use common::*;
use fastip_core::{
    Candidate, CandidateSource, EngineEvent, Error, ProbeFailure, ProbeOutcome, Result,
    ResultAggregator, SpeedTestEngine, StaticCandidateSource,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct BrokenSource;

#[async_trait]
impl CandidateSource for BrokenSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        Err(Error::http("connection refused"))
    }

    fn source_name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn winner_is_minimum_latency() {
    let prober = Arc::new(ScriptedProber::new([
        ("10.0.0.1", Script::Reachable(Duration::from_millis(120))),
        ("10.0.0.2", Script::Reachable(Duration::from_millis(30))),
        ("10.0.0.3", Script::Reachable(Duration::from_millis(80))),
        ("10.0.0.4", Script::WrongStatus(Duration::from_millis(5), 200)),
    ]));
    let publisher = MockPublisher::new();
    let names = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"];

    let (engine, _events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(names)),
        prober,
        Arc::new(publisher.clone()),
        minimal_config(&names),
    )
    .unwrap();

    let report = engine.run().await.unwrap();

    assert_eq!(report.winner.unwrap().candidate.as_str(), "10.0.0.2");
    assert_eq!(report.reachable, 3);
    assert_eq!(report.unreachable.len(), 1);
    assert_eq!(report.unreachable[0].as_str(), "10.0.0.4");
    assert_eq!(publisher.published().last().map(String::as_str), Some("10.0.0.2"));
}

#[tokio::test]
async fn all_unreachable_publishes_nothing() {
    let prober = Arc::new(ScriptedProber::new([
        ("1.1.1.1", Script::WrongStatus(Duration::from_millis(5), 200)),
        ("2.2.2.2", Script::WrongStatus(Duration::from_millis(5), 403)),
        ("3.3.3.3", Script::WrongStatus(Duration::from_millis(5), 502)),
    ]));
    let publisher = MockPublisher::new();
    let names = ["1.1.1.1", "2.2.2.2", "3.3.3.3"];

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(names)),
        prober,
        Arc::new(publisher.clone()),
        minimal_config(&names),
    )
    .unwrap();

    let report = engine.run().await.unwrap();

    assert!(!report.has_winner());
    assert_eq!(report.reachable, 0);
    assert_eq!(report.unreachable.len(), 3);
    assert!(report.publishes.is_empty());
    assert_eq!(publisher.call_count(), 0);

    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::Finished { winner } = event {
            finished = Some(winner);
        }
    }
    assert_eq!(finished, Some(None));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hanging_probe_times_out_without_blocking_others() {
    // Timeout 1s, one candidate never answers
    let prober = Arc::new(ScriptedProber::new([
        ("10.9.9.9", Script::Hang),
        ("10.0.0.1", Script::Reachable(Duration::from_millis(50))),
        ("10.0.0.2", Script::Reachable(Duration::from_millis(20))),
    ]));
    let publisher = MockPublisher::new();
    let names = ["10.9.9.9", "10.0.0.1", "10.0.0.2"];

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(names)),
        prober,
        Arc::new(publisher.clone()),
        minimal_config(&names),
    )
    .unwrap();

    let started = Instant::now();
    let report = engine.run().await.unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(3),
        "Run should end shortly after the 1s probe timeout, took {:?}",
        elapsed
    );
    assert_eq!(report.winner.unwrap().candidate.as_str(), "10.0.0.2");
    assert_eq!(report.unreachable.len(), 1);
    assert_eq!(report.unreachable[0].as_str(), "10.9.9.9");

    let mut timeout_failure = None;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::ProbeCompleted {
            candidate, failure, ..
        } = event
            && candidate.as_str() == "10.9.9.9"
        {
            timeout_failure = failure;
        }
    }
    assert_eq!(timeout_failure, Some(ProbeFailure::Timeout.to_string()));
}

#[tokio::test]
async fn publish_failure_is_not_fatal() {
    let prober = Arc::new(ScriptedProber::uniform(&["1.1.1.1"], Duration::from_millis(5)));
    let publisher = MockPublisher::failing();

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(["1.1.1.1"])),
        prober,
        Arc::new(publisher.clone()),
        minimal_config(&["1.1.1.1"]),
    )
    .unwrap();

    let report = engine.run().await.expect("publish errors never fail the run");

    assert!(report.has_winner());
    assert_eq!(publisher.call_count(), 2, "Final publish still attempted");
    assert_eq!(report.publish_failures(), 2);

    let failures = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, EngineEvent::PublishFailed { .. }))
        .count();
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn failing_source_is_fatal() {
    let prober = Arc::new(ScriptedProber::new(Vec::<(String, Script)>::new()));
    let publisher = MockPublisher::new();

    let (engine, _events) = SpeedTestEngine::new(
        Box::new(BrokenSource),
        prober.clone(),
        Arc::new(publisher.clone()),
        minimal_config(&[]),
    )
    .unwrap();

    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, Error::CandidateSource(_)));
    assert!(err.is_fatal());
    assert_eq!(prober.call_count(), 0);
    assert_eq!(publisher.call_count(), 0);
}

#[tokio::test]
async fn started_event_reports_entries_and_limit() {
    let prober = Arc::new(ScriptedProber::uniform(&["1.1.1.1"], Duration::from_millis(1)));
    let mut config = minimal_config(&[]);
    config.probe.concurrency = 7;

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(["1.1.1.1", ""])),
        prober,
        Arc::new(MockPublisher::new()),
        config,
    )
    .unwrap();

    engine.run().await.unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        EngineEvent::Started {
            entries: 2,
            concurrency_limit: 7,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_improvements_are_reported_in_order() {
    let aggregator = Arc::new(ResultAggregator::new(
        Arc::new(MockPublisher::new()),
        record_target(),
    ));
    let reported = Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..50u64 {
        let aggregator = Arc::clone(&aggregator);
        let reported = Arc::clone(&reported);
        handles.push(tokio::spawn(async move {
            let candidate = Candidate::from(format!("10.2.0.{}", i).as_str());
            let latency = Duration::from_millis((i * 37) % 50 + 1);
            aggregator
                .observe_with(ProbeOutcome::reachable(candidate, latency), |best| {
                    reported.lock().unwrap().push(best.latency_secs);
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reported = reported.lock().unwrap().clone();
    assert!(!reported.is_empty());
    assert!(
        reported.windows(2).all(|pair| pair[1] < pair[0]),
        "improvements out of order: {:?}",
        reported
    );
    assert_eq!(
        reported.last().copied(),
        Some(Duration::from_millis(1).as_secs_f64())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn new_best_events_strictly_improve() {
    let scripts: Vec<(String, Script)> = (0..24u64)
        .map(|i| {
            (
                format!("10.3.0.{}", i),
                Script::Reachable(Duration::from_millis(((i * 7) % 24 + 2) * 4)),
            )
        })
        .collect();
    let addresses: Vec<String> = scripts.iter().map(|(a, _)| a.clone()).collect();
    let prober = Arc::new(ScriptedProber::new(scripts));

    let mut config = minimal_config(&[]);
    config.probe.concurrency = 6;

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(addresses)),
        prober,
        Arc::new(MockPublisher::new()),
        config,
    )
    .unwrap();

    let report = engine.run().await.unwrap();

    let mut bests = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::NewBest {
            candidate,
            latency_secs,
        } = event
        {
            bests.push((candidate, latency_secs));
        }
    }

    assert!(!bests.is_empty());
    assert!(
        bests.windows(2).all(|pair| pair[1].1 < pair[0].1),
        "new-best events out of order: {:?}",
        bests
    );

    let winner = report.winner.expect("a winner exists");
    let (last_candidate, last_latency) = bests.last().cloned().unwrap();
    assert_eq!(last_candidate, winner.candidate);
    assert_eq!(last_latency, winner.latency_secs);
}
