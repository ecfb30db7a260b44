//! Minimal embedding example for fastip-core
//!
//! Runs one speed test with an inline candidate list, a simulated prober
//! and a publisher that only logs. No network access is needed.

use async_trait::async_trait;
use fastip_core::config::{
    EngineConfig, FastIpConfig, ProbeConfig, ProviderConfig, RecordConfig, SourceConfig,
};
use fastip_core::traits::{
    Candidate, ProbeFailure, ProbeOutcome, ProbeSettings, Prober, PublishResult, Publisher,
    RecordTarget,
};
use fastip_core::{EngineEvent, Result, SpeedTestEngine, StaticCandidateSource};
use std::sync::Arc;
use std::time::Duration;

/// Pretends every address ending in an even octet answers with the
/// qualifying status, after a delay derived from the last octet
struct SimulatedProber;

#[async_trait]
impl Prober for SimulatedProber {
    async fn probe(&self, candidate: &Candidate, settings: &ProbeSettings) -> ProbeOutcome {
        let last_octet: u64 = candidate
            .as_str()
            .rsplit('.')
            .next()
            .and_then(|o| o.parse().ok())
            .unwrap_or(0);

        let delay = Duration::from_millis(10 * (last_octet % 20 + 1));
        tokio::time::sleep(delay).await;

        if last_octet % 2 == 0 {
            ProbeOutcome::reachable(candidate.clone(), delay)
        } else {
            ProbeOutcome::unreachable(
                candidate.clone(),
                ProbeFailure::UnexpectedStatus(if settings.qualifying_status == 200 { 403 } else { 200 }),
            )
        }
    }

    fn prober_name(&self) -> &'static str {
        "simulated"
    }
}

/// Publisher that logs instead of calling a provider
struct LoggingPublisher;

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish(&self, address: &Candidate, record: &RecordTarget) -> Result<PublishResult> {
        tracing::info!(
            "Would point {} {} at {}",
            record.record_type,
            record.name,
            address
        );
        Ok(PublishResult::DryRun {
            address: address.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "logging"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let addresses: Vec<String> = (1..=24).map(|i| format!("192.0.2.{}", i)).collect();

    let mut probe = ProbeConfig::new("www.example.com");
    probe.concurrency = 4;

    let config = FastIpConfig {
        log_level: "info".to_string(),
        source: SourceConfig::Static {
            addresses: addresses.clone(),
        },
        probe,
        provider: ProviderConfig::Custom {
            factory: "logging".to_string(),
            config: serde_json::json!({}),
        },
        record: RecordConfig {
            zone_id: "demo-zone".to_string(),
            record_id: "demo-record".to_string(),
            name: "www.example.com".to_string(),
            record_type: "A".to_string(),
            ttl: 60,
        },
        engine: EngineConfig::default(),
    };

    let (engine, mut events) = SpeedTestEngine::new(
        Box::new(StaticCandidateSource::new(addresses)),
        Arc::new(SimulatedProber),
        Arc::new(LoggingPublisher),
        config,
    )?;

    let watcher = tokio::spawn(async move {
        let mut improvements = 0;
        while let Some(event) = events.recv().await {
            if let EngineEvent::NewBest {
                candidate,
                latency_secs,
            } = event
            {
                improvements += 1;
                println!("new best: {} ({:.3}s)", candidate, latency_secs);
            }
        }
        improvements
    });

    let report = engine.run().await?;
    drop(engine);
    let improvements = watcher.await.unwrap_or(0);

    match report.winner {
        Some(winner) => println!(
            "winner: {} ({:.3}s) after {} improvement(s), {} publish call(s)",
            winner.candidate,
            winner.latency_secs,
            improvements,
            report.publishes.len()
        ),
        None => println!("no usable address"),
    }

    Ok(())
}
