//! Test doubles and common utilities for probing contract tests
//!
//! This module provides minimal test doubles that verify concurrency and
//! publishing contracts without touching the network.

#![allow(dead_code)]

use async_trait::async_trait;
use fastip_core::Result;
use fastip_core::config::{
    EngineConfig, FastIpConfig, ProbeConfig, ProviderConfig, RecordConfig, SourceConfig,
};
use fastip_core::traits::{
    Candidate, ProbeFailure, ProbeOutcome, ProbeSettings, Prober, PublishResult, Publisher,
    RecordTarget,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// What a scripted probe does for one candidate
#[derive(Debug, Clone)]
pub enum Script {
    /// Sleep, then report reachable with the measured elapsed time
    Reachable(Duration),
    /// Sleep, then report a non-qualifying status
    WrongStatus(Duration, u16),
    /// Sleep far longer than any test timeout
    Hang,
}

/// Active-interval of one probe, for overlap checks
#[derive(Debug, Clone)]
pub struct ProbeSpan {
    pub candidate: String,
    pub start: Instant,
    pub end: Instant,
}

/// A prober driven by a per-candidate script, instrumented for concurrency
pub struct ScriptedProber {
    scripts: HashMap<String, Script>,
    in_flight: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    spans: Arc<std::sync::Mutex<Vec<ProbeSpan>>>,
}

impl ScriptedProber {
    pub fn new<I, K>(scripts: I) -> Self
    where
        I: IntoIterator<Item = (K, Script)>,
        K: Into<String>,
    {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            spans: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Every candidate reachable after the same delay
    pub fn uniform<S: AsRef<str>>(candidates: &[S], delay: Duration) -> Self {
        Self::new(
            candidates
                .iter()
                .map(|c| (c.as_ref().to_string(), Script::Reachable(delay))),
        )
    }

    /// Highest number of concurrently active probes seen
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Number of probe() invocations
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Active intervals of completed probes
    pub fn spans(&self) -> Vec<ProbeSpan> {
        self.spans.lock().unwrap().clone()
    }
}

/// Decrements the in-flight counter even when the probe future is dropped
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, candidate: &Candidate, _settings: &ProbeSettings) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        };

        let start = Instant::now();
        let script = self
            .scripts
            .get(candidate.as_str())
            .cloned()
            .unwrap_or(Script::WrongStatus(Duration::ZERO, 404));

        let outcome = match script {
            Script::Reachable(delay) => {
                tokio::time::sleep(delay).await;
                ProbeOutcome::reachable(candidate.clone(), start.elapsed())
            }
            Script::WrongStatus(delay, status) => {
                tokio::time::sleep(delay).await;
                ProbeOutcome::unreachable(candidate.clone(), ProbeFailure::UnexpectedStatus(status))
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ProbeOutcome::unreachable(candidate.clone(), ProbeFailure::Transport("hung".into()))
            }
        };

        self.spans.lock().unwrap().push(ProbeSpan {
            candidate: candidate.to_string(),
            start,
            end: Instant::now(),
        });
        outcome
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock Publisher that records every call
#[derive(Clone)]
pub struct MockPublisher {
    calls: Arc<std::sync::Mutex<Vec<Candidate>>>,
    fail: bool,
    delay: Duration,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail: false,
            // Widen the critical section so lock contention is real
            delay: Duration::from_millis(2),
        }
    }

    /// A publisher that takes `delay` to answer each call
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// A publisher whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Published addresses, in call order
    pub fn published(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, address: &Candidate, _record: &RecordTarget) -> Result<PublishResult> {
        self.calls.lock().unwrap().push(address.clone());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(fastip_core::Error::publish("provider unavailable"));
        }
        Ok(PublishResult::Updated {
            address: address.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn record_target() -> RecordTarget {
    minimal_config(&[]).record.target()
}

/// Helper to create a minimal config for testing
pub fn minimal_config(addresses: &[&str]) -> FastIpConfig {
    let mut probe = ProbeConfig::new("www.example.com");
    probe.timeout_secs = 1;

    FastIpConfig {
        log_level: "debug".to_string(),
        source: SourceConfig::Static {
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        },
        probe,
        provider: ProviderConfig::Custom {
            factory: "mock".to_string(),
            config: serde_json::json!({}),
        },
        record: RecordConfig {
            zone_id: "zone-id".to_string(),
            record_id: "record-id".to_string(),
            name: "www.example.com".to_string(),
            record_type: "A".to_string(),
            ttl: 60,
        },
        engine: EngineConfig {
            event_channel_capacity: 1024,
        },
    }
}

/// Largest number of spans active at the same instant
pub fn max_overlap(spans: &[ProbeSpan]) -> usize {
    spans
        .iter()
        .map(|s| {
            spans
                .iter()
                .filter(|o| o.start <= s.start && s.start < o.end)
                .count()
        })
        .max()
        .unwrap_or(0)
}
